//! Tagline - an inline tag-chip editing engine.
//!
//! A `TagEdit` is an editable text buffer whose contents can contain
//! inline "chips": structured items (contacts, labels, ...) rendered as
//! fixed-size glyphs, anchored into the text by offset-tracking markers.
//! The engine keeps chips, free text, cursor, and overflow collapse
//! consistent under arbitrary interleaved edits; rendering and input
//! plumbing belong to the host.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tagline::prelude::*;
//!
//! let mut edit = TagEdit::new(
//!     Box::new(AddressTokenizer::new()),
//!     Box::new(AddressFactory::new()),
//! );
//! edit.set_available_width(400.0);
//!
//! edit.add_token(Arc::new(Address::from_email("ada@example.com")));
//! edit.set_cursor(edit.text().len());
//! edit.insert_text(" bob@example.com");
//! edit.submit().unwrap();
//!
//! assert_eq!(edit.tokens().len(), 2);
//! ```
//!
//! The engine is single-threaded: drive a `TagEdit` from one thread and do
//! not call back into it from inside a signal slot.

pub mod buffer;
pub mod collapse;
pub mod drag;
pub mod factory;
pub mod item;
pub mod registry;
pub mod state;
pub mod tag_edit;
pub mod token;
pub mod tokenizer;

pub mod prelude;

pub use buffer::{Marker, MarkerId, MarkerKind, SpliceOutcome, TokenBuffer};
pub use collapse::{CollapseController, MoreLabelFn};
pub use drag::TokenDrag;
pub use factory::{AddressFactory, Avatar, ChipGlyph, ChipStyle, TokenFactory};
pub use item::{Address, TagHandle, TagItem, item_cast};
pub use registry::{CommitCtx, TokenRegistry};
pub use state::{SavedState, SavedToken};
pub use tag_edit::TagEdit;
pub use token::{Token, TokenId};
pub use tokenizer::{AddressTokenizer, SEPARATOR, Tokenizer};
