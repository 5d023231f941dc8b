//! Prelude module for Tagline.
//!
//! Re-exports the types most hosts need:
//!
//! ```ignore
//! use tagline::prelude::*;
//! ```

// ============================================================================
// The widget
// ============================================================================

pub use crate::tag_edit::TagEdit;

// ============================================================================
// Items and collaborators
// ============================================================================

pub use crate::factory::{AddressFactory, Avatar, ChipStyle, TokenFactory};
pub use crate::item::{Address, TagHandle, TagItem, item_cast};
pub use crate::tokenizer::{AddressTokenizer, Tokenizer};

// ============================================================================
// Identity, drag, persistence
// ============================================================================

pub use crate::drag::TokenDrag;
pub use crate::state::SavedState;
pub use crate::token::TokenId;

// ============================================================================
// Signals (re-exported from tagline-core)
// ============================================================================

pub use tagline_core::{ConnectionGuard, ConnectionId, Signal};
