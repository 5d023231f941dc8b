//! Core systems for Tagline.
//!
//! This crate provides the foundational components of the Tagline chip-input
//! widget library:
//!
//! - **Signal/Slot System**: Type-safe change notification with emission blocking
//! - **Layout Queue**: FIFO deferral of work until the first layout pass
//! - **Errors**: The shared error type for programmatic misuse
//!
//! # Signal/Slot Example
//!
//! ```
//! use tagline_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Layout Queue Example
//!
//! ```
//! use tagline_core::LayoutQueue;
//!
//! let mut queue = LayoutQueue::new();
//! queue.post("pending token add");
//! assert_eq!(queue.pending_count(), 1);
//!
//! // Drained by the owning widget once layout geometry is known
//! for command in queue.take_pending() {
//!     println!("running: {command}");
//! }
//! ```

mod error;
mod layout_queue;
pub mod logging;
pub mod signal;

pub use error::{Result, TaglineError};
pub use layout_queue::{LayoutQueue, QueuedWorkId};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
