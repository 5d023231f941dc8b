//! Logging facilities for Tagline.
//!
//! Tagline instruments itself with the `tracing` crate. To see logs,
//! install a subscriber in the host application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every event carries an explicit target so subsystems can be filtered
//! individually, e.g. `RUST_LOG=tagline::buffer=trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Text buffer and marker adjustment.
    pub const BUFFER: &str = "tagline::buffer";
    /// Token registry: commits, removals, separator normalization.
    pub const REGISTRY: &str = "tagline::registry";
    /// Collapse/expand and the overflow indicator.
    pub const COLLAPSE: &str = "tagline::collapse";
    /// The widget state machine: editing, focus, drag, layout.
    pub const EDIT: &str = "tagline::edit";
    /// Signal emission.
    pub const SIGNAL: &str = "tagline_core::signal";
    /// Deferred layout work.
    pub const LAYOUT_QUEUE: &str = "tagline_core::layout_queue";
}
