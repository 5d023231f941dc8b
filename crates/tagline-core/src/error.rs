//! Error types for Tagline.
//!
//! User-driven input never produces an error anywhere in the engine; these
//! variants exist for programmatic misuse only and are surfaced to the owning
//! collaborator, never to the end user.

/// Result type alias for Tagline operations.
pub type Result<T> = std::result::Result<T, TaglineError>;

/// Errors that can occur in the Tagline engine.
#[derive(Debug, thiserror::Error)]
pub enum TaglineError {
    /// An operation was attempted with conflicting or unsupported configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// A token handle referred to a token that no longer exists.
    #[error("Token not found")]
    TokenNotFound,

    /// An offset or range fell outside the buffer.
    #[error("Offset {offset} out of bounds (buffer length {len})")]
    OutOfBounds { offset: usize, len: usize },
}

impl TaglineError {
    /// Create a configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an out-of-bounds error.
    pub fn out_of_bounds(offset: usize, len: usize) -> Self {
        Self::OutOfBounds { offset, len }
    }
}
