//! Domain error type shared by the core types.

/// Errors raised by core domain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Input failed a domain rule; the message is user-facing.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Bytes or a payload could not be read as an image.
    #[error("Could not decode image: {0}")]
    Decode(String),
}
