//! Error types for the protocol layer.
//!
//! Every failure here is recoverable: the driver logs it, counts it and
//! moves on to the next frame. None of them closes the connection.

/// Errors that can occur while encoding, framing or interpreting messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A frame was not valid JSON, or not the expected shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The document parsed but is not a JSON-RPC response or notification
    /// we understand (no `id`, no `method`, non-integer id, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A line grew past the configured frame limit before its terminator
    /// arrived. Its bytes are discarded up to the next terminator.
    #[error("frame exceeds {limit} bytes ({seen} bytes seen)")]
    FrameTooLarge { limit: usize, seen: usize },
}
