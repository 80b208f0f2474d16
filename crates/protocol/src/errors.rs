//! Wire-level error type.
//!
//! [`ProtocolError`] covers failures to read or write a channel message. Errors
//! raised while *handling* a message belong to the `worker` crate.

use thiserror::Error;

/// Errors produced while encoding or decoding channel messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The inbound text is not a valid command message.
    #[error("Malformed inbound message: {source}")]
    MalformedMessage {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The payload does not match the shape expected by the named command.
    #[error("Invalid payload for '{command}': {source}")]
    InvalidPayload {
        /// Command whose payload failed to decode.
        command: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An outbound message could not be serialised.
    #[error("Failed to encode outbound message: {source}")]
    Encode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
