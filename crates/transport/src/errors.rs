//! Transport error type.

use thiserror::Error;

use protocol::ProtocolError;

/// Errors produced while moving messages over the byte stream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying stream failed.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What the transport was doing.
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// An input line exceeded the size limit. The line was discarded.
    #[error("Input line exceeds {limit} bytes; discarded")]
    LineTooLong {
        /// The configured limit.
        limit: usize,
    },

    /// An input line was not valid UTF-8. The line was discarded.
    #[error("Input line is not valid UTF-8; discarded")]
    InvalidUtf8,

    /// An outbound message could not be serialised.
    #[error(transparent)]
    Encode(#[from] ProtocolError),
}

impl TransportError {
    /// Returns `true` if the stream is still usable after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }

    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { context, source }
    }
}
