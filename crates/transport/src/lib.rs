//! Newline-delimited JSON transport for the Lumen worker.
//!
//! Each line on the input is one inbound command message; each outbound
//! message is written as one line of compact JSON. [`serve`] connects a reader
//! and a writer (normally stdin and stdout) to a [`worker::Worker`] and runs
//! until the input reaches end of file.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Framing and byte I/O live here; the `worker` crate only
//! sees decoded [`protocol::InboundMessage`]s.

mod codec;
mod errors;
mod serve;

pub use codec::{LineReader, LineWriter, MAX_LINE_BYTES};
pub use errors::TransportError;
pub use serve::serve;
