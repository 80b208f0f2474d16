//! Outbound half of the worker channel.

use tokio::sync::mpsc;
use tracing::{error, trace};

use protocol::OutboundMessage;

/// Cloneable sender for messages addressed to the orchestrator.
///
/// Every component that emits outbound messages (router replies, search
/// fan-out, platform calls) holds a clone. Sending never blocks; once the
/// transport has gone away messages are dropped.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbox {
    /// Creates an outbox and the receiver the transport drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a message. Returns `false` if the receiving side is closed.
    pub fn send(&self, message: OutboundMessage) -> bool {
        let name = message.name();
        match self.tx.send(message) {
            Ok(()) => true,
            Err(_) => {
                trace!(message = name, "Outbound channel closed, dropping message");
                false
            }
        }
    }

    /// Logs a failure and forwards it to the orchestrator as `onError`.
    pub fn report(&self, failure: &dyn std::error::Error) {
        error!(error = %failure, "Reporting failure to orchestrator");
        self.send(OutboundMessage::error(failure));
    }

    /// Returns `true` once the transport has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
