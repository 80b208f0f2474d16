//! Connects a byte stream pair to a [`Worker`].

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use protocol::{InboundMessage, OutboundMessage};
use worker::{Outbox, Worker};

use crate::{LineReader, LineWriter, TransportError};

/// Inbound commands buffered ahead of the worker.
const INBOUND_CAPACITY: usize = 64;

/// Serves `worker` over `reader`/`writer` until the input reaches EOF.
///
/// `outbound` is the receiver returned by [`Worker::new`]. Undecodable input
/// lines are reported to the orchestrator as `onError` and skipped. After EOF
/// the worker stops, outstanding tasks are aborted and every queued outbound
/// message is written before this returns.
///
/// # Errors
///
/// Returns the first I/O failure on either stream.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    worker: Worker,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let reports = worker.outbox();

    // Each side drops its senders when done, which lets the writer drain and
    // finish once the worker is gone.
    let read_side = read_loop(LineReader::new(reader), inbound_tx, reports);
    let write_side = write_loop(LineWriter::new(writer), outbound);

    let (read_result, (), write_result) = tokio::join!(read_side, worker.run(inbound_rx), write_side);
    info!("Transport closed");
    read_result.and(write_result)
}

async fn read_loop<R>(
    mut reader: LineReader<R>,
    inbound: mpsc::Sender<InboundMessage>,
    reports: Outbox,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = match reader.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Input reached EOF");
                return Ok(());
            }
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "Skipping unreadable input line");
                reports.report(&err);
                continue;
            }
            Err(err) => return Err(err),
        };

        match InboundMessage::from_json(&line) {
            Ok(message) => {
                if inbound.send(message).await.is_err() {
                    return Ok(());
                }
            }
            Err(err) => reports.report(&err),
        }
    }
}

async fn write_loop<W>(
    mut writer: LineWriter<W>,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        match writer.write_message(&message).await {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => {
                warn!(message = message.name(), error = %err, "Dropping unencodable message");
            }
            Err(err) => return Err(err),
        }
    }
    debug!("Outbound channel drained");
    Ok(())
}
