//! Line framing for the worker channel.
//!
//! One JSON message per `\n`-terminated line. Blank lines are ignored so the
//! orchestrator may pad its output.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use protocol::OutboundMessage;

use crate::TransportError;

/// Maximum line size (4 MiB) to prevent unbounded memory allocation.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Reads newline-delimited lines from an async reader.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Reads the next non-blank line, without its terminator.
    ///
    /// Returns `Ok(None)` on EOF. An over-long or non-UTF-8 line is consumed
    /// and reported as a recoverable error; the next call continues with the
    /// following line.
    pub async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            self.buf.clear();
            let read = (&mut self.reader)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(TransportError::io("reading input"))?;
            if read == 0 {
                return Ok(None);
            }

            if self.buf.last() != Some(&b'\n') && self.buf.len() > MAX_LINE_BYTES {
                self.discard_rest_of_line().await?;
                return Err(TransportError::LineTooLong {
                    limit: MAX_LINE_BYTES,
                });
            }

            let text = std::str::from_utf8(&self.buf).map_err(|_| TransportError::InvalidUtf8)?;
            let line = text.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    async fn discard_rest_of_line(&mut self) -> Result<(), TransportError> {
        loop {
            let available = self
                .reader
                .fill_buf()
                .await
                .map_err(TransportError::io("discarding input"))?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(end) => {
                    self.reader.consume(end + 1);
                    return Ok(());
                }
                None => {
                    let len = available.len();
                    self.reader.consume(len);
                }
            }
        }
    }
}

/// Writes outbound messages as compact JSON lines.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one message followed by `\n` and flushes.
    pub async fn write_message(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        let mut line = message.to_json()?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(TransportError::io("writing message"))?;
        self.writer
            .flush()
            .await
            .map_err(TransportError::io("flushing output"))?;
        Ok(())
    }
}
