use crate::error::{Error, Result};
use crate::framer::{FramingMode, NETCONF_1_0_TERMINATOR, NETCONF_1_1_TERMINATOR};
use log::trace;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};

/// Framing side of the write path. Safe to share between tasks: the writer
/// lives behind a mutex whose critical section spans an entire message,
/// body and trailer, so frames from concurrent producers never interleave.
pub struct Encoder<W> {
    writer: Mutex<W>,
    upgraded: AtomicBool,
}

impl<W: AsyncWrite + Unpin> Encoder<W> {
    pub fn new(writer: W) -> Encoder<W> {
        Encoder {
            writer: Mutex::new(writer),
            upgraded: AtomicBool::new(false),
        }
    }

    pub fn framing_mode(&self) -> FramingMode {
        if self.upgraded.load(Ordering::Relaxed) {
            FramingMode::Chunked
        } else {
            FramingMode::EndOfMessage
        }
    }

    /// One-way switch to chunked framing. Callers guarantee no encode is in
    /// flight; messages started before the switch finish under the dialect
    /// they were started with.
    pub fn set_chunked_framing(&self) {
        self.upgraded.store(true, Ordering::Relaxed);
    }

    /// Writes one complete message: body, then the trailer of the active
    /// dialect.
    pub async fn encode(&self, msg: impl AsRef<[u8]>) -> Result<()> {
        let mut frame = self.start_message().await;
        frame.write_all(msg.as_ref()).await?;
        frame.end_of_message().await
    }

    /// Begins a message, taking exclusive ownership of the transport until
    /// [`FrameWriter::end_of_message`] is called (or the writer is dropped).
    pub async fn start_message(&self) -> FrameWriter<'_, W> {
        FrameWriter {
            writer: self.writer.lock().await,
            chunked: self.upgraded.load(Ordering::Relaxed),
            wrote_chunk: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Exclusive handle for writing one framed message. In chunked mode every
/// `write_all` call becomes its own chunk, which lets an XML serializer
/// flush incrementally without buffering the whole document.
pub struct FrameWriter<'a, W> {
    writer: MutexGuard<'a, W>,
    chunked: bool,
    wrote_chunk: bool,
}

impl<W: AsyncWrite + Unpin> FrameWriter<'_, W> {
    pub async fn write_all(&mut self, body: &[u8]) -> Result<()> {
        if body.is_empty() {
            // zero-size chunks are not representable on the wire
            return Ok(());
        }
        if self.chunked {
            let header = format!("\n#{}\n", body.len());
            self.writer.write_all(header.as_bytes()).await?;
        }
        self.writer.write_all(body).await?;
        self.wrote_chunk = true;
        Ok(())
    }

    pub async fn end_of_message(mut self) -> Result<()> {
        let trailer = if self.chunked {
            // a message is 1*chunk end-of-chunks; an empty body has no
            // legal chunked encoding
            if !self.wrote_chunk {
                return Err(Error::EmptyChunkedMessage);
            }
            NETCONF_1_1_TERMINATOR.as_bytes()
        } else {
            NETCONF_1_0_TERMINATOR.as_bytes()
        };
        self.writer.write_all(trailer).await?;
        self.writer.flush().await?;
        trace!("message framed and flushed");
        Ok(())
    }
}
