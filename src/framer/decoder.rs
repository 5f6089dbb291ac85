use crate::error::{Error, Result};
use crate::framer::state::{FrameState, Step};
use crate::framer::{FramingMode, MAX_SCAN_BUFFER};
use log::trace;
use std::ops::Range;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK: usize = 4096;

enum Gate {
    Progress,
    EndOfStream,
}

/// Streaming side of the framing codec. Buffers transport bytes, drives the
/// framing state machine over them and hands the payload out one message at
/// a time. Single-consumer; all methods take `&mut self`.
pub struct Decoder<R> {
    reader: R,
    buf: Vec<u8>,
    start: usize,
    eof: bool,
    state: FrameState,
    pending: Range<usize>,
    end_of_message: bool,
    msg_open: bool,
}

impl<R: AsyncRead + Unpin> Decoder<R> {
    pub fn new(reader: R) -> Decoder<R> {
        Decoder {
            reader,
            buf: Vec::new(),
            start: 0,
            eof: false,
            state: FrameState::new(),
            pending: 0..0,
            end_of_message: false,
            msg_open: false,
        }
    }

    pub fn framing_mode(&self) -> FramingMode {
        self.state.mode()
    }

    /// One-way switch to chunked framing, called by the session layer after
    /// the hello exchange. Bytes already buffered are kept and decoded under
    /// chunked rules from here on; the caller guarantees the final
    /// end-of-message frame has been consumed.
    pub fn set_chunked_framing(&mut self) {
        if self.state.mode() == FramingMode::Chunked {
            return;
        }
        trace!("decoder switching to chunked framing");
        self.state.set_chunked();
        self.pending = 0..0;
        self.end_of_message = false;
        self.msg_open = false;
    }

    /// Waits for the next framed message and returns a reader bounded to it.
    /// Returns `Ok(None)` on a clean end of stream between messages. If the
    /// previous message's reader was dropped early, its remainder is
    /// discarded first.
    pub async fn next_message(&mut self) -> Result<Option<MessageReader<'_, R>>> {
        if self.msg_open {
            loop {
                self.pending.start = self.pending.end;
                if self.end_of_message {
                    self.end_of_message = false;
                    self.msg_open = false;
                    break;
                }
                if let Gate::EndOfStream = self.advance().await? {
                    self.msg_open = false;
                    return Ok(None);
                }
            }
        }
        loop {
            if !self.pending.is_empty() || self.end_of_message {
                self.msg_open = true;
                return Ok(Some(MessageReader {
                    decoder: self,
                    done: false,
                }));
            }
            match self.advance().await? {
                Gate::Progress => continue,
                Gate::EndOfStream => return Ok(None),
            }
        }
    }

    /// Collects the next message into a `String`. This is the surface the
    /// session layer feeds to the XML deserializer.
    pub async fn read_message(&mut self) -> Result<Option<String>> {
        let Some(mut message) = self.next_message().await? else {
            return Ok(None);
        };
        let mut body = Vec::new();
        message.read_to_end(&mut body).await?;
        Ok(Some(String::from_utf8_lossy(&body).into_owned()))
    }

    /// Runs the state machine until payload bytes or a boundary become
    /// available, refilling the scan buffer as the machine asks for more.
    async fn advance(&mut self) -> Result<Gate> {
        debug_assert!(self.pending.is_empty());
        loop {
            self.compact();
            let window = &self.buf[self.start..];
            match self.state.step(window, self.eof)? {
                Step::Token {
                    advance,
                    offset,
                    len,
                    done,
                } => {
                    let token = self.start + offset;
                    self.start += advance;
                    self.pending = token..token + len;
                    if done {
                        self.end_of_message = true;
                    }
                    if len > 0 || done {
                        return Ok(Gate::Progress);
                    }
                    // framing metadata consumed, nothing to deliver yet
                }
                Step::NeedMore => self.fill().await?,
                Step::Eof => return Ok(Gate::EndOfStream),
            }
        }
    }

    async fn fill(&mut self) -> Result<()> {
        if self.buf.len() - self.start >= MAX_SCAN_BUFFER {
            return Err(Error::BufferOverflow(MAX_SCAN_BUFFER));
        }
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.reader.read(&mut chunk).await?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        } else if self.start >= self.buf.len() - self.start {
            self.buf.drain(..self.start);
            self.start = 0;
        }
    }
}

/// Reader bounded to a single framed message. `read` returns `Ok(0)` exactly
/// once the message boundary is reached; the framing bytes themselves are
/// never visible in the payload.
pub struct MessageReader<'a, R> {
    decoder: &'a mut Decoder<R>,
    done: bool,
}

impl<R: AsyncRead + Unpin> MessageReader<'_, R> {
    pub async fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        if self.done || dst.is_empty() {
            return Ok(0);
        }
        loop {
            let dec = &mut *self.decoder;
            if !dec.pending.is_empty() {
                let n = dst.len().min(dec.pending.len());
                dst[..n].copy_from_slice(&dec.buf[dec.pending.start..dec.pending.start + n]);
                dec.pending.start += n;
                return Ok(n);
            }
            if dec.end_of_message {
                dec.end_of_message = false;
                dec.msg_open = false;
                self.done = true;
                return Ok(0);
            }
            match dec.advance().await? {
                Gate::Progress => continue,
                // the state machine reports mid-message stream loss itself
                Gate::EndOfStream => return Err(Error::UnexpectedEof),
            }
        }
    }

    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut total = 0;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }
}
