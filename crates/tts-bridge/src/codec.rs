//! Envelope codec
//!
//! The game writes concatenated JSON documents with no length prefix and no
//! guaranteed separator. Frames are cut by scanning structure (bracket depth,
//! string and escape state), so `{..}{..}`, `{..}\n{..}` and values split across
//! reads all decode the same way.
//!
//! A value left unterminated by the game must not swallow the messages that
//! follow it. A newline outside a string that is immediately followed by `{`
//! marks where the next value may start: if the open value cannot continue
//! there, or closes into something that does not decode, the bytes before the
//! newline are dropped and scanning restarts from the `{`.

use crate::transport::AsyncReader;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};
use tts_sync_core::{Envelope, OutboundMessage, Result, SyncError};

/// Largest value accepted before the buffered bytes are dropped (64MB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Encode a command for the game
pub fn encode(msg: &OutboundMessage) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(msg)?)
}

/// Cuts a byte stream into complete top-level JSON values.
///
/// Scan state is kept between calls so a large value arriving in many chunks
/// is only walked once.
#[derive(Debug)]
pub struct FrameScanner {
    buf: Vec<u8>,
    /// Next byte to examine inside the current frame
    cursor: usize,
    /// Open brackets of the current frame
    stack: Vec<u8>,
    in_string: bool,
    escaped: bool,
    /// Offset of the first `{` that opened a new line inside the current frame
    resync: Option<usize>,
    max_frame: usize,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl FrameScanner {
    pub fn new(max_frame: usize) -> Self {
        Self {
            buf: Vec::new(),
            cursor: 0,
            stack: Vec::new(),
            in_string: false,
            escaped: false,
            resync: None,
            max_frame,
        }
    }

    /// Append freshly read bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Whether non-whitespace bytes are buffered without forming a full value
    pub fn has_partial(&self) -> bool {
        self.buf.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
        self.reset_scan();
    }

    /// Next complete frame.
    ///
    /// `None` means more input is needed. `Some(Err(Decode))` means bytes were
    /// discarded and scanning can continue with the next call.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>>> {
        if self.cursor == 0 {
            let start = self
                .buf
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(self.buf.len());
            self.buf.drain(..start);

            let first = *self.buf.first()?;
            if first != b'{' && first != b'[' {
                return Some(Err(self.skip_stray_bytes()));
            }
        }

        while self.cursor < self.buf.len() {
            let b = self.buf[self.cursor];
            self.cursor += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match b {
                b'\n' if !self.stack.is_empty() => {
                    let next = self.cursor;
                    if next == self.buf.len() {
                        // Decided once the following byte arrives
                        self.cursor -= 1;
                        break;
                    }
                    if self.buf[next] == b'{' {
                        if value_may_follow(&self.buf[..next - 1]) {
                            self.resync.get_or_insert(next);
                        } else {
                            let at = self.resync.unwrap_or(next);
                            return Some(Err(self.cut_at(at, "value interrupted by a new message")));
                        }
                    }
                }
                b'"' => self.in_string = true,
                b'{' | b'[' => self.stack.push(b),
                b'}' | b']' => {
                    let opener = if b == b'}' { b'{' } else { b'[' };
                    if self.stack.pop() != Some(opener) {
                        // Mismatched bracket: the value is broken, cut here so
                        // the next value can still be found.
                        let at = self.resync.unwrap_or(self.cursor);
                        return Some(Err(self.cut_at(at, &format!("mismatched '{}'", b as char))));
                    }
                    if self.stack.is_empty() {
                        if let Some(at) = self.resync {
                            if let Err(e) = Envelope::from_slice(&self.buf[..self.cursor]) {
                                return Some(Err(self.cut_at(at, &e.to_string())));
                            }
                        }
                        return Some(Ok(self.take_frame()));
                    }
                }
                _ => {}
            }
        }

        if self.buf.len() > self.max_frame {
            if let Some(err) = self.cut_at_resync() {
                return Some(Err(err));
            }
            let dropped = self.buf.len();
            self.clear();
            return Some(Err(SyncError::Decode(format!(
                "frame exceeds {} bytes, dropped {} buffered bytes",
                self.max_frame, dropped
            ))));
        }

        None
    }

    /// Drop the open value up to its first new-line `{`, if it has one.
    ///
    /// Used when no more input will complete the value, so whatever followed
    /// the newline gets scanned on its own.
    pub fn cut_at_resync(&mut self) -> Option<SyncError> {
        let at = self.resync?;
        Some(self.cut_at(at, "incomplete value"))
    }

    fn cut_at(&mut self, at: usize, reason: &str) -> SyncError {
        let preview: String = String::from_utf8_lossy(&self.buf[..at]).chars().take(40).collect();
        self.buf.drain(..at);
        self.reset_scan();
        SyncError::Decode(format!("{}, discarded {} bytes: {:?}", reason, at, preview))
    }

    fn take_frame(&mut self) -> Vec<u8> {
        let end = self.cursor;
        let frame: Vec<u8> = self.buf.drain(..end).collect();
        self.reset_scan();
        frame
    }

    /// Discard bytes outside any value up to the next object start
    fn skip_stray_bytes(&mut self) -> SyncError {
        let end = self.buf[1..]
            .iter()
            .position(|&b| b == b'{')
            .map(|p| p + 1)
            .unwrap_or(self.buf.len());
        let preview: String = String::from_utf8_lossy(&self.buf[..end]).chars().take(40).collect();
        self.buf.drain(..end);
        SyncError::Decode(format!("discarded {} stray bytes: {:?}", end, preview))
    }

    fn reset_scan(&mut self) {
        self.cursor = 0;
        self.stack.clear();
        self.in_string = false;
        self.escaped = false;
        self.resync = None;
    }
}

/// Whether a value may start after `prefix`, judged by its last structural byte
fn value_may_follow(prefix: &[u8]) -> bool {
    prefix
        .iter()
        .rev()
        .find(|b| !b.is_ascii_whitespace())
        .map_or(true, |b| matches!(b, b'[' | b',' | b':'))
}

/// Reads envelopes from any async byte stream
pub struct EnvelopeReader<R> {
    reader: R,
    scanner: FrameScanner,
    chunk: Box<[u8]>,
    eof: bool,
    idle_timeout: Option<Duration>,
}

impl<R: AsyncRead + Unpin + Send> EnvelopeReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_scanner(reader, FrameScanner::default())
    }

    pub fn with_scanner(reader: R, scanner: FrameScanner) -> Self {
        Self {
            reader,
            scanner,
            chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
            eof: false,
            idle_timeout: None,
        }
    }

    /// Fail with [`SyncError::Idle`] when a single read waits longer than
    /// `idle_timeout`. A peer that keeps trickling bytes is never cut off.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Decode the next envelope.
    ///
    /// Returns [`SyncError::ConnectionClosed`] once the peer has closed and
    /// everything buffered has been consumed. [`SyncError::Decode`] is
    /// returned for a bad value; the reader stays usable. [`SyncError::Idle`]
    /// is returned when the peer goes quiet past the idle timeout.
    pub async fn decode_next(&mut self) -> Result<Envelope> {
        loop {
            if let Some(frame) = self.scanner.next_frame() {
                let data = frame?;
                let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
                debug!("[TTS→Editor] len={} json={}", data.len(), json_preview);
                return Envelope::from_slice(&data);
            }

            if self.eof {
                if let Some(err) = self.scanner.cut_at_resync() {
                    warn!("Peer closed inside an unterminated message, rescanning what followed it");
                    return Err(err);
                }
                if self.scanner.has_partial() {
                    warn!("Peer closed with an incomplete message buffered, discarding it");
                    self.scanner.clear();
                }
                return Err(SyncError::ConnectionClosed);
            }

            let read = self.reader.read(&mut self.chunk);
            let n = match self.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, read)
                    .await
                    .map_err(|_| SyncError::Idle(limit))?,
                None => read.await,
            }
            .map_err(|e| SyncError::Read(format!("read failed: {}", e)))?;
            if n == 0 {
                self.eof = true;
            } else {
                self.scanner.extend(&self.chunk[..n]);
            }
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> AsyncReader for EnvelopeReader<R> {
    async fn read_envelope(&mut self) -> Result<Envelope> {
        self.decode_next().await
    }
}
