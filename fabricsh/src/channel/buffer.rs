//! Session output buffer.
//!
//! Everything the remote side printed since the last successful match is
//! kept here. A match consumes the buffer up to the end of the matched
//! prompt; the text before it becomes the step's "before" context.

use std::fmt;

use bytes::{Buf, BytesMut};
use vte::{Parser, Perform};

use super::patterns::PromptSet;

/// A prompt found in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferMatch {
    /// Ordinal of the winning pattern in its [`PromptSet`].
    pub ordinal: usize,

    /// Output preceding the match.
    pub before: String,

    /// The matched prompt text.
    pub matched: String,
}

/// Collects printable text, dropping escape sequences.
struct Printable<'a>(&'a mut BytesMut);

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.extend_from_slice(&[byte]);
        }
    }
}

/// Buffer for accumulating output and searching it for prompts.
///
/// The escape parser lives as long as the buffer, so a sequence split
/// across two reads is still removed whole.
pub struct PatternBuffer {
    buffer: BytesMut,
    parser: Option<Parser>,
}

impl PatternBuffer {
    /// Create a new buffer.
    ///
    /// With `strip_ansi` set, escape sequences are removed from incoming
    /// data before it is stored.
    pub fn new(strip_ansi: bool) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            parser: strip_ansi.then(Parser::new),
        }
    }

    /// Extend the buffer with new data.
    pub fn extend(&mut self, data: &[u8]) {
        match &mut self.parser {
            Some(parser) => parser.advance(&mut Printable(&mut self.buffer), data),
            None => self.buffer.extend_from_slice(data),
        }
    }

    /// Find the earliest match of any pattern and consume through its end.
    ///
    /// Ties at the same offset go to the lower ordinal. Returns `None`
    /// without touching the buffer if nothing matches.
    pub fn take_match(&mut self, prompts: &PromptSet) -> Option<BufferMatch> {
        let (ordinal, start, end) = prompts.earliest(&self.buffer)?;

        let before = String::from_utf8_lossy(&self.buffer[..start]).into_owned();
        let matched = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
        self.buffer.advance(end);

        Some(BufferMatch {
            ordinal,
            before,
            matched,
        })
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> String {
        let data = self.buffer.split();
        String::from_utf8_lossy(&data).into_owned()
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("buffer", &self.buffer)
            .field("strip_ansi", &self.parser.is_some())
            .finish()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(true)
    }
}
