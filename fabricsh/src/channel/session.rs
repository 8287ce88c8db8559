//! Interactive session over a [`Transport`].

use std::time::Duration;

use log::{debug, trace};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::PromptSet;
use crate::error::Result;
use crate::transport::Transport;

/// How a single expect ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The pattern with this ordinal matched first.
    Matched(usize),

    /// Nothing matched before the deadline.
    TimedOut,

    /// The process closed its output.
    StreamEnded,
}

/// A live interactive process.
///
/// Exactly one expect is outstanding at a time. After each expect,
/// [`before`](Session::before) holds the output preceding the match (or
/// everything buffered, on timeout or end of stream).
pub struct Session<T: Transport> {
    transport: T,
    buffer: PatternBuffer,
    name: String,
    before: String,
    matched: String,
    eof: bool,
    closed: bool,
}

impl<T: Transport> Session<T> {
    /// Wrap a transport. `name` tags log lines.
    pub fn new(transport: T, name: impl Into<String>) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(true),
            name: name.into(),
            before: String::new(),
            matched: String::new(),
            eof: false,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output preceding the last match.
    pub fn before(&self) -> &str {
        &self.before
    }

    /// Text of the last match.
    pub fn matched(&self) -> &str {
        &self.matched
    }

    /// Output received but not yet consumed by a match.
    pub fn pending(&self) -> String {
        self.buffer.as_str_lossy().into_owned()
    }

    /// Whether the remote side has closed its output.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Send raw bytes.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.transport.write(data).await
    }

    /// Send a line followed by a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        debug!("{}: send {line:?}", self.name);
        self.write_line(line).await
    }

    /// Send a line without logging it.
    pub async fn send_hidden_line(&mut self, line: &str) -> Result<()> {
        debug!("{}: send ********", self.name);
        self.write_line(line).await
    }

    /// Send a control character, e.g. `'c'` for Ctrl-C.
    pub async fn send_control(&mut self, key: char) -> Result<()> {
        let byte = (key.to_ascii_lowercase() as u8) & 0x1f;
        debug!("{}: send ^{}", self.name, key.to_ascii_uppercase());
        self.transport.write(&[byte]).await
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.transport.write(&data).await
    }

    /// Wait for the earliest of `prompts`, end of stream, or `timeout`.
    ///
    /// Output already buffered is searched first. On a match the buffer is
    /// consumed through the end of the match; on timeout it is left in
    /// place so a following expect can still see it.
    pub async fn expect_one_of(&mut self, prompts: &PromptSet, timeout: Duration) -> Result<Outcome> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(m) = self.buffer.take_match(prompts) {
                trace!("{}: matched #{} {:?}", self.name, m.ordinal, m.matched);
                self.before = m.before;
                self.matched = m.matched;
                return Ok(Outcome::Matched(m.ordinal));
            }

            if self.eof {
                debug!("{}: end of stream", self.name);
                self.before = self.buffer.take();
                self.matched.clear();
                return Ok(Outcome::StreamEnded);
            }

            match tokio::time::timeout_at(deadline, self.transport.read()).await {
                Ok(Ok(Some(chunk))) => {
                    trace!("{}: recv {:?}", self.name, String::from_utf8_lossy(&chunk));
                    self.buffer.extend(&chunk);
                }
                Ok(Ok(None)) => self.eof = true,
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!("{}: timed out after {timeout:?}", self.name);
                    self.before = self.pending();
                    self.matched.clear();
                    return Ok(Outcome::TimedOut);
                }
            }
        }
    }

    /// Terminate the process. Safe to call more than once.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("{}: closing", self.name);
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::Script;

    fn prompts(patterns: &[&str]) -> PromptSet {
        PromptSet::new(patterns).unwrap()
    }

    #[tokio::test]
    async fn test_expect_matches_across_chunks() {
        let transport = Script::new()
            .output("Last login: today\nroot@sw")
            .output("1:~# ")
            .into_transport();
        let mut session = Session::new(transport, "sw1");

        let outcome = session
            .expect_one_of(&prompts(&["[#] $"]), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Matched(0));
        assert_eq!(session.before(), "Last login: today\nroot@sw1:~");
        assert_eq!(session.matched(), "# ");
    }

    #[tokio::test]
    async fn test_earliest_match_wins() {
        let transport = Script::new().output("admin> later# ").into_transport();
        let mut session = Session::new(transport, "ctl");

        let outcome = session
            .expect_one_of(&prompts(&["[#] ", "[>] "]), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Matched(1));
        assert_eq!(session.pending(), "later# ");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_buffer() {
        let transport = Script::new().output("partial").into_transport();
        let mut session = Session::new(transport, "ctl");

        let outcome = session
            .expect_one_of(&prompts(&["[#] $"]), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(session.before(), "partial");
        assert_eq!(session.pending(), "partial");
    }

    #[tokio::test]
    async fn test_stream_end() {
        let transport = Script::new().output("bye\n").eof().into_transport();
        let mut session = Session::new(transport, "ctl");

        let outcome = session
            .expect_one_of(&prompts(&["[#] $"]), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::StreamEnded);
        assert_eq!(session.before(), "bye\n");
        assert!(session.is_eof());
    }

    #[tokio::test]
    async fn test_send_control_and_lines() {
        let script = Script::new();
        let sent = script.sent();
        let mut session = Session::new(script.into_transport(), "console");

        session.send_control('c').await.unwrap();
        session.send_line("").await.unwrap();
        session.send_hidden_line("pw").await.unwrap();
        assert_eq!(sent.lines(), ["^C", "", "pw"]);

        session.close().await.unwrap();
        session.close().await.unwrap();
    }
}
