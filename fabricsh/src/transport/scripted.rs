//! Scripted transport for exercising flows without devices.
//!
//! A [`Script`] is an ordered list of things the fake remote side does:
//! print some output, wait for a particular line of input, or hang up.
//! When the script runs out the remote side goes silent, so the next
//! expect times out.
//!
//! ```
//! use fabricsh::transport::scripted::Script;
//!
//! let script = Script::new()
//!     .output("Password: ")
//!     .expect_line("secret")
//!     .output("admin> ");
//! let sent = script.sent();
//! # let _ = (script, sent);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::{CommandOutput, SpawnConfig, Spawner, Transport};
use crate::error::{Result, SessionError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Output(Vec<u8>),
    Input(String),
    Eof,
}

/// Lines written to a scripted transport, in order.
///
/// Control characters are recorded as their own entries in caret
/// notation (`^C`).
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<String>>>);

impl SentLog {
    /// Snapshot of everything sent so far.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    /// Whether `line` was ever sent.
    pub fn contains(&self, line: &str) -> bool {
        lock(&self.0).iter().any(|l| l == line)
    }

    /// How many times `line` was sent.
    pub fn count(&self, line: &str) -> usize {
        lock(&self.0).iter().filter(|l| *l == line).count()
    }

    fn push(&self, line: String) {
        lock(&self.0).push(line);
    }
}

/// Behaviour of one fake remote process.
#[derive(Debug, Clone, Default)]
pub struct Script {
    events: VecDeque<Event>,
    sent: SentLog,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print `text`.
    pub fn output(mut self, text: impl AsRef<[u8]>) -> Self {
        self.events.push_back(Event::Output(text.as_ref().to_vec()));
        self
    }

    /// Block further output until `line` is written.
    pub fn expect_line(mut self, line: impl Into<String>) -> Self {
        self.events.push_back(Event::Input(line.into()));
        self
    }

    /// Wait for `line`, then print `reply`.
    pub fn respond(self, line: impl Into<String>, reply: impl AsRef<[u8]>) -> Self {
        self.expect_line(line).output(reply)
    }

    /// Hang up.
    pub fn eof(mut self) -> Self {
        self.events.push_back(Event::Eof);
        self
    }

    /// Handle on the lines this script will receive.
    pub fn sent(&self) -> SentLog {
        self.sent.clone()
    }

    /// Turn the script into a transport.
    pub fn into_transport(self) -> ScriptedTransport {
        ScriptedTransport {
            events: self.events,
            sent: self.sent,
            line: Vec::new(),
            closed: false,
        }
    }
}

/// Transport that plays back a [`Script`].
#[derive(Debug)]
pub struct ScriptedTransport {
    events: VecDeque<Event>,
    sent: SentLog,
    line: Vec<u8>,
    closed: bool,
}

impl ScriptedTransport {
    fn complete_line(&mut self, line: String) {
        debug!("scripted input: {line:?}");

        let waiting = self
            .events
            .iter()
            .position(|e| !matches!(e, Event::Output(_)));
        if let Some(index) = waiting {
            if self.events[index] == Event::Input(line.clone()) {
                self.events.remove(index);
            }
        }
        self.sent.push(line);
    }

    /// Whether every scripted event has been played.
    pub fn is_exhausted(&self) -> bool {
        self.events.is_empty()
    }
}

impl Transport for ScriptedTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(SessionError::Closed.into());
        }
        for &byte in data {
            match byte {
                b'\n' | b'\r' => {
                    let line = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();
                    self.complete_line(line);
                }
                0..=0x1f | 0x7f => {
                    let caret = if byte == 0x7f { '?' } else { (byte + 0x40) as char };
                    self.complete_line(format!("^{caret}"));
                }
                _ => self.line.push(byte),
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        if self.closed {
            return Ok(None);
        }
        match self.events.front() {
            Some(Event::Output(_)) => {
                if let Some(Event::Output(bytes)) = self.events.pop_front() {
                    return Ok(Some(bytes));
                }
                Ok(None)
            }
            Some(Event::Eof) => Ok(None),
            Some(Event::Input(_)) | None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Spawner handing out scripted transports and canned batch results in
/// order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSpawner {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    outputs: Arc<Mutex<VecDeque<CommandOutput>>>,
    spawned: Arc<Mutex<Vec<SpawnConfig>>>,
}

impl ScriptedSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next interactive spawn.
    pub fn push_script(&self, script: Script) -> SentLog {
        let sent = script.sent();
        lock(&self.scripts).push_back(script);
        sent
    }

    /// Queue the result of the next batch run.
    pub fn push_output(&self, output: CommandOutput) {
        lock(&self.outputs).push_back(output);
    }

    /// Every configuration spawned or run so far.
    pub fn spawned(&self) -> Vec<SpawnConfig> {
        lock(&self.spawned).clone()
    }
}

impl Spawner for ScriptedSpawner {
    type Transport = ScriptedTransport;

    async fn spawn(&self, config: &SpawnConfig) -> Result<ScriptedTransport> {
        lock(&self.spawned).push(config.clone());
        let script = lock(&self.scripts).pop_front();
        let script = script.ok_or_else(|| SessionError::SpawnFailed {
            program: config.program.clone(),
            reason: "no script queued".to_string(),
        })?;
        Ok(script.into_transport())
    }

    async fn run(&self, config: &SpawnConfig) -> Result<CommandOutput> {
        lock(&self.spawned).push(config.clone());
        let output = lock(&self.outputs).pop_front();
        Ok(output.ok_or_else(|| SessionError::SpawnFailed {
            program: config.program.clone(),
            reason: "no output queued".to_string(),
        })?)
    }
}
