//! Process transport layer.
//!
//! A [`Spawner`] turns a [`SpawnConfig`] into either a live byte stream (a
//! [`Transport`], normally a pseudo-terminal) or, for fire-and-forget calls,
//! a finished [`CommandOutput`]. Sessions and flows only ever see these two
//! traits, so a scripted implementation can stand in for real devices.

pub mod config;
mod process;
mod pty;
pub mod scripted;

pub use config::SpawnConfig;
pub use pty::{LocalSpawner, PtyTransport};

use std::future::Future;

use crate::error::{Error, Result};

/// Raw byte stream to an interactive process.
pub trait Transport: Send {
    /// Write bytes to the process input.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output. `None` means end of stream.
    ///
    /// Must be cancel-safe: the session drops this future on timeout.
    fn read(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Terminate the process and reap it.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Creates processes from spawn configurations.
pub trait Spawner: Send + Sync {
    /// Transport produced for interactive sessions.
    type Transport: Transport;

    /// Start an interactive process.
    fn spawn(&self, config: &SpawnConfig) -> impl Future<Output = Result<Self::Transport>> + Send;

    /// Run a process to completion, capturing its output.
    fn run(&self, config: &SpawnConfig) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Output of a non-interactive process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,

    /// Exit status; `-1` if the process was killed by a signal.
    pub status: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            status,
        }
    }

    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`].
    pub fn check(self, config: &SpawnConfig) -> Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(Error::CommandFailed {
                command: config.to_string(),
                status: self.status,
                output: self.stdout,
            })
        }
    }
}
