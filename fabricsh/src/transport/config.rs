//! Process spawn configuration.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::config::Tier;

/// Everything needed to start one local process.
///
/// Produced by the command builders; consumed by a
/// [`Spawner`](super::Spawner). Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Executable to run (looked up on `PATH` when not absolute).
    pub program: String,

    /// Arguments after the program name.
    pub args: Vec<String>,

    /// Environment overrides on top of the inherited environment.
    pub env: IndexMap<String, String>,

    /// Whether the process needs a pseudo-terminal.
    pub pty: bool,

    /// Working directory, if not the current one.
    pub working_dir: Option<PathBuf>,

    /// Timeout tier for the first expect after spawning.
    pub tier: Tier,

    /// Terminal width for PTY.
    pub terminal_width: u16,

    /// Terminal height for PTY.
    pub terminal_height: u16,

    /// Indices into `args` that carry secrets and are masked in `Display`.
    pub masked: Vec<usize>,
}

impl SpawnConfig {
    /// Create a configuration for `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: IndexMap::new(),
            pty: false,
            working_dir: None,
            tier: Tier::Login,
            terminal_width: 999,
            terminal_height: 24,
            masked: Vec::new(),
        }
    }

    /// Request a pseudo-terminal.
    pub fn with_pty(mut self, pty: bool) -> Self {
        self.pty = pty;
        self
    }

    /// Set the timeout tier for the first step.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Add an environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Mark an argument as secret.
    pub fn with_masked(mut self, index: usize) -> Self {
        self.masked.push(index);
        self
    }

    /// The full argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl fmt::Display for SpawnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.masked.contains(&i) {
                write!(f, " ********")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
