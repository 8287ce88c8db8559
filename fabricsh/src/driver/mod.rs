//! High-level driver for lab automation.
//!
//! [`Lab`] ties a [`Spawner`] to a [`LabConfig`]: it builds spawn
//! configurations, starts sessions and runs batch commands. [`Dialog`]
//! drives a started session through named steps.

mod interactive;
pub(crate) mod response;
mod step;

pub use interactive::{InteractiveBuilder, InteractiveBuilderWithInput, InteractiveEvent, InteractiveResult, InteractiveStep};
pub use response::{Response, normalize_output};
pub use step::{Dialog, finish};

use log::debug;

use crate::channel::Session;
use crate::command::{CommandBuilder, CommandSpec, Direction, Role, Target};
use crate::config::LabConfig;
use crate::error::{Error, Result};
use crate::transport::{SpawnConfig, Spawner};

/// A spawner plus the configuration every flow reads.
pub struct Lab<S: Spawner> {
    spawner: S,
    config: LabConfig,
}

impl<S: Spawner> Lab<S> {
    pub fn new(spawner: S, config: LabConfig) -> Self {
        Self { spawner, config }
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Command builder over this lab's configuration.
    pub fn builder(&self) -> CommandBuilder<'_> {
        CommandBuilder::new(&self.config)
    }

    /// Start an interactive session for `target` in `role`.
    pub async fn open(
        &self,
        target: &Target,
        role: &Role,
        command: &CommandSpec,
    ) -> Result<Session<S::Transport>> {
        let spawn = self.builder().build(target, role, command, true)?;
        self.open_config(&spawn, &target.host).await
    }

    /// Start an interactive session from a prepared configuration.
    pub async fn open_config(&self, spawn: &SpawnConfig, name: &str) -> Result<Session<S::Transport>> {
        let transport = self.spawner.spawn(spawn).await?;
        Ok(Session::new(transport, name))
    }

    /// Wrap a session in a step driver using this lab's timeouts.
    pub fn dialog<'s>(&self, session: &'s mut Session<S::Transport>) -> Dialog<'s, S::Transport> {
        Dialog::new(session, self.config.timeouts)
    }

    /// Run a batch command and return its exit status.
    pub async fn call(&self, target: &Target, role: &Role, command: &CommandSpec) -> Result<i32> {
        let spawn = self.builder().build(target, role, command, false)?;
        Ok(self.spawner.run(&spawn).await?.status)
    }

    /// Run a batch command; a non-zero exit is an error.
    pub async fn check_call(&self, target: &Target, role: &Role, command: &CommandSpec) -> Result<()> {
        self.check_output(target, role, command).await.map(drop)
    }

    /// Run a batch command and return its stdout; a non-zero exit is an
    /// error carrying the output.
    pub async fn check_output(
        &self,
        target: &Target,
        role: &Role,
        command: &CommandSpec,
    ) -> Result<String> {
        let spawn = self.builder().build(target, role, command, false)?;
        self.run_checked(&spawn).await
    }

    /// Copy files to or from `target`. The last path is the destination.
    pub async fn scp(&self, target: &Target, direction: Direction, paths: &[&str]) -> Result<()> {
        let spawn = self.builder().scp(target, direction, paths)?;
        self.run_checked(&spawn).await.map(drop)
    }

    /// Run `/bin/true` in strict batch mode; `true` iff it exits 0.
    pub async fn test_batch_ssh(&self, target: &Target) -> Result<bool> {
        let status = self
            .call(target, &Role::RootShell, &CommandSpec::argv(["/bin/true"]))
            .await?;
        debug!("batch ssh to {}@{}: status {status}", target.user, target.host);
        Ok(status == 0)
    }

    async fn run_checked(&self, spawn: &SpawnConfig) -> Result<String> {
        let output = self.spawner.run(spawn).await?;
        output.check(spawn)
    }
}

/// Exit status for a step failure, for `call`-style wrappers over
/// interactive flows.
///
/// An unexpected prompt reports its ordinal; a timeout reports 124 and a
/// dropped connection 255, after `timeout(1)` and `ssh(1)`.
pub fn step_status(error: &Error) -> Option<i32> {
    use crate::error::StepFailure;

    let step = error.as_step()?;
    Some(match step.failure {
        StepFailure::Unexpected { ordinal } => i32::try_from(ordinal).unwrap_or(i32::MAX),
        StepFailure::TimedOut(_) => 124,
        StepFailure::StreamEnded => 255,
    })
}
