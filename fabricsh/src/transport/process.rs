//! Non-interactive process execution.

use std::process::Stdio;

use log::debug;
use tokio::process::Command;

use super::{CommandOutput, SpawnConfig};
use crate::error::{Result, SessionError};

/// Run `config` to completion and capture stdout.
///
/// Stdin is closed and stderr is passed through, so `ssh` diagnostics land
/// on the caller's terminal rather than in the captured output.
pub(crate) async fn run(config: &SpawnConfig) -> Result<CommandOutput> {
    debug!("running {config}");

    let mut command = Command::new(&config.program);
    command
        .args(&config.args)
        .envs(&config.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    if let Some(dir) = &config.working_dir {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|e| SessionError::SpawnFailed {
            program: config.program.clone(),
            reason: e.to_string(),
        })?;

    let status = output.status.code().unwrap_or(-1);
    debug!("{} exited with status {status}", config.program);

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        status,
    })
}
