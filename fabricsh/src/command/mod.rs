//! Command construction.
//!
//! Turns "connect to this target in this role, optionally running this
//! command" into a [`SpawnConfig`]. Every builder is a pure function of its
//! inputs; nothing here touches the network.
//!
//! | Role                         | Process                                        |
//! |------------------------------|------------------------------------------------|
//! | [`Role::RootShell`]          | `ssh` in batch mode                            |
//! | [`Role::AdminShell`]         | `ssh` with password auth, interactive only     |
//! | [`Role::ControllerCli`]      | `ssh` → `sudo -u admin` → controller CLI       |
//! | [`Role::SwitchCli`]          | `ssh` → switch CLI (recovery account)          |
//! | [`Role::SwitchConnect`]      | controller CLI running `connect switch <name>` |
//! | [`Role::LocalCli`]           | controller CLI from a local workspace          |

mod cli;
mod ssh;

pub use ssh::{Direction, SshAuth, SshOptions};

use crate::config::LabConfig;
use crate::error::BuildError;
use crate::transport::SpawnConfig;

/// Who to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Hostname or address. A `:` selects IPv6.
    pub host: String,

    /// Login user.
    pub user: String,

    /// CLI mode for the nested vendor CLI, if any.
    pub mode: Option<String>,
}

impl Target {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            mode: None,
        }
    }

    /// Set the CLI mode.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Whether the host is an IPv6 address.
    pub fn is_ipv6(&self) -> bool {
        self.host.contains(':')
    }
}

/// What to run once connected.
///
/// A [`Line`](CommandSpec::Line) is a packed shell command line and gets
/// shell-splitting semantics on the remote side; an
/// [`Argv`](CommandSpec::Argv) is a literal argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandSpec {
    /// Interactive shell or CLI.
    #[default]
    Interactive,

    /// A single command line.
    Line(String),

    /// An argument vector.
    Argv(Vec<String>),
}

impl CommandSpec {
    /// Build an argument vector from tokens.
    pub fn argv<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::Argv(tokens.into_iter().map(Into::into).collect())
    }

    /// Whether there is nothing to run.
    pub fn is_empty(&self) -> bool {
        match self {
            CommandSpec::Interactive => true,
            CommandSpec::Line(line) => line.is_empty(),
            CommandSpec::Argv(argv) => argv.is_empty(),
        }
    }

    /// The command as one line, tokens joined by spaces.
    pub fn joined(&self) -> String {
        match self {
            CommandSpec::Interactive => String::new(),
            CommandSpec::Line(line) => line.clone(),
            CommandSpec::Argv(argv) => argv.join(" "),
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(line: &str) -> Self {
        CommandSpec::Line(line.to_string())
    }
}

impl From<String> for CommandSpec {
    fn from(line: String) -> Self {
        CommandSpec::Line(line)
    }
}

impl From<Vec<String>> for CommandSpec {
    fn from(argv: Vec<String>) -> Self {
        CommandSpec::Argv(argv)
    }
}

impl From<&[&str]> for CommandSpec {
    fn from(argv: &[&str]) -> Self {
        CommandSpec::argv(argv.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for CommandSpec {
    fn from(argv: [&str; N]) -> Self {
        CommandSpec::argv(argv)
    }
}

/// Connection class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Direct root shell in batch mode.
    RootShell,

    /// Password-authenticated admin shell. Rejects batch commands.
    AdminShell {
        /// Turn off public-key auth so the password prompt always appears.
        disable_pubkey: bool,
    },

    /// Controller CLI through `sudo` as the admin user.
    ControllerCli,

    /// Switch CLI over SSH.
    SwitchCli,

    /// Switch CLI reached through the controller's `connect switch`.
    SwitchConnect { switch: String },

    /// Controller CLI from a local workspace.
    LocalCli,
}

impl Role {
    /// Short name for errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Role::RootShell => "root shell",
            Role::AdminShell { .. } => "admin shell",
            Role::ControllerCli => "controller CLI",
            Role::SwitchCli => "switch CLI",
            Role::SwitchConnect { .. } => "switch connect",
            Role::LocalCli => "local CLI",
        }
    }
}

/// Builds spawn configurations from the lab configuration.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    config: &'a LabConfig,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(config: &'a LabConfig) -> Self {
        Self { config }
    }

    /// Build the spawn configuration for `target` in `role`.
    ///
    /// `tty` only applies to [`Role::RootShell`]; the CLI roles and the admin
    /// shell always get a pseudo-terminal.
    pub fn build(
        &self,
        target: &Target,
        role: &Role,
        command: &CommandSpec,
        tty: bool,
    ) -> Result<SpawnConfig, BuildError> {
        match role {
            Role::RootShell => Ok(ssh::ssh(
                target,
                command,
                &SshOptions::batch().with_tty(tty).with_connect_timeout(self.config.timeouts.login),
            )),
            Role::AdminShell { disable_pubkey } => {
                cli::admin_shell(self.config, target, command, *disable_pubkey)
            }
            Role::ControllerCli => cli::controller_cli(self.config, target, command),
            Role::SwitchCli => cli::switch_cli(self.config, target, command),
            Role::SwitchConnect { switch } => {
                if !command.is_empty() {
                    return Err(BuildError::BatchCommandRejected { role: role.name() });
                }
                cli::switch_connect(self.config, target, switch)
            }
            Role::LocalCli => cli::local_cli(self.config, target.mode.as_deref(), command),
        }
    }

    /// Build an `scp` invocation against `target`.
    ///
    /// The last path is the destination; the rest are sources.
    pub fn scp(
        &self,
        target: &Target,
        direction: Direction,
        paths: &[&str],
    ) -> Result<SpawnConfig, BuildError> {
        ssh::scp(target, direction, paths)
    }
}

/// Check a CLI mode name.
fn validate_mode(mode: &str) -> Result<(), BuildError> {
    let valid = !mode.is_empty()
        && mode
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BuildError::InvalidMode {
            mode: mode.to_string(),
        })
    }
}
