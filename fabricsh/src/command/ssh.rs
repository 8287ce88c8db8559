//! `ssh` and `scp` argument vectors.
//!
//! Lab hosts are ephemeral and get re-imaged constantly, so host keys are
//! never checked or remembered.

use std::str::FromStr;
use std::time::Duration;

use super::{CommandSpec, Target};
use crate::config::Tier;
use crate::error::BuildError;
use crate::quote::shell_quote;
use crate::transport::SpawnConfig;

/// Options shared by every host-key-less OpenSSH invocation.
const NO_HOST_KEYS: [&str; 2] = [
    "-oStrictHostKeyChecking=no",
    "-oUserKnownHostsFile=/dev/null",
];

/// How `ssh` authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshAuth {
    /// Public key only, never prompt.
    Batch,

    /// Allow a password prompt; no challenge-response.
    Password {
        /// Keep public-key auth enabled alongside the password.
        pubkey: bool,
    },
}

/// Per-invocation `ssh` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SshOptions {
    /// Force remote TTY allocation.
    pub tty: bool,

    /// Authentication mode.
    pub auth: SshAuth,

    /// `ConnectTimeout`, rounded up to whole seconds.
    pub connect_timeout: Option<Duration>,
}

impl SshOptions {
    /// Strict public-key batch mode without a TTY.
    pub fn batch() -> Self {
        Self {
            tty: false,
            auth: SshAuth::Batch,
            connect_timeout: None,
        }
    }

    /// Interactive password authentication with a TTY.
    pub fn password(pubkey: bool) -> Self {
        Self {
            tty: true,
            auth: SshAuth::Password { pubkey },
            connect_timeout: None,
        }
    }

    pub fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// Build an `ssh` invocation.
///
/// A [`CommandSpec::Line`] becomes `/bin/sh -c <quoted "IFS=;" + line>` so a
/// `;`-separated line runs as one remote invocation; an
/// [`CommandSpec::Argv`] is appended verbatim after `--`.
pub(crate) fn ssh(target: &Target, command: &CommandSpec, options: &SshOptions) -> SpawnConfig {
    let mut args = vec!["-F/dev/null".to_string()];

    if target.is_ipv6() {
        args.push("-6".to_string());
    }
    if options.tty {
        args.push("-oRequestTTY=force".to_string());
    }
    args.push(format!("-oUser={}", target.user));
    args.extend(NO_HOST_KEYS.iter().map(|s| s.to_string()));

    match options.auth {
        SshAuth::Batch => args.push("-oBatchMode=yes".to_string()),
        SshAuth::Password { pubkey } => {
            args.push("-oBatchMode=no".to_string());
            args.push("-oPasswordAuthentication=yes".to_string());
            args.push("-oChallengeResponseAuthentication=no".to_string());
            if !pubkey {
                args.push("-oPubkeyAuthentication=no".to_string());
            }
        }
    }

    if let Some(timeout) = options.connect_timeout {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        args.push(format!("-oConnectTimeout={}", secs.max(1)));
    }

    args.push(target.host.clone());

    match command {
        CommandSpec::Line(line) if !line.is_empty() => {
            args.push("--".to_string());
            args.push("/bin/sh".to_string());
            args.push("-c".to_string());
            args.push(shell_quote(&format!("IFS=;{line}")));
        }
        CommandSpec::Argv(argv) if !argv.is_empty() => {
            args.push("--".to_string());
            args.extend(argv.iter().cloned());
        }
        _ => {}
    }

    SpawnConfig::new("ssh", args)
        .with_pty(options.tty)
        .with_tier(Tier::Login)
}

/// Copy direction relative to the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Remote sources to a local destination.
    In,
    /// Local sources to a remote destination.
    Out,
}

impl FromStr for Direction {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(BuildError::InvalidDirection {
                direction: other.to_string(),
            }),
        }
    }
}

/// Build an `scp` invocation. The last path is the destination.
pub(crate) fn scp(
    target: &Target,
    direction: Direction,
    paths: &[&str],
) -> Result<SpawnConfig, BuildError> {
    let Some((dest, sources)) = paths.split_last() else {
        return Err(BuildError::MissingPaths { count: 0 });
    };
    if sources.is_empty() {
        return Err(BuildError::MissingPaths { count: paths.len() });
    }

    let host = if target.is_ipv6() {
        format!("[{}]", target.host)
    } else {
        target.host.clone()
    };
    let remote = |path: &str| format!("{host}:{}", shell_quote(path));

    let mut args = vec!["-F/dev/null".to_string(), format!("-oUser={}", target.user)];
    args.extend(NO_HOST_KEYS.iter().map(|s| s.to_string()));
    args.push("-oBatchMode=yes".to_string());

    match direction {
        Direction::In => {
            args.extend(sources.iter().map(|p| remote(p)));
            args.push(shell_quote(dest));
        }
        Direction::Out => {
            args.extend(sources.iter().map(|p| shell_quote(p)));
            args.push(remote(dest));
        }
    }

    Ok(SpawnConfig::new("scp", args).with_tier(Tier::Long))
}
