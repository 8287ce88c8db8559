//! Lab configuration.
//!
//! Credentials, account names, binary names and timeout tiers are injected
//! here rather than baked into the flows. A [`LabConfig`] is read-only for the
//! lifetime of a flow; anything a single flow needs to vary is passed to it
//! as a parameter.

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Named timeout class for a step, chosen by the expected remote latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Device already responsive.
    Short,
    /// Device performing work (mode transitions, command execution).
    Long,
    /// Credential exchange.
    Login,
    /// Full power-cycle or install-and-reboot.
    Boot,
}

/// Durations for each [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(deserialize_with = "secs")]
    pub short: Duration,
    #[serde(deserialize_with = "secs")]
    pub long: Duration,
    #[serde(deserialize_with = "secs")]
    pub login: Duration,
    #[serde(deserialize_with = "secs")]
    pub boot: Duration,
}

impl Timeouts {
    /// The same duration for every tier. Handy for tests.
    pub fn uniform(duration: Duration) -> Self {
        Self {
            short: duration,
            long: duration,
            login: duration,
            boot: duration,
        }
    }

    /// Duration for a tier.
    pub fn get(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Short => self.short,
            Tier::Long => self.long,
            Tier::Login => self.login,
            Tier::Boot => self.boot,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(5),
            long: Duration::from_secs(30),
            login: Duration::from_secs(10),
            boot: Duration::from_secs(180),
        }
    }
}

/// A username and password pair.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// The secondary uid-0 account provisioned on switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecoveryAccount {
    pub user: String,
    pub home: String,
}

impl Default for RecoveryAccount {
    fn default() -> Self {
        Self {
            user: "recovery2".to_string(),
            home: "/var/run/recovery2".to_string(),
        }
    }
}

/// Names of the vendor CLI binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliBinaries {
    /// Controller CLI, run through `sudo` as the admin user.
    pub controller: String,
    /// Switch CLI.
    pub switch: String,
}

impl Default for CliBinaries {
    fn default() -> Self {
        Self {
            controller: "floodlight-cli".to_string(),
            switch: "pcli".to_string(),
        }
    }
}

/// A CLI checkout in a local workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalCli {
    /// CLI executable.
    pub program: PathBuf,
    /// Workspace root; becomes the working directory.
    pub workspace: PathBuf,
    /// Environment overrides.
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

/// Console recovery retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleRetry {
    /// Blank-send attempts before giving up on a login prompt.
    pub attempts: u32,
    /// Pause after the first failed attempt; doubles each time.
    #[serde(deserialize_with = "secs")]
    pub backoff: Duration,
}

impl Default for ConsoleRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Everything a flow needs that is not part of its target.
#[derive(Debug, Deserialize)]
pub struct LabConfig {
    /// Controller and switch admin account.
    pub admin: Credentials,

    /// Console login for Switch Light switches.
    pub switch_light: Credentials,

    /// Console login for Open Network Linux switches.
    pub onl: Credentials,

    #[serde(default)]
    pub recovery: RecoveryAccount,

    #[serde(default)]
    pub cli: CliBinaries,

    #[serde(default)]
    pub local_cli: Option<LocalCli>,

    /// Switch management interface.
    #[serde(default = "default_mgmt_interface")]
    pub mgmt_interface: String,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub console: ConsoleRetry,
}

impl LabConfig {
    /// A config with the given credentials and defaults for everything else.
    pub fn new(admin: Credentials, switch_light: Credentials, onl: Credentials) -> Self {
        Self {
            admin,
            switch_light,
            onl,
            recovery: RecoveryAccount::default(),
            cli: CliBinaries::default(),
            local_cli: None,
            mgmt_interface: default_mgmt_interface(),
            timeouts: Timeouts::default(),
            console: ConsoleRetry::default(),
        }
    }

    /// Replace the timeout tiers.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace the console retry policy.
    pub fn with_console_retry(mut self, retry: ConsoleRetry) -> Self {
        self.console = retry;
        self
    }

    /// Configure the local workspace CLI.
    pub fn with_local_cli(mut self, local_cli: LocalCli) -> Self {
        self.local_cli = Some(local_cli);
        self
    }
}

fn default_mgmt_interface() -> String {
    "ma1".to_string()
}

fn secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
