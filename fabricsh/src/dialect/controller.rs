//! Controller access: root shell, CLI, and admin-account root enablement.

use log::{debug, info};
use secrecy::ExposeSecret;

use super::prompts;
use super::provision::{PublicKey, batch, root_key_setup};
use super::switch::SwitchConnect;
use crate::address::switch_address_from_config;
use crate::command::{CommandSpec, Direction, Role, Target};
use crate::config::{Credentials, Tier};
use crate::driver::{Dialog, Lab, finish};
use crate::error::{Error, Result};
use crate::transport::{Spawner, Transport};

/// Root user on the controller.
const ROOT_USER: &str = "root";

/// A controller reached over SSH.
pub struct Controller<'l, S: Spawner> {
    lab: &'l Lab<S>,
    host: String,
}

impl<'l, S: Spawner> Controller<'l, S> {
    pub fn new(lab: &'l Lab<S>, host: impl Into<String>) -> Self {
        Self {
            lab,
            host: host.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn root(&self) -> Target {
        Target::new(&self.host, ROOT_USER)
    }

    /// Run a root shell command and return its exit status.
    pub async fn call(&self, command: impl Into<CommandSpec>) -> Result<i32> {
        self.lab.call(&self.root(), &Role::RootShell, &command.into()).await
    }

    pub async fn check_call(&self, command: impl Into<CommandSpec>) -> Result<()> {
        self.lab.check_call(&self.root(), &Role::RootShell, &command.into()).await
    }

    pub async fn check_output(&self, command: impl Into<CommandSpec>) -> Result<String> {
        self.lab.check_output(&self.root(), &Role::RootShell, &command.into()).await
    }

    /// Copy files to or from the controller as root.
    pub async fn scp(&self, direction: Direction, paths: &[&str]) -> Result<()> {
        self.lab.scp(&self.root(), direction, paths).await
    }

    /// Whether root can log in with a key.
    pub async fn test_batch_ssh(&self) -> Result<bool> {
        self.lab.test_batch_ssh(&self.root()).await
    }

    /// The controller CLI, optionally in `mode`.
    pub fn cli(&self, mode: Option<&str>) -> ControllerCli<'l, S> {
        let mut target = self.root();
        target.mode = mode.map(str::to_string);
        ControllerCli {
            lab: self.lab,
            target,
            role: Role::ControllerCli,
        }
    }

    /// A switch reached through this controller's `connect switch`.
    pub fn switch(&self, name: impl Into<String>) -> SwitchConnect<'l, S> {
        SwitchConnect::new(self.lab, &self.host, name)
    }

    /// Management address the controller has configured for `switch`.
    ///
    /// `None` if the controller does not know the switch or has no address
    /// line for the management interface.
    pub async fn switch_address(&self, switch: &str) -> Result<Option<String>> {
        let command = CommandSpec::argv(["show", "switch", switch, "running-config"]);
        let config = match self.cli(None).check_output(command).await {
            Ok(config) => config,
            Err(Error::CommandFailed { status, .. }) => {
                debug!("{}: no running-config for {switch} (status {status})", self.host);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(switch_address_from_config(&config, &self.lab.config().mgmt_interface))
    }

    /// Authorize `key` for root by logging in as the admin user and
    /// escalating through `debug bash` and `sudo`.
    pub async fn enable_root(&self, key: &PublicKey) -> Result<()> {
        let config = self.lab.config();
        let target = Target::new(&self.host, &config.admin.user);
        let role = Role::AdminShell {
            disable_pubkey: true,
        };
        let spawn = self
            .lab
            .builder()
            .build(&target, &role, &CommandSpec::Interactive, true)?;

        let mut session = self.lab.open_config(&spawn, &self.host).await?;
        let result = enable_root(&mut self.lab.dialog(&mut session), &config.admin, spawn.tier, key).await;
        if result.is_ok() {
            info!("{}: root key installed", self.host);
        }
        finish(&mut session, result).await
    }
}

async fn enable_root<T: Transport>(
    dialog: &mut Dialog<'_, T>,
    admin: &Credentials,
    tier: Tier,
    key: &PublicKey,
) -> Result<()> {
    dialog.expect("password", &prompts::PASSWORD, tier).await?;
    dialog
        .exchange_hidden("login", admin.password.expose_secret(), &prompts::CLI_OR_PASSWORD, Tier::Login)
        .await?;
    dialog.exchange("debug bash", "debug bash", &prompts::USER_SHELL, Tier::Short).await?;
    dialog.exchange("root shell", "exec sudo bash -e", &prompts::ROOT, Tier::Short).await?;
    dialog.run(&batch(root_key_setup(key), &prompts::ROOT_OR_CLI)).await?;
    Ok(())
}

/// Batch access to the controller CLI.
pub struct ControllerCli<'l, S: Spawner> {
    lab: &'l Lab<S>,
    target: Target,
    role: Role,
}

impl<'l, S: Spawner> ControllerCli<'l, S> {
    /// The CLI from the configured local workspace, optionally in `mode`.
    pub fn local(lab: &'l Lab<S>, mode: Option<&str>) -> Self {
        let mut target = Target::new("localhost", &lab.config().admin.user);
        target.mode = mode.map(str::to_string);
        Self {
            lab,
            target,
            role: Role::LocalCli,
        }
    }

    pub async fn call(&self, command: impl Into<CommandSpec>) -> Result<i32> {
        self.lab.call(&self.target, &self.role, &command.into()).await
    }

    pub async fn check_call(&self, command: impl Into<CommandSpec>) -> Result<()> {
        self.lab.check_call(&self.target, &self.role, &command.into()).await
    }

    pub async fn check_output(&self, command: impl Into<CommandSpec>) -> Result<String> {
        self.lab.check_output(&self.target, &self.role, &command.into()).await
    }
}
