//! Switch access, directly or through the controller.

use std::time::Instant;

use log::info;
use secrecy::ExposeSecret;

use super::SwitchFamily;
use super::prompts;
use super::provision::{PublicKey, batch, recovery_setup, root_key_setup};
use crate::channel::Session;
use crate::command::{CommandSpec, Role, Target};
use crate::config::{Credentials, RecoveryAccount, Tier};
use crate::driver::{Dialog, Lab, Response, finish, step_status};
use crate::error::{BuildError, Result};
use crate::transport::{Spawner, Transport};

/// Controller account that runs `connect switch`.
const CONTROLLER_USER: &str = "root";

/// A switch reached at its own address.
pub struct Switch<'l, S: Spawner> {
    lab: &'l Lab<S>,
    host: String,
}

impl<'l, S: Spawner> Switch<'l, S> {
    pub fn new(lab: &'l Lab<S>, host: impl Into<String>) -> Self {
        Self {
            lab,
            host: host.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn recovery(&self) -> Target {
        Target::new(&self.host, &self.lab.config().recovery.user)
    }

    /// The switch CLI as the recovery account, optionally in `mode`.
    pub fn pcli(&self, mode: Option<&str>) -> SwitchCli<'l, S> {
        let mut target = self.recovery();
        target.mode = mode.map(str::to_string);
        SwitchCli { lab: self.lab, target }
    }

    /// Whether the recovery account can log in with a key.
    pub async fn test_batch_ssh(&self) -> Result<bool> {
        self.lab.test_batch_ssh(&self.recovery()).await
    }

    /// Authorize `key` for root, logging in with `family`'s credentials.
    pub async fn enable_root(&self, family: SwitchFamily, key: &PublicKey) -> Result<()> {
        let credentials = family.credentials(self.lab.config());
        let target = Target::new(&self.host, &credentials.user);
        let role = Role::AdminShell {
            disable_pubkey: true,
        };
        let spawn = self
            .lab
            .builder()
            .build(&target, &role, &CommandSpec::Interactive, true)?;

        let mut session = self.lab.open_config(&spawn, &self.host).await?;
        let result = enable_root(&mut self.lab.dialog(&mut session), family, credentials, spawn.tier, key).await;
        if result.is_ok() {
            info!("{}: root key installed", self.host);
        }
        finish(&mut session, result).await
    }
}

async fn enable_root<T: Transport>(
    dialog: &mut Dialog<'_, T>,
    family: SwitchFamily,
    credentials: &Credentials,
    tier: Tier,
    key: &PublicKey,
) -> Result<()> {
    dialog.expect("password", &prompts::PASSWORD, tier).await?;
    dialog
        .exchange_hidden("login", credentials.password.expose_secret(), family.ssh_login(), Tier::Login)
        .await?;
    family.escalate(dialog).await?;
    dialog.run(&batch(root_key_setup(key), &prompts::ROOT_OR_CLI)).await?;
    Ok(())
}

/// Batch access to the switch CLI.
pub struct SwitchCli<'l, S: Spawner> {
    lab: &'l Lab<S>,
    target: Target,
}

impl<S: Spawner> SwitchCli<'_, S> {
    pub async fn call(&self, command: impl Into<CommandSpec>) -> Result<i32> {
        self.lab.call(&self.target, &Role::SwitchCli, &command.into()).await
    }

    pub async fn check_call(&self, command: impl Into<CommandSpec>) -> Result<()> {
        self.lab.check_call(&self.target, &Role::SwitchCli, &command.into()).await
    }

    pub async fn check_output(&self, command: impl Into<CommandSpec>) -> Result<String> {
        self.lab.check_output(&self.target, &Role::SwitchCli, &command.into()).await
    }
}

/// A switch CLI session opened with `connect switch` on the controller.
///
/// Every operation spawns its own session and closes it before returning.
pub struct SwitchConnect<'l, S: Spawner> {
    lab: &'l Lab<S>,
    controller: String,
    switch: String,
}

impl<'l, S: Spawner> SwitchConnect<'l, S> {
    pub fn new(lab: &'l Lab<S>, controller: impl Into<String>, switch: impl Into<String>) -> Self {
        Self {
            lab,
            controller: controller.into(),
            switch: switch.into(),
        }
    }

    pub fn switch(&self) -> &str {
        &self.switch
    }

    /// Run `command` in the switch CLI and return its output.
    pub async fn check_output(&self, command: impl Into<CommandSpec>) -> Result<Response> {
        let command = command.into();
        if command.is_empty() {
            return Err(BuildError::MissingCommand {
                role: "switch connect",
            }
            .into());
        }
        let line = command.joined();
        let (mut session, tier) = self.connect().await?;
        let result = run_command(&mut self.lab.dialog(&mut session), tier, &line).await;
        finish(&mut session, result).await
    }

    pub async fn check_call(&self, command: impl Into<CommandSpec>) -> Result<()> {
        self.check_output(command).await.map(drop)
    }

    /// Like [`check_call`](Self::check_call), but a failed step becomes an
    /// exit status instead of an error.
    pub async fn call(&self, command: impl Into<CommandSpec>) -> Result<i32> {
        match self.check_output(command).await {
            Ok(_) => Ok(0),
            Err(e) => step_status(&e).ok_or(e),
        }
    }

    /// Provision the uid-0 recovery account on the switch and authorize
    /// `key` for it.
    pub async fn enable_recovery(&self, key: &PublicKey) -> Result<()> {
        let account = &self.lab.config().recovery;
        let (mut session, tier) = self.connect().await?;
        let result = enable_recovery(&mut self.lab.dialog(&mut session), tier, account, key).await;
        if result.is_ok() {
            info!("{}: recovery account provisioned", self.switch);
        }
        finish(&mut session, result).await
    }

    /// Spawn `connect switch` on the controller. Returns the session and the
    /// tier for its first expect.
    async fn connect(&self) -> Result<(Session<S::Transport>, Tier)> {
        let target = Target::new(&self.controller, CONTROLLER_USER);
        let role = Role::SwitchConnect {
            switch: self.switch.clone(),
        };
        let spawn = self
            .lab
            .builder()
            .build(&target, &role, &CommandSpec::Interactive, true)?;
        let session = self.lab.open_config(&spawn, &self.switch).await?;
        Ok((session, spawn.tier))
    }
}

async fn run_command<T: Transport>(
    dialog: &mut Dialog<'_, T>,
    tier: Tier,
    line: &str,
) -> Result<Response> {
    dialog.expect("connect switch", &prompts::CLI, tier).await?;
    dialog.exchange("debug admin", "debug admin", &prompts::CLI, Tier::Long).await?;

    let start = Instant::now();
    let raw = dialog.exchange("command", line, &prompts::CLI, Tier::Long).await?;
    let response = Response::new(line, raw, start.elapsed());

    dialog.exchange_eof("exit", "exit", &prompts::CLI, Tier::Short).await?;
    Ok(response)
}

async fn enable_recovery<T: Transport>(
    dialog: &mut Dialog<'_, T>,
    tier: Tier,
    account: &RecoveryAccount,
    key: &PublicKey,
) -> Result<()> {
    dialog.expect("connect switch", &prompts::CLI, tier).await?;
    dialog.exchange("debug admin", "debug admin", &prompts::CLI, Tier::Short).await?;
    dialog.exchange("enable", "enable", &prompts::ROOT, Tier::Short).await?;
    dialog.exchange("debug bash", "debug bash", &prompts::ROOT, Tier::Short).await?;
    dialog.exchange("bash -e", "exec bash -e", &prompts::ROOT, Tier::Short).await?;
    dialog.exchange("mark prompt", "PS1='BASH# '", &prompts::BASH_MARKED, Tier::Short).await?;
    dialog.exchange("marked prompt", "echo hello", &prompts::BASH_MARKED, Tier::Short).await?;
    dialog.run(&batch(recovery_setup(account, key), &prompts::BASH_MARKED)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::lab_config;
    use crate::error::StepFailure;
    use crate::transport::CommandOutput;
    use crate::transport::scripted::{Script, ScriptedSpawner};

    const KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQAB recovery";

    fn connect_script(command: &str, reply: &str) -> Script {
        Script::new()
            .output("Connecting...\nleaf1> ")
            .respond("debug admin", "leaf1> ")
            .respond(command, reply)
            .expect_line("exit")
            .eof()
    }

    #[tokio::test]
    async fn test_check_output() {
        let spawner = ScriptedSpawner::new();
        let sent = spawner.push_script(connect_script(
            "show version",
            "show version\nSwitch Light OS 5.1\nleaf1> ",
        ));
        let lab = Lab::new(spawner.clone(), lab_config());

        let response = SwitchConnect::new(&lab, "ctl", "leaf1")
            .check_output(["show", "version"])
            .await
            .unwrap();
        assert_eq!(response.command, "show version");
        assert_eq!(response.result, "Switch Light OS 5.1\n");
        assert_eq!(sent.lines(), ["debug admin", "show version", "exit"]);

        let spawned = spawner.spawned();
        assert_eq!(spawned[0].tier, Tier::Long);
        assert!(spawned[0].args.iter().any(|a| a.contains("connect")));
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let spawner = ScriptedSpawner::new();
        let lab = Lab::new(spawner.clone(), lab_config());
        let connect = SwitchConnect::new(&lab, "ctl", "leaf1");

        let commands = [
            CommandSpec::Interactive,
            CommandSpec::from(""),
            CommandSpec::argv::<_, String>([]),
        ];
        for command in commands {
            let err = connect.check_output(command).await.unwrap_err();
            assert!(matches!(
                err,
                crate::error::Error::Build(BuildError::MissingCommand { role: "switch connect" })
            ));
        }
        assert!(connect.call(CommandSpec::Interactive).await.is_err());
        assert!(spawner.spawned().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_reports_ordinal() {
        let spawner = ScriptedSpawner::new();
        spawner.push_script(
            Script::new()
                .output("leaf1> ")
                .respond("debug admin", "leaf1> ")
                .respond("show clock", "12:00\nleaf1> ")
                .respond("exit", "leaf1> "),
        );
        spawner.push_script(Script::new().output("leaf1> "));
        let lab = Lab::new(spawner, lab_config());
        let switch = SwitchConnect::new(&lab, "ctl", "leaf1");

        assert_eq!(switch.call("show clock").await.unwrap(), 1);
        assert_eq!(switch.call("show clock").await.unwrap(), 124);
    }

    #[tokio::test]
    async fn test_connect_spawn_failure_is_error() {
        let lab = Lab::new(ScriptedSpawner::new(), lab_config());
        let err = SwitchConnect::new(&lab, "ctl", "leaf1").call("show clock").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_enable_recovery() {
        let key = PublicKey::new(KEY).unwrap();
        let mut script = Script::new()
            .output("leaf1> ")
            .respond("debug admin", "leaf1> ")
            .respond("enable", "leaf1# ")
            .respond("debug bash", "root@leaf1:~# ")
            .respond("exec bash -e", "root@leaf1:~# ")
            .respond("PS1='BASH# '", "BASH# ")
            .respond("echo hello", "hello\nBASH# ");
        for command in recovery_setup(&RecoveryAccount::default(), &key) {
            script = script.respond(command, "BASH# ");
        }
        let spawner = ScriptedSpawner::new();
        let sent = spawner.push_script(script);
        let lab = Lab::new(spawner, lab_config());

        SwitchConnect::new(&lab, "ctl", "leaf1")
            .enable_recovery(&key)
            .await
            .unwrap();
        assert!(sent.contains("userdel --force recovery2 || :"));
        assert!(sent.contains("touch /var/run/recovery2/.ssh/authorized_keys"));
    }

    #[tokio::test]
    async fn test_enable_recovery_unmarked_shell() {
        let key = PublicKey::new(KEY).unwrap();
        let spawner = ScriptedSpawner::new();
        let sent = spawner.push_script(
            Script::new()
                .output("leaf1> ")
                .respond("debug admin", "leaf1> ")
                .respond("enable", "leaf1# ")
                .respond("debug bash", "root@leaf1:~# ")
                .respond("exec bash -e", "root@leaf1:~# ")
                .respond("PS1='BASH# '", "root@leaf1:~# "),
        );
        let lab = Lab::new(spawner, lab_config());

        let err = SwitchConnect::new(&lab, "ctl", "leaf1")
            .enable_recovery(&key)
            .await
            .unwrap_err();
        let step = err.as_step().unwrap();
        assert_eq!(step.step, "mark prompt");
        assert_eq!(step.failure, StepFailure::Unexpected { ordinal: 1 });
        assert!(!sent.contains("echo hello"));
    }

    #[tokio::test]
    async fn test_switch_enable_root_onl() {
        let key = PublicKey::new(KEY).unwrap();
        let mut script = Script::new()
            .output("root@leaf1's password: ")
            .respond("onlpw", "root@leaf1:~# ");
        for command in root_key_setup(&key) {
            script = script.respond(command, "root@leaf1:~# ");
        }
        let spawner = ScriptedSpawner::new();
        let sent = spawner.push_script(script);
        let lab = Lab::new(spawner.clone(), lab_config());

        Switch::new(&lab, "10.0.0.21")
            .enable_root(SwitchFamily::Onl, &key)
            .await
            .unwrap();
        assert!(!sent.contains("enable"));
        assert!(spawner.spawned()[0].args.contains(&"-oUser=root".to_string()));
    }

    #[tokio::test]
    async fn test_switch_enable_root_switch_light() {
        let key = PublicKey::new(KEY).unwrap();
        let mut script = Script::new()
            .output("password: ")
            .respond("slpw", "leaf1> ")
            .respond("enable", "leaf1# ")
            .respond("debug bash", "root@leaf1:~# ");
        for command in root_key_setup(&key) {
            script = script.respond(command, "root@leaf1:~# ");
        }
        let spawner = ScriptedSpawner::new();
        let sent = spawner.push_script(script);
        let lab = Lab::new(spawner, lab_config());

        Switch::new(&lab, "10.0.0.21")
            .enable_root(SwitchFamily::SwitchLight, &key)
            .await
            .unwrap();
        assert_eq!(&sent.lines()[..3], ["slpw", "enable", "debug bash"]);
    }

    #[tokio::test]
    async fn test_pcli_as_recovery() {
        let spawner = ScriptedSpawner::new();
        spawner.push_output(CommandOutput::new("leaf1\n", 0));
        let lab = Lab::new(spawner.clone(), lab_config());

        let output = Switch::new(&lab, "fe80::1%eth1")
            .pcli(None)
            .check_output("show hostname")
            .await
            .unwrap();
        assert_eq!(output, "leaf1\n");
        let spawned = spawner.spawned();
        assert!(spawned[0].args.contains(&"-oUser=recovery2".to_string()));
        assert!(spawned[0].args.contains(&"-6".to_string()));
    }
}
