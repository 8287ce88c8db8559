//! Vendor CLI invocations layered over `ssh`.

use secrecy::ExposeSecret;

use super::ssh::{SshOptions, ssh};
use super::{CommandSpec, Role, Target, validate_mode};
use crate::config::{LabConfig, Tier};
use crate::error::BuildError;
use crate::quote::shell_quote;
use crate::transport::SpawnConfig;

/// Append `-c <command>` for a CLI run through the remote shell.
///
/// The remote `sshd` hands the joined argument vector to a shell, so the
/// command must arrive there as a single word. Tokens are shell-quoted and
/// glued with a quoted space, which the shell collapses into one argument
/// the CLI tokenizes again.
fn push_remote_command(args: &mut Vec<String>, command: &CommandSpec) {
    match command {
        CommandSpec::Line(line) if !line.is_empty() => {
            args.push("-c".to_string());
            args.push(shell_quote(line));
        }
        CommandSpec::Argv(argv) if !argv.is_empty() => {
            let quoted: Vec<String> = argv.iter().map(|w| shell_quote(w)).collect();
            args.push("-c".to_string());
            args.push(quoted.join(r#"" ""#));
        }
        _ => {}
    }
}

/// Wrap a remote CLI argument vector in a batch-mode `ssh` with a TTY.
///
/// `secret` is an index into `cli_args` to mask in logs.
fn over_ssh(target: &Target, cli_args: Vec<String>, secret: Option<usize>) -> SpawnConfig {
    let mut spawn = ssh(
        target,
        &CommandSpec::Argv(cli_args.clone()),
        &SshOptions::batch().with_tty(true),
    );
    if let Some(index) = secret {
        let offset = spawn.args.len() - cli_args.len();
        spawn = spawn.with_masked(offset + index);
    }
    spawn
}

/// Interactive admin shell with password authentication.
pub(super) fn admin_shell(
    config: &LabConfig,
    target: &Target,
    command: &CommandSpec,
    disable_pubkey: bool,
) -> Result<SpawnConfig, BuildError> {
    if !command.is_empty() {
        return Err(BuildError::BatchCommandRejected {
            role: Role::AdminShell { disable_pubkey }.name(),
        });
    }
    let options = SshOptions::password(!disable_pubkey).with_connect_timeout(config.timeouts.login);
    Ok(ssh(target, &CommandSpec::Interactive, &options))
}

/// Controller CLI run as the admin user via `sudo`.
///
/// ```text
/// sudo -u admin -- floodlight-cli -I -X [-m MODE] -u admin -p PASS [-c CMD]
/// ```
pub(super) fn controller_cli(
    config: &LabConfig,
    target: &Target,
    command: &CommandSpec,
) -> Result<SpawnConfig, BuildError> {
    let admin = &config.admin;
    let mut args = vec![
        "sudo".to_string(),
        "-u".to_string(),
        admin.user.clone(),
        "--".to_string(),
        config.cli.controller.clone(),
        "-I".to_string(),
        "-X".to_string(),
    ];

    if let Some(mode) = &target.mode {
        validate_mode(mode)?;
        args.push("-m".to_string());
        args.push(mode.clone());
    }

    args.push("-u".to_string());
    args.push(admin.user.clone());
    args.push("-p".to_string());
    let secret = args.len();
    args.push(shell_quote(admin.password.expose_secret()));

    push_remote_command(&mut args, command);

    Ok(over_ssh(target, args, Some(secret)))
}

/// Switch CLI with forced admin privileges.
///
/// ```text
/// pcli [-m MODE] --force-admin [-c CMD]
/// ```
pub(super) fn switch_cli(
    config: &LabConfig,
    target: &Target,
    command: &CommandSpec,
) -> Result<SpawnConfig, BuildError> {
    let mut args = vec![config.cli.switch.clone()];

    if let Some(mode) = &target.mode {
        validate_mode(mode)?;
        args.push("-m".to_string());
        args.push(mode.clone());
    }
    args.push("--force-admin".to_string());

    push_remote_command(&mut args, command);

    Ok(over_ssh(target, args, None))
}

/// Controller CLI in `enable` mode running `connect switch <name>`.
///
/// Only the outer invocation is built here; the switch login that follows
/// is driven on the same session by the caller.
pub(super) fn switch_connect(
    config: &LabConfig,
    target: &Target,
    switch: &str,
) -> Result<SpawnConfig, BuildError> {
    let controller = target.clone().with_mode("enable");
    let command = CommandSpec::argv(["connect", "switch", switch]);
    Ok(controller_cli(config, &controller, &command)?.with_tier(Tier::Long))
}

/// Controller CLI from a local workspace; no SSH involved.
pub(super) fn local_cli(
    config: &LabConfig,
    mode: Option<&str>,
    command: &CommandSpec,
) -> Result<SpawnConfig, BuildError> {
    let local = config
        .local_cli
        .as_ref()
        .ok_or(BuildError::NotConfigured { what: "local CLI" })?;

    let mut args = vec!["-I".to_string(), "-X".to_string()];
    if let Some(mode) = mode {
        validate_mode(mode)?;
        args.push("-m".to_string());
        args.push(mode.to_string());
    }
    args.push("-u".to_string());
    args.push(config.admin.user.clone());
    args.push("-p".to_string());
    let secret = args.len();
    args.push(config.admin.password.expose_secret().to_string());

    if !command.is_empty() {
        args.push("-c".to_string());
        args.push(command.joined());
    }

    let mut spawn = SpawnConfig::new(local.program.to_string_lossy(), args)
        .with_pty(true)
        .with_tier(Tier::Short)
        .with_working_dir(&local.workspace)
        .with_masked(secret);
    for (key, value) in &local.env {
        spawn = spawn.with_env(key, value);
    }
    Ok(spawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::lab_config;
    use crate::config::LocalCli;
    use crate::quote::tests::shell_unquote;

    fn remote_tail(spawn: &SpawnConfig) -> &[String] {
        let dashes = spawn.args.iter().position(|a| a == "--").unwrap();
        &spawn.args[dashes + 1..]
    }

    #[test]
    fn test_controller_cli_interactive() {
        let config = lab_config();
        let spawn = controller_cli(&config, &Target::new("ctl", "root"), &CommandSpec::Interactive)
            .unwrap();

        assert!(spawn.pty);
        assert!(spawn.args.contains(&"-oRequestTTY=force".to_string()));
        assert!(spawn.args.contains(&"-oBatchMode=yes".to_string()));
        assert_eq!(
            remote_tail(&spawn),
            [
                "sudo",
                "-u",
                "admin",
                "--",
                "floodlight-cli",
                "-I",
                "-X",
                "-u",
                "admin",
                "-p",
                "adminpw"
            ]
        );
    }

    #[test]
    fn test_controller_cli_masks_password() {
        let config = lab_config();
        let spawn = controller_cli(&config, &Target::new("ctl", "root"), &CommandSpec::Interactive)
            .unwrap();
        assert!(!spawn.to_string().contains("adminpw"));
        assert!(spawn.to_string().contains("-p ********"));
    }

    #[test]
    fn test_controller_cli_mode_and_tokens() {
        let config = lab_config();
        let target = Target::new("ctl", "root").with_mode("config");
        let spawn = controller_cli(
            &config,
            &target,
            &CommandSpec::argv(["show", "switch", "leaf 1", "running-config"]),
        )
        .unwrap();

        let tail = remote_tail(&spawn);
        assert_eq!(&tail[4..8], ["floodlight-cli", "-I", "-X", "-m"]);
        assert_eq!(tail[8], "config");

        let n = tail.len();
        assert_eq!(tail[n - 2], "-c");
        assert_eq!(tail[n - 1], r#"show" "switch" "leaf" "1" "running-config"#);
        assert_eq!(shell_unquote(&tail[n - 1]), "show switch leaf 1 running-config");
    }

    #[test]
    fn test_controller_cli_rejects_bad_mode() {
        let config = lab_config();
        let target = Target::new("ctl", "root").with_mode("en;able");
        assert!(matches!(
            controller_cli(&config, &target, &CommandSpec::Interactive),
            Err(BuildError::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_switch_cli() {
        let config = lab_config();
        let target = Target::new("fe80::5%eth0", "recovery2").with_mode("enable");
        let spawn = switch_cli(&config, &target, &CommandSpec::from("show version")).unwrap();

        assert_eq!(spawn.args[1], "-6");
        assert_eq!(
            remote_tail(&spawn),
            ["pcli", "-m", "enable", "--force-admin", "-c", r#"show" "version"#]
        );
    }

    #[test]
    fn test_switch_connect() {
        let config = lab_config();
        let spawn = switch_connect(&config, &Target::new("ctl", "root"), "leaf1").unwrap();

        let tail = remote_tail(&spawn);
        assert!(tail.windows(2).any(|w| w == ["-m", "enable"]));
        assert_eq!(tail.last().unwrap(), r#"connect" "switch" "leaf1"#);
        assert_eq!(spawn.tier, Tier::Long);
    }

    #[test]
    fn test_admin_shell() {
        let config = lab_config();
        let spawn = admin_shell(&config, &Target::new("ctl", "admin"), &CommandSpec::Interactive, true)
            .unwrap();
        assert!(spawn.pty);
        assert!(spawn.args.contains(&"-oPubkeyAuthentication=no".to_string()));
        assert!(spawn.args.contains(&"-oConnectTimeout=10".to_string()));
        assert!(!spawn.args.contains(&"--".to_string()));
    }

    #[test]
    fn test_local_cli_requires_config() {
        let config = lab_config();
        assert_eq!(
            local_cli(&config, None, &CommandSpec::Interactive).unwrap_err(),
            BuildError::NotConfigured { what: "local CLI" }
        );
    }

    #[test]
    fn test_local_cli() {
        let mut local = LocalCli {
            program: "/ws/bin/cli".into(),
            workspace: "/ws".into(),
            env: Default::default(),
        };
        local.env.insert("PYTHONPATH".into(), "/ws/lib".into());
        let config = lab_config().with_local_cli(local);

        let spawn = local_cli(&config, Some("enable"), &CommandSpec::argv(["show", "version"]))
            .unwrap();
        assert_eq!(spawn.program, "/ws/bin/cli");
        assert_eq!(
            spawn.args,
            ["-I", "-X", "-m", "enable", "-u", "admin", "-p", "adminpw", "-c", "show version"]
        );
        assert_eq!(spawn.working_dir.as_deref(), Some(std::path::Path::new("/ws")));
        assert_eq!(spawn.env.get("PYTHONPATH").map(String::as_str), Some("/ws/lib"));
        assert!(spawn.pty);
        assert!(!spawn.to_string().contains("adminpw"));
    }
}
