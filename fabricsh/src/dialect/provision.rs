//! Idempotent account and key provisioning batches.
//!
//! Every batch runs in a root shell with `-e` semantics, one command per
//! line, each gated by a prompt re-match.

use std::fmt;
use std::str::FromStr;

use crate::channel::PromptSet;
use crate::config::RecoveryAccount;
use crate::driver::InteractiveEvent;
use crate::error::BuildError;
use crate::quote::shell_quote;

/// An OpenSSH public key line: `<algorithm> <base64> [comment]`.
///
/// The key is appended verbatim; only characters that would break the
/// remote command line are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(key: impl AsRef<str>) -> Result<Self, BuildError> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(BuildError::InvalidKey { reason: "empty" });
        }
        if key.chars().any(char::is_control) {
            return Err(BuildError::InvalidKey {
                reason: "contains control characters",
            });
        }
        if key.split_whitespace().count() < 2 {
            return Err(BuildError::InvalidKey {
                reason: "expected '<algorithm> <base64> [comment]'",
            });
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PublicKey {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turn off echo and widen the terminal so long lines are not wrapped.
pub const TERMINAL_SETUP: &str = "stty -echo rows 10000 cols 999";

/// Commands that make sure `<home>/.ssh/authorized_keys` exists with the
/// right modes and append `key` to it.
///
/// The key travels as one shell-quoted word through `set`, so its spaces
/// and `+`/`/`/`=` characters reach the file untouched.
pub fn authorize_key(home: &str, key: &PublicKey) -> Vec<String> {
    let ssh_dir = shell_quote(&format!("{home}/.ssh"));
    let keys = shell_quote(&format!("{home}/.ssh/authorized_keys"));
    vec![
        format!("mkdir -p {ssh_dir}"),
        format!("chmod 0700 {ssh_dir}"),
        format!("touch {keys}"),
        format!("chmod 0600 {keys}"),
        format!("set dummy {}", shell_quote(key.as_str())),
        "shift".to_string(),
        format!("echo \"$*\" >>{keys}"),
    ]
}

/// Terminal setup followed by [`authorize_key`] for root.
pub fn root_key_setup(key: &PublicKey) -> Vec<String> {
    let mut commands = vec![TERMINAL_SETUP.to_string()];
    commands.extend(authorize_key("/root", key));
    commands
}

/// Terminal setup, a fresh recovery account, and `key` authorized for it.
pub fn recovery_setup(account: &RecoveryAccount, key: &PublicKey) -> Vec<String> {
    let mut commands = vec![TERMINAL_SETUP.to_string()];
    commands.extend(recreate_account(account));
    commands.extend(authorize_key(&account.home, key));
    commands
}

/// Commands that recreate the uid-0 recovery account with its own home.
pub fn recreate_account(account: &RecoveryAccount) -> Vec<String> {
    let user = shell_quote(&account.user);
    let home = shell_quote(&account.home);
    vec![
        format!("userdel --force {user} || :"),
        format!(
            "useradd --create-home --home-dir {home} --non-unique --no-user-group --uid 0 --gid 0 {user}"
        ),
    ]
}

/// One event per command, each waiting for `prompts[0]`.
pub fn batch<I>(commands: I, prompts: &PromptSet) -> Vec<InteractiveEvent>
where
    I: IntoIterator<Item = String>,
{
    commands
        .into_iter()
        .map(|command| InteractiveEvent::new(command, prompts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::tests::shell_unquote;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIH+x/y= lab key";

    #[test]
    fn test_public_key_validation() {
        assert!(PublicKey::new(KEY).is_ok());
        assert_eq!(PublicKey::new(format!("  {KEY}\n")).unwrap().as_str(), KEY);
        assert_eq!(
            PublicKey::new("").unwrap_err(),
            BuildError::InvalidKey { reason: "empty" }
        );
        assert!(PublicKey::new("ssh-rsa AAAA\nrm -rf /").is_err());
        assert!(PublicKey::new("justonetoken").is_err());
        assert!("ssh-rsa AAAA".parse::<PublicKey>().is_ok());
    }

    #[test]
    fn test_authorize_key_commands() {
        let key = PublicKey::new(KEY).unwrap();
        let commands = authorize_key("/root", &key);
        assert_eq!(
            commands,
            [
                "mkdir -p /root/.ssh",
                "chmod 0700 /root/.ssh",
                "touch /root/.ssh/authorized_keys",
                "chmod 0600 /root/.ssh/authorized_keys",
                r#"set dummy ssh-ed25519" "AAAAC3NzaC1lZDI1NTE5AAAAIH+x/y=" "lab" "key"#,
                "shift",
                r#"echo "$*" >>/root/.ssh/authorized_keys"#,
            ]
        );

        let word = commands[4].strip_prefix("set dummy ").unwrap();
        assert_eq!(shell_unquote(word), KEY);
    }

    #[test]
    fn test_recreate_account() {
        let commands = recreate_account(&RecoveryAccount::default());
        assert_eq!(commands[0], "userdel --force recovery2 || :");
        assert!(commands[1].contains("--home-dir /var/run/recovery2"));
        assert!(commands[1].ends_with("--uid 0 --gid 0 recovery2"));
    }

    #[test]
    fn test_setup_batches() {
        let key = PublicKey::new(KEY).unwrap();
        let root = root_key_setup(&key);
        assert_eq!(root[0], TERMINAL_SETUP);
        assert_eq!(root.len(), 8);

        let recovery = recovery_setup(&RecoveryAccount::default(), &key);
        assert_eq!(recovery.len(), 10);
        assert!(recovery[1].starts_with("userdel"));
        assert_eq!(recovery[3], "mkdir -p /var/run/recovery2/.ssh");
    }

    #[test]
    fn test_batch_events() {
        let prompts = PromptSet::new(&["[#] $"]).unwrap();
        let events = batch(vec!["a".to_string(), "b".to_string()], &prompts);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].input, "b");
    }
}
