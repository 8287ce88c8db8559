//! Serial console recovery.
//!
//! A console may be sitting anywhere: a half-typed CLI line, a pager, a
//! logged-in shell, a login prompt. [`recover`] backs out to `login:`, logs
//! in with the credentials of whichever switch family the banner names,
//! escalates to root, optionally brings up the management interface and
//! authorizes a key, then logs out again.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;
use secrecy::ExposeSecret;

use super::bootloader::{OnieInstall, onie_install};
use super::provision::{PublicKey, authorize_key, batch};
use super::{SwitchFamily, prompts};
use crate::config::{ConsoleRetry, LabConfig, Tier};
use crate::driver::{Dialog, Lab, finish};
use crate::error::{ConsoleError, Result};
use crate::quote::shell_quote;
use crate::transport::{SpawnConfig, Spawner, Transport};

static INET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"inet (\d+\.\d+\.\d+\.\d+)/").expect("static inet pattern compiles")
});

/// What to do once logged in on the console.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOptions {
    /// Run DHCP on the management interface if it has no IPv4 address.
    pub dhcp: bool,

    /// Authorize this key for root.
    pub key: Option<PublicKey>,
}

/// Result of a console recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleReport {
    /// Family detected from the login banner.
    pub family: SwitchFamily,

    /// Management address, when DHCP was requested and one is bound.
    pub address: Option<Ipv4Addr>,
}

/// A switch console reached through a console server command.
pub struct Console<'l, S: Spawner> {
    lab: &'l Lab<S>,
    spawn: SpawnConfig,
    name: String,
}

impl<'l, S: Spawner> Console<'l, S> {
    /// `spawn` attaches to the console, e.g. a `telnet` to the console
    /// server port.
    pub fn new(lab: &'l Lab<S>, spawn: SpawnConfig, name: impl Into<String>) -> Self {
        Self {
            lab,
            spawn,
            name: name.into(),
        }
    }

    /// Log in, apply `options` and log back out.
    pub async fn recover(&self, options: &ConsoleOptions) -> Result<ConsoleReport> {
        let mut session = self.lab.open_config(&self.spawn, &self.name).await?;
        let result = recover(&mut self.lab.dialog(&mut session), self.lab.config(), options).await;
        finish(&mut session, result).await
    }

    /// Run an ONIE install. The switch must be power-cycled right after
    /// this is called.
    pub async fn onie_install(&self, install: &OnieInstall) -> Result<()> {
        let mut session = self.lab.open_config(&self.spawn, &self.name).await?;
        let result = onie_install(&mut self.lab.dialog(&mut session), install).await;
        finish(&mut session, result).await
    }
}

/// Back out of whatever the console is doing until a login prompt shows.
///
/// Each attempt sends Ctrl-C and a blank line and waits one short tier;
/// between attempts the pause doubles, starting at `retry.backoff`. The
/// family is picked from everything printed up to the prompt.
pub async fn find_login<T: Transport>(
    dialog: &mut Dialog<'_, T>,
    retry: &ConsoleRetry,
) -> Result<SwitchFamily> {
    let mut backoff = retry.backoff;

    for attempt in 1..=retry.attempts {
        dialog.session().send_control('c').await?;
        dialog.session().send_line("").await?;

        if dialog.poll("login", &prompts::LOGIN, Tier::Short).await?.is_some() {
            let family = SwitchFamily::detect(dialog.session().before());
            debug!("{}: login prompt on attempt {attempt}, {family:?}", dialog.session().name());
            return Ok(family);
        }

        if attempt < retry.attempts {
            warn!(
                "{}: no login prompt (attempt {attempt}/{}), retrying in {backoff:?}",
                dialog.session().name(),
                retry.attempts
            );
            tokio::time::sleep(backoff).await;
            backoff = backoff.saturating_mul(2);
        }
    }

    Err(ConsoleError::LoginPromptNotFound {
        attempts: retry.attempts,
    }
    .into())
}

/// Full console recovery on an already attached session.
pub async fn recover<T: Transport>(
    dialog: &mut Dialog<'_, T>,
    config: &LabConfig,
    options: &ConsoleOptions,
) -> Result<ConsoleReport> {
    let family = find_login(dialog, &config.console).await?;
    let credentials = family.credentials(config);

    dialog
        .exchange("username", &credentials.user, &prompts::PASSWORD, Tier::Login)
        .await?;
    dialog
        .exchange_hidden(
            "password",
            credentials.password.expose_secret(),
            family.console_login(),
            Tier::Login,
        )
        .await?;
    family.escalate(dialog).await?;

    let address = if options.dhcp {
        configure_dhcp(dialog, &config.mgmt_interface).await?
    } else {
        None
    };

    if let Some(key) = &options.key {
        dialog.run(&batch(authorize_key("/root", key), &prompts::ROOT)).await?;
    }

    logout(dialog, family).await?;
    info!("{}: console recovered ({family:?})", dialog.session().name());
    Ok(ConsoleReport { family, address })
}

fn scan_inet(text: &str) -> Option<Ipv4Addr> {
    INET.captures(text)?.get(1)?.as_str().parse().ok()
}

/// IPv4 address of `interface`, running DHCP once if there is none.
async fn configure_dhcp<T: Transport>(
    dialog: &mut Dialog<'_, T>,
    interface: &str,
) -> Result<Option<Ipv4Addr>> {
    let show = format!("ip -4 addr show dev {}", shell_quote(interface));

    let status = dialog.exchange("address check", &show, &prompts::ROOT, Tier::Short).await?;
    if let Some(addr) = scan_inet(&status) {
        debug!("{interface}: already bound to {addr}");
        return Ok(Some(addr));
    }

    let dhcp = format!("dhclient -1 {}", shell_quote(interface));
    dialog.exchange("dhcp", &dhcp, &prompts::ROOT, Tier::Long).await?;

    let status = dialog.exchange("address recheck", &show, &prompts::ROOT, Tier::Short).await?;
    let addr = scan_inet(&status);
    if addr.is_none() {
        warn!("{interface}: no address after DHCP");
    }
    Ok(addr)
}

/// Exit back to `login:` from the root shell.
async fn logout<T: Transport>(dialog: &mut Dialog<'_, T>, family: SwitchFamily) -> Result<()> {
    for _ in 1..family.logout_depth() {
        dialog.exchange("exit", "exit", &prompts::ANY_PROMPT, Tier::Long).await?;
    }
    dialog.exchange("logout", "exit", &prompts::LOGIN, Tier::Long).await?;
    Ok(())
}
