//! Dialect flows.
//!
//! Each flow is a fixed path through states named by the prompt they
//! expect. Flows open their own session, drive it through a [`Dialog`]
//! and close it on every exit path.
//!
//! | Flow                                   | Entry point                        |
//! |----------------------------------------|------------------------------------|
//! | Controller root enablement             | [`Controller::enable_root`]        |
//! | Switch root enablement                 | [`Switch::enable_root`]            |
//! | Switch CLI command via the controller  | [`SwitchConnect::check_output`]    |
//! | Switch recovery-account provisioning   | [`SwitchConnect::enable_recovery`] |
//! | Console login recovery                 | [`Console::recover`]               |
//! | Bootloader install                     | [`Console::onie_install`]          |
//!
//! [`Dialog`]: crate::driver::Dialog

mod bootloader;
mod console;
mod controller;
pub mod prompts;
pub mod provision;
mod switch;

pub use bootloader::{OnieInstall, onie_install};
pub use console::{Console, ConsoleOptions, ConsoleReport, find_login, recover};
pub use controller::{Controller, ControllerCli};
pub use provision::PublicKey;
pub use switch::{Switch, SwitchCli, SwitchConnect};

use crate::channel::PromptSet;
use crate::config::{Credentials, LabConfig, Tier};
use crate::driver::Dialog;
use crate::error::Result;
use crate::transport::Transport;

/// Banner that identifies an Open Network Linux console.
const ONL_BANNER: &str = "Open Network Linux";

/// Switch operating system family. Each has its own login and escalation
/// sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchFamily {
    /// Logs in to the vendor CLI; `enable` then `debug bash` for root.
    SwitchLight,
    /// Logs in straight to a root shell.
    Onl,
}

impl SwitchFamily {
    /// Pick the family from text printed before the login prompt.
    pub fn detect(banner: &str) -> Self {
        if banner.contains(ONL_BANNER) {
            SwitchFamily::Onl
        } else {
            SwitchFamily::SwitchLight
        }
    }

    /// Login credentials for this family.
    pub fn credentials<'c>(&self, config: &'c LabConfig) -> &'c Credentials {
        match self {
            SwitchFamily::SwitchLight => &config.switch_light,
            SwitchFamily::Onl => &config.onl,
        }
    }

    /// Prompts after a console password: success, or back at `login:`.
    fn console_login(&self) -> &'static PromptSet {
        match self {
            SwitchFamily::SwitchLight => &prompts::SWITCH_LIGHT_LOGIN,
            SwitchFamily::Onl => &prompts::ONL_LOGIN,
        }
    }

    /// Prompts after an `ssh` password: success, or asked again.
    fn ssh_login(&self) -> &'static PromptSet {
        match self {
            SwitchFamily::SwitchLight => &prompts::CLI_OR_PASSWORD,
            SwitchFamily::Onl => &prompts::ROOT_OR_PASSWORD,
        }
    }

    /// Shell levels between the root shell and a logged-out console.
    fn logout_depth(&self) -> usize {
        match self {
            SwitchFamily::SwitchLight => 3,
            SwitchFamily::Onl => 1,
        }
    }

    /// From the post-login prompt to a root shell.
    async fn escalate<T: Transport>(&self, dialog: &mut Dialog<'_, T>) -> Result<()> {
        if *self == SwitchFamily::SwitchLight {
            dialog.exchange("enable", "enable", &prompts::ROOT, Tier::Long).await?;
            dialog.exchange("debug bash", "debug bash", &prompts::ROOT, Tier::Long).await?;
        }
        Ok(())
    }
}
