//! ONIE install from the U-Boot console.

use log::info;

use super::prompts;
use crate::config::Tier;
use crate::driver::Dialog;
use crate::error::Result;
use crate::transport::Transport;

/// Parameters for an ONIE install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnieInstall {
    /// Installer image URL. Without one ONIE runs its own discovery.
    pub install_url: Option<String>,
}

impl OnieInstall {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            install_url: Some(url.into()),
        }
    }
}

/// Interrupt autoboot, start ONIE in install mode and wait for the
/// installed system's login prompt.
///
/// The device must be about to boot (freshly power-cycled); the first step
/// waits on the boot tier for the autoboot countdown.
pub async fn onie_install<T: Transport>(dialog: &mut Dialog<'_, T>, install: &OnieInstall) -> Result<()> {
    dialog.expect("autoboot", &prompts::AUTOBOOT, Tier::Boot).await?;
    dialog.exchange("interrupt", "", &prompts::UBOOT, Tier::Short).await?;
    dialog
        .exchange("boot reason", "setenv onie_boot_reason install", &prompts::UBOOT, Tier::Short)
        .await?;
    if let Some(url) = &install.install_url {
        let line = format!("setenv onie_debugargs install_url={url}");
        dialog.exchange("install url", &line, &prompts::UBOOT, Tier::Short).await?;
    }

    info!("{}: starting ONIE install", dialog.session().name());
    dialog.exchange("install", "run onie_bootcmd", &prompts::LOGIN, Tier::Boot).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Session;
    use crate::config::Timeouts;
    use crate::error::StepFailure;
    use crate::transport::scripted::Script;

    #[tokio::test]
    async fn test_onie_install_with_url() {
        let script = Script::new()
            .output("U-Boot 2013.01\nHit any key to stop autoboot:  3 ")
            .respond("", "\n=> ")
            .respond("setenv onie_boot_reason install", "=> ")
            .respond("setenv onie_debugargs install_url=http://10.0.0.1/onl.bin", "=> ")
            .respond("run onie_bootcmd", "ONIE: Starting install\n...\nleaf1 login: ");
        let sent = script.sent();
        let mut session = Session::new(script.into_transport(), "leaf1");
        let mut dialog = Dialog::new(&mut session, Timeouts::default());

        onie_install(&mut dialog, &OnieInstall::with_url("http://10.0.0.1/onl.bin"))
            .await
            .unwrap();
        assert_eq!(sent.lines().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_onie_install_no_autoboot() {
        let script = Script::new().output("leaf1 login: ");
        let sent = script.sent();
        let mut session = Session::new(script.into_transport(), "leaf1");
        let mut dialog = Dialog::new(&mut session, Timeouts::default());

        let err = onie_install(&mut dialog, &OnieInstall::default()).await.unwrap_err();
        let step = err.as_step().unwrap();
        assert_eq!(step.step, "autoboot");
        assert_eq!(step.failure, StepFailure::TimedOut(Timeouts::default().boot));
        assert!(sent.lines().is_empty());
    }
}
