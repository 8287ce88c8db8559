//! # fabricsh
//!
//! Expect-style session automation for an SDN controller and the switches
//! it manages.
//!
//! fabricsh spawns `ssh` (or any console command) on a pseudo-terminal and
//! walks the session through login, privilege escalation and command
//! execution by sending lines and waiting for prompts, the way a lab
//! engineer would at a terminal.
//!
//! ## Layers
//!
//! - [`quote`]: quoting for the remote shell and the vendor CLI lexer
//! - [`command`]: pure builders from target and role to a [`SpawnConfig`]
//! - [`transport`]: process spawning on a PTY, plus a scripted stand-in
//! - [`channel`]: the [`Session`] with its single expect primitive
//! - [`driver`]: [`Lab`], named [`Dialog`] steps and batch wrappers
//! - [`dialect`]: controller, switch, console and bootloader flows
//! - [`decode`]: tables and detail blocks from CLI output
//! - [`address`]: switch address resolution
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fabricsh::dialect::{Controller, PublicKey};
//! use fabricsh::{Credentials, Lab, LabConfig, LocalSpawner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fabricsh::Error> {
//!     let config = LabConfig::new(
//!         Credentials::new("admin", "adminpw"),
//!         Credentials::new("admin", "switchpw"),
//!         Credentials::new("root", "onlpw"),
//!     );
//!     let lab = Lab::new(LocalSpawner, config);
//!     let controller = Controller::new(&lab, "10.0.0.10");
//!
//!     if !controller.test_batch_ssh().await? {
//!         let key: PublicKey = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 lab".parse()?;
//!         controller.enable_root(&key).await?;
//!     }
//!
//!     let switches = controller.cli(None).check_output(["show", "switch"]).await?;
//!     for record in fabricsh::decode::decode_table(&switches)? {
//!         println!("{record:?}");
//!     }
//!
//!     let version = controller.switch("leaf1").check_output("show version").await?;
//!     println!("{version}");
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod channel;
pub mod command;
pub mod config;
pub mod decode;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod quote;
pub mod transport;

pub use channel::{Outcome, PromptSet, Session};
pub use command::{CommandBuilder, CommandSpec, Role, Target};
pub use config::{Credentials, LabConfig, Tier, Timeouts};
pub use driver::{Dialog, Lab, Response};
pub use error::{Error, Result};
pub use transport::{LocalSpawner, SpawnConfig, Spawner, Transport};
