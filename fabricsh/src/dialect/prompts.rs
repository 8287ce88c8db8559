//! Prompt vocabulary of each remote dialect.
//!
//! Ordinal 0 of every set is the success prompt; the rest are prompts that
//! mean the session landed somewhere else.

use std::sync::LazyLock;

use crate::channel::PromptSet;

fn set(patterns: &[&str]) -> PromptSet {
    PromptSet::new(patterns).expect("static prompt patterns compile")
}

/// `ssh` password prompt.
pub static PASSWORD: LazyLock<PromptSet> = LazyLock::new(|| set(&["(?i)password: $"]));

/// Vendor CLI in its unprivileged mode.
pub static CLI: LazyLock<PromptSet> = LazyLock::new(|| set(&["[>] $"]));

/// Controller `debug bash` shell as the admin user.
pub static USER_SHELL: LazyLock<PromptSet> = LazyLock::new(|| set(&["[$] $"]));

/// Any `#` prompt: enable mode or a root shell.
pub static ROOT: LazyLock<PromptSet> = LazyLock::new(|| set(&["[#] $"]));

/// Root shell; dropping back to the CLI is a failure.
pub static ROOT_OR_CLI: LazyLock<PromptSet> = LazyLock::new(|| set(&["[#] $", "[>] $"]));

/// Marked bash prompt set up by the recovery flow.
pub static BASH_MARKED: LazyLock<PromptSet> = LazyLock::new(|| set(&["BASH[#] $", "[#] $"]));

/// Anything a CLI or shell prints when it is ready.
pub static ANY_PROMPT: LazyLock<PromptSet> = LazyLock::new(|| set(&["[#>$] $"]));

/// Console login prompt.
pub static LOGIN: LazyLock<PromptSet> = LazyLock::new(|| set(&["login: $"]));

/// U-Boot autoboot countdown.
pub static AUTOBOOT: LazyLock<PromptSet> = LazyLock::new(|| set(&["Hit any key to stop autoboot"]));

/// U-Boot command prompt.
pub static UBOOT: LazyLock<PromptSet> = LazyLock::new(|| set(&["=> $"]));

/// Switch Light console login: CLI prompt, or back to `login:` on bad
/// credentials.
pub static SWITCH_LIGHT_LOGIN: LazyLock<PromptSet> = LazyLock::new(|| set(&["[>] $", "login: $"]));

/// ONL console login: root shell, or back to `login:`.
pub static ONL_LOGIN: LazyLock<PromptSet> = LazyLock::new(|| set(&["[#] $", "login: $"]));

/// CLI after an `ssh` password; asked again means it was wrong.
pub static CLI_OR_PASSWORD: LazyLock<PromptSet> =
    LazyLock::new(|| set(&["[>] $", "(?i)password: $"]));

/// Root shell after an `ssh` password.
pub static ROOT_OR_PASSWORD: LazyLock<PromptSet> =
    LazyLock::new(|| set(&["[#] $", "(?i)password: $"]));
