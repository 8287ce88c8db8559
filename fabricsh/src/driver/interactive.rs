//! Fixed send/expect sequences.
//!
//! Provisioning batches are long runs of commands that all wait for the
//! same prompt. They are written as a list of events and handed to
//! [`Dialog::run`](super::Dialog::run), which stops at the first event that
//! does not reach its prompt.

use std::time::Duration;

use super::step::MASK;
use crate::channel::PromptSet;
use crate::config::Tier;

/// One line to send and the prompt set that must answer it.
///
/// # Example
///
/// ```rust
/// use fabricsh::channel::PromptSet;
/// use fabricsh::driver::InteractiveEvent;
///
/// let root = PromptSet::new(&["[#] $", "[>] $"]).unwrap();
/// let events = vec![
///     InteractiveEvent::new("mkdir -p /root/.ssh", &root),
///     InteractiveEvent::new("chmod 0700 /root/.ssh", &root),
/// ];
/// ```
#[derive(Debug, Clone)]
pub struct InteractiveEvent {
    /// The line to send.
    pub input: String,

    /// Prompts to wait for; ordinal 0 is success.
    pub prompts: PromptSet,

    /// Whether the input should be hidden in logs and errors.
    pub hidden: bool,

    /// Step name for errors. Defaults to the input.
    pub step: Option<String>,

    /// Timeout tier; [`Tier::Short`] if unset.
    pub tier: Option<Tier>,
}

impl InteractiveEvent {
    pub fn new(input: impl Into<String>, prompts: &PromptSet) -> Self {
        Self {
            input: input.into(),
            prompts: prompts.clone(),
            hidden: false,
            step: None,
            tier: None,
        }
    }

    /// An event whose input is a secret.
    pub fn hidden(input: impl Into<String>, prompts: &PromptSet) -> Self {
        Self {
            hidden: true,
            ..Self::new(input, prompts)
        }
    }

    /// Name the step.
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Set the timeout tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Name used in errors.
    pub fn name(&self) -> &str {
        match &self.step {
            Some(step) => step,
            None if self.hidden => "hidden input",
            None => &self.input,
        }
    }

    /// Input as it may be shown.
    pub fn display_input(&self) -> &str {
        if self.hidden { MASK } else { &self.input }
    }
}

/// Result of a completed sequence.
#[derive(Debug, Clone)]
pub struct InteractiveResult {
    /// One entry per event, in order.
    pub steps: Vec<InteractiveStep>,

    /// Total time for the sequence.
    pub elapsed: Duration,
}

impl InteractiveResult {
    pub fn new(steps: Vec<InteractiveStep>, elapsed: Duration) -> Self {
        Self { steps, elapsed }
    }

    /// Output of the last step.
    pub fn final_output(&self) -> Option<&str> {
        self.steps.last().map(|s| s.output.as_str())
    }

    /// All outputs concatenated.
    pub fn full_output(&self) -> String {
        self.steps.iter().map(|s| s.output.as_str()).collect()
    }
}

/// One completed event.
#[derive(Debug, Clone)]
pub struct InteractiveStep {
    /// The input that was sent (masked if hidden).
    pub input: String,

    /// Output before the matched prompt.
    pub output: String,

    pub elapsed: Duration,
}

impl InteractiveStep {
    pub fn new(input: impl Into<String>, output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            elapsed,
        }
    }
}

/// Builder for event sequences.
///
/// ```rust
/// use fabricsh::channel::PromptSet;
/// use fabricsh::config::Tier;
/// use fabricsh::driver::InteractiveBuilder;
///
/// let cli = PromptSet::new(&["[>] $"]).unwrap();
/// let events = InteractiveBuilder::new()
///     .send("debug admin")
///     .expect(&cli)
///     .send("show version")
///     .named("command")
///     .expect(&cli)
///     .with_tier(Tier::Long)
///     .build();
/// assert_eq!(events[1].name(), "command");
/// ```
#[derive(Debug, Default)]
pub struct InteractiveBuilder {
    events: Vec<InteractiveEvent>,
    default_tier: Option<Tier>,
}

impl InteractiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input to send. Must be followed by `expect()`.
    pub fn send(self, input: impl Into<String>) -> InteractiveBuilderWithInput {
        InteractiveBuilderWithInput {
            builder: self,
            input: input.into(),
            hidden: false,
            step: None,
            tier: None,
        }
    }

    /// Add a hidden input (like a password).
    pub fn send_hidden(self, input: impl Into<String>) -> InteractiveBuilderWithInput {
        InteractiveBuilderWithInput {
            hidden: true,
            ..self.send(input)
        }
    }

    /// Tier for every event that does not set its own, including those
    /// already added.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.default_tier = Some(tier);
        self
    }

    pub fn build(self) -> Vec<InteractiveEvent> {
        let tier = self.default_tier;
        self.events
            .into_iter()
            .map(|mut event| {
                event.tier = event.tier.or(tier);
                event
            })
            .collect()
    }
}

/// Builder state after `send()`.
#[derive(Debug)]
pub struct InteractiveBuilderWithInput {
    builder: InteractiveBuilder,
    input: String,
    hidden: bool,
    step: Option<String>,
    tier: Option<Tier>,
}

impl InteractiveBuilderWithInput {
    /// Prompts to wait for after sending the input.
    pub fn expect(mut self, prompts: &PromptSet) -> InteractiveBuilder {
        self.builder.events.push(InteractiveEvent {
            input: self.input,
            prompts: prompts.clone(),
            hidden: self.hidden,
            step: self.step,
            tier: self.tier,
        });
        self.builder
    }

    /// Name this step.
    pub fn named(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Tier for this step only.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }
}
