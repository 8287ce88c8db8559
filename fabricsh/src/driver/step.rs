//! Named send/expect steps with typed failures.

use std::time::{Duration, Instant};

use log::{debug, warn};

use super::interactive::{InteractiveEvent, InteractiveResult, InteractiveStep};
use crate::channel::{Outcome, PromptSet, Session};
use crate::config::{Tier, Timeouts};
use crate::error::{Error, Result, StepError, StepFailure};
use crate::transport::Transport;

/// Placeholder recorded instead of a hidden input.
pub(crate) const MASK: &str = "********";

/// Drives a [`Session`] one step at a time.
///
/// Each step sends at most one line and then resolves exactly one expect.
/// Ordinal 0 of the prompt set is the only outcome that lets the flow
/// continue; anything else becomes a [`StepError`] naming the step.
pub struct Dialog<'s, T: Transport> {
    session: &'s mut Session<T>,
    timeouts: Timeouts,
}

impl<'s, T: Transport> Dialog<'s, T> {
    pub fn new(session: &'s mut Session<T>, timeouts: Timeouts) -> Self {
        Self { session, timeouts }
    }

    /// The underlying session.
    pub fn session(&mut self) -> &mut Session<T> {
        &mut *self.session
    }

    /// Duration of a timeout tier.
    pub fn timeout(&self, tier: Tier) -> Duration {
        self.timeouts.get(tier)
    }

    /// Wait for `prompts[0]` without sending anything.
    pub async fn expect(&mut self, step: &str, prompts: &PromptSet, tier: Tier) -> Result<String> {
        self.settle(step, None, prompts, tier).await
    }

    /// Send `line` and wait for `prompts[0]`. Returns the text before the
    /// prompt.
    pub async fn exchange(
        &mut self,
        step: &str,
        line: &str,
        prompts: &PromptSet,
        tier: Tier,
    ) -> Result<String> {
        self.session.send_line(line).await?;
        self.settle(step, Some(line.to_string()), prompts, tier).await
    }

    /// Like [`exchange`](Self::exchange), but the line is never logged or
    /// recorded in errors.
    pub async fn exchange_hidden(
        &mut self,
        step: &str,
        secret: &str,
        prompts: &PromptSet,
        tier: Tier,
    ) -> Result<String> {
        self.session.send_hidden_line(secret).await?;
        self.settle(step, Some(MASK.to_string()), prompts, tier).await
    }

    /// Send `line` and wait for the remote side to hang up.
    ///
    /// Any of `prompts` matching first is a failure; its ordinal is
    /// reported one-based, end of stream being the zeroth outcome.
    pub async fn exchange_eof(
        &mut self,
        step: &str,
        line: &str,
        prompts: &PromptSet,
        tier: Tier,
    ) -> Result<String> {
        self.session.send_line(line).await?;
        let timeout = self.timeout(tier);
        let input = Some(line.to_string());
        match self.session.expect_one_of(prompts, timeout).await? {
            Outcome::StreamEnded => Ok(self.session.before().to_string()),
            Outcome::Matched(n) => Err(self.failure(step, input, StepFailure::Unexpected { ordinal: n + 1 })),
            Outcome::TimedOut => Err(self.failure(step, input, StepFailure::TimedOut(timeout))),
        }
    }

    /// Wait for any of `prompts` without treating a timeout as failure.
    ///
    /// Returns the matched ordinal, or `None` on timeout. End of stream is
    /// still an error.
    pub async fn poll(&mut self, step: &str, prompts: &PromptSet, tier: Tier) -> Result<Option<usize>> {
        let timeout = self.timeout(tier);
        match self.session.expect_one_of(prompts, timeout).await? {
            Outcome::Matched(ordinal) => Ok(Some(ordinal)),
            Outcome::TimedOut => Ok(None),
            Outcome::StreamEnded => Err(self.failure(step, None, StepFailure::StreamEnded)),
        }
    }

    /// Run a sequence of events, stopping at the first failure.
    pub async fn run(&mut self, events: &[InteractiveEvent]) -> Result<InteractiveResult> {
        let start = Instant::now();
        let mut steps = Vec::with_capacity(events.len());

        for event in events {
            let step_start = Instant::now();
            let tier = event.tier.unwrap_or(Tier::Short);
            let output = if event.hidden {
                self.exchange_hidden(event.name(), &event.input, &event.prompts, tier)
                    .await?
            } else {
                self.exchange(event.name(), &event.input, &event.prompts, tier)
                    .await?
            };
            steps.push(InteractiveStep::new(
                event.display_input(),
                output,
                step_start.elapsed(),
            ));
        }

        Ok(InteractiveResult::new(steps, start.elapsed()))
    }

    async fn settle(
        &mut self,
        step: &str,
        input: Option<String>,
        prompts: &PromptSet,
        tier: Tier,
    ) -> Result<String> {
        let timeout = self.timeout(tier);
        match self.session.expect_one_of(prompts, timeout).await? {
            Outcome::Matched(0) => Ok(self.session.before().to_string()),
            Outcome::Matched(ordinal) => {
                Err(self.failure(step, input, StepFailure::Unexpected { ordinal }))
            }
            Outcome::TimedOut => Err(self.failure(step, input, StepFailure::TimedOut(timeout))),
            Outcome::StreamEnded => Err(self.failure(step, input, StepFailure::StreamEnded)),
        }
    }

    fn failure(&self, step: &str, input: Option<String>, failure: StepFailure) -> Error {
        debug!("{}: step '{step}' failed: {failure}", self.session.name());
        StepError {
            step: step.to_string(),
            input,
            before: self.session.before().to_string(),
            failure,
        }
        .into()
    }
}

/// Close `session` and pass `result` through.
///
/// Flows call this on every exit path so no process outlives its flow.
pub async fn finish<T: Transport, R>(session: &mut Session<T>, result: Result<R>) -> Result<R> {
    if let Err(e) = session.close().await {
        warn!("{}: close failed: {e}", session.name());
    }
    result
}
