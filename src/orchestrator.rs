//! Alternating retry across two models.
//!
//! Each attempt runs the whole task with one model. An attempt succeeds when
//! its output passes [`task::is_success`]; otherwise the next attempt uses the
//! other model, up to `max_attempts` in total (primary, alternate, primary,
//! alternate by default). The last attempt's output is returned verbatim
//! whether or not it succeeded.

use tracing::{Instrument, Level};

use crate::agent::AgentRuntime;
use crate::config::Config;
use crate::task;

/// Which model runs each attempt, and how many attempts there are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub primary: String,
    pub alternate: String,
    pub max_attempts: usize,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: usize = 4;

    /// Alternate between two models, four attempts in total.
    pub fn alternating(primary: impl Into<String>, alternate: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            alternate: alternate.into(),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Short model name for the zero-based attempt `index`.
    pub fn model_for_attempt(&self, index: usize) -> &str {
        if index % 2 == 0 {
            &self.primary
        } else {
            &self.alternate
        }
    }

    /// Log level for a failed attempt at `index`, `None` when it is the last
    /// one (its output is reported as the result instead).
    pub fn mismatch_level(&self, index: usize) -> Option<Level> {
        if index + 1 >= self.max_attempts {
            None
        } else if index == 0 {
            Some(Level::DEBUG)
        } else {
            Some(Level::ERROR)
        }
    }
}

/// What happened in one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based
    pub number: usize,
    pub model_key: String,
    pub model_id: String,
    pub output: String,
    pub succeeded: bool,
}

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Output of the last attempt, verbatim
    pub output: String,
    pub attempts: Vec<AttemptRecord>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.attempts.last().map_or(false, |a| a.succeeded)
    }
}

pub struct Orchestrator<'a> {
    runtime: &'a dyn AgentRuntime,
    config: &'a Config,
    policy: RetryPolicy,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator using the config's primary/alternate models.
    pub fn new(runtime: &'a dyn AgentRuntime, config: &'a Config) -> Self {
        let policy = RetryPolicy::alternating(&config.primary_model, &config.alternate_model);
        Self::with_policy(runtime, config, policy)
    }

    pub fn with_policy(runtime: &'a dyn AgentRuntime, config: &'a Config, mut policy: RetryPolicy) -> Self {
        policy.max_attempts = policy.max_attempts.max(1);
        Self {
            runtime,
            config,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run attempts until one succeeds or the policy is exhausted.
    pub async fn run(&self, prompt: &str) -> RunOutcome {
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(self.policy.max_attempts);

        for index in 0..self.policy.max_attempts {
            let model_key = self.policy.model_for_attempt(index);
            let model_id = self.config.models.get(model_key).unwrap_or(model_key);
            let number = index + 1;

            if index > 0 {
                tracing::info!("Retrying with {}", model_key);
            }

            let span = tracing::info_span!("attempt", number, model = model_key);
            let output = match self
                .runtime
                .run(prompt, model_id, &self.config.model_settings)
                .instrument(span)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(attempt = number, model = model_key, "Attempt aborted: {:#}", e);
                    format!("Error: {:#}", e)
                }
            };

            let succeeded = task::is_success(&output);
            attempts.push(AttemptRecord {
                number,
                model_key: model_key.to_string(),
                model_id: model_id.to_string(),
                output,
                succeeded,
            });

            if succeeded {
                tracing::info!(attempt = number, model = model_key, "Certificates downloaded");
                break;
            }

            let result = attempts[index].output.as_str();
            match self.policy.mismatch_level(index) {
                Some(level) if level == Level::DEBUG => tracing::debug!(result, "Failed to download PDFs"),
                Some(_) => tracing::error!(result, "Failed to download PDFs"),
                None => {}
            }
        }

        let output = attempts
            .last()
            .map(|a| a.output.clone())
            .unwrap_or_default();
        RunOutcome { output, attempts }
    }
}
