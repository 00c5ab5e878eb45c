//! Bounded retries around one generation call

use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use org_synth_sdk::{log_call_retry, log_debug, log_warning};

use crate::config::GenerationConfig;
use crate::error::SynthError;
use crate::llm::ChatClient;
use crate::workflow_utils::extract::{parse_response, ExtractMode};

/// Fixed attempt budget with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Policy with no pause between attempts, for tests
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

impl From<&GenerationConfig> for RetryPolicy {
    fn from(config: &GenerationConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }
}

/// One prompt to send: the fixed system role plus the user prompt
#[derive(Debug, Clone, Copy)]
pub struct CallSpec<'a> {
    /// Label used in log events
    pub task_id: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
    pub mode: ExtractMode,
}

/// Wraps a [`ChatClient`] with retries and response extraction.
///
/// Transport failures and malformed responses share one budget. Every
/// attempt is counted so callers can attribute API usage to a unit of work.
pub struct RetryingCaller {
    client: Arc<dyn ChatClient>,
    policy: RetryPolicy,
    attempts: AtomicUsize,
}

impl RetryingCaller {
    pub fn new(client: Arc<dyn ChatClient>, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Total endpoint attempts made through this caller
    pub fn attempts_made(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Call until the response parses as `T` or the budget runs out
    pub async fn call<T: DeserializeOwned>(&self, spec: CallSpec<'_>) -> Result<T, SynthError> {
        let max = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.attempts.fetch_add(1, Ordering::SeqCst);
            log_debug!("[{}] Calling model (attempt {}/{})", spec.task_id, attempt, max);

            let outcome = match self.client.complete(spec.system, spec.prompt).await {
                Ok(raw) => parse_response::<T>(&raw, spec.mode),
                Err(e) => Err(e),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            log_call_retry!(spec.task_id, attempt, max, &err);
            log_warning!("[{}] Attempt {}/{} failed: {}", spec.task_id, attempt, max, err);
            if let SynthError::MalformedResponse { preview, .. } = &err {
                log_debug!("Response preview (first 500 chars): {}", preview);
            }

            if attempt >= max {
                return Err(SynthError::ExhaustedRetries {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            if !self.policy.delay.is_zero() {
                tokio::time::sleep(self.policy.delay).await;
            }
        }
    }
}
