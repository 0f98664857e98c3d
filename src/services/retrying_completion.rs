//! Rate-limit tolerant generation of the simulated user's next message.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::domain::errors::CompletionError;
use crate::domain::models::{Message, RetryConfig, Transcript};
use crate::domain::ports::{CompletionClient, CompletionOptions};

/// Retry policy with exponential backoff
///
/// Only rate-limit rejections are retried. The delay before retry `n` is
/// `base_delay * multiplier^(n-1)`, capped at `max_delay`, so delays never
/// decrease. `max_attempts` counts every request including the first.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy, clamping values that would make delays shrink or vanish.
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: multiplier.max(1.0),
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Policy described by the `retry` config section.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            config.multiplier,
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Total requests allowed, including the first.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the `failed_attempt`-th request (1-based) was rate limited.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = i32::try_from(failed_attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let max_ms = self.max_delay.as_millis() as f64;
        let delay_ms = (self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent)).min(max_ms);
        Duration::from_millis(delay_ms as u64)
    }
}

impl Default for RetryPolicy {
    /// 10 attempts, starting at 2s and doubling up to 5 minutes
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Retry state for a single completion request.
#[derive(Debug, Clone, Copy)]
struct RetryContext {
    /// 1-based number of the request currently in flight
    attempt_number: u32,
    max_attempts: u32,
}

impl RetryContext {
    const fn start(policy: &RetryPolicy) -> Self {
        Self {
            attempt_number: 1,
            max_attempts: policy.max_attempts,
        }
    }

    const fn is_last_attempt(&self) -> bool {
        self.attempt_number >= self.max_attempts
    }
}

/// Emitted before sleeping on a rate-limited attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryNotice {
    /// The attempt that was rate limited
    pub attempt: u32,
    /// Total attempts the policy allows
    pub max_attempts: u32,
    /// Upstream status, e.g. `429`
    pub status: u16,
    /// Upstream reason, e.g. `Too Many Requests`
    pub reason: String,
    /// How long the client waits before the next attempt
    pub delay: Duration,
}

/// Callback invoked for every retry, alongside the `warn!` event.
pub type RetryObserver = Arc<dyn Fn(&RetryNotice) + Send + Sync>;

/// Wraps a completion client with bounded exponential backoff on rate limiting.
pub struct RetryingCompletionClient {
    client: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
    options: CompletionOptions,
    observer: Option<RetryObserver>,
}

impl RetryingCompletionClient {
    /// Wrap `client`, sampling every request at `temperature`.
    pub fn new(client: Arc<dyn CompletionClient>, policy: RetryPolicy, temperature: f64) -> Self {
        Self {
            client,
            policy,
            options: CompletionOptions::with_temperature(temperature),
            observer: None,
        }
    }

    /// Also report each retry to `observer`, e.g. for console output.
    #[must_use]
    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Generate the simulated user's next message from the full transcript.
    ///
    /// A completion without content yields an empty message rather than an
    /// error. Rate limiting is retried until `max_attempts` requests have been
    /// made; any other failure is returned immediately.
    #[instrument(skip_all, fields(transcript_len = transcript.len()))]
    pub async fn generate_next(&self, transcript: &Transcript) -> Result<Message, CompletionError> {
        let mut context = RetryContext::start(&self.policy);

        loop {
            match self.client.complete(transcript.messages(), &self.options).await {
                Ok(completion) => {
                    if context.attempt_number > 1 {
                        debug!(attempts = context.attempt_number, "completion succeeded after retries");
                    }
                    return Ok(Message::assistant(completion.content.unwrap_or_default()));
                }
                Err(err) if !err.is_retryable() => {
                    debug!(error = %err, "permanent completion error, not retrying");
                    return Err(CompletionError::Fatal(err));
                }
                Err(err) => {
                    let status = err.status().unwrap_or_default();
                    let reason = err.reason().to_string();
                    if context.is_last_attempt() {
                        warn!(
                            attempts = context.attempt_number,
                            status,
                            "completion still rate limited, giving up"
                        );
                        return Err(CompletionError::RetriesExhausted {
                            attempts: context.attempt_number,
                            status,
                            reason,
                        });
                    }

                    let notice = RetryNotice {
                        attempt: context.attempt_number,
                        max_attempts: context.max_attempts,
                        status,
                        reason,
                        delay: self.policy.delay_after(context.attempt_number),
                    };
                    self.notify(&notice);

                    sleep(notice.delay).await;
                    context.attempt_number += 1;
                }
            }
        }
    }

    fn notify(&self, notice: &RetryNotice) {
        warn!(
            attempt = notice.attempt,
            max_attempts = notice.max_attempts,
            status = notice.status,
            delay_ms = u64::try_from(notice.delay.as_millis()).unwrap_or(u64::MAX),
            "{}: retrying ({} of {})",
            notice.reason,
            notice.attempt,
            notice.max_attempts
        );
        if let Some(observer) = &self.observer {
            observer(notice);
        }
    }
}
