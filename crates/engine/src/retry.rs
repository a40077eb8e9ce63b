use limitbot_core::{ExchangeGateway, FailureKind, GatewayError, OrderAck, OrderRequest};
use std::time::Duration;
use tracing::{info, warn};

use crate::orders::submit_order;

/// Pause between submission attempts unless configured otherwise.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Upper bound on the pause when backoff is enabled.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// When and how often the submission loop retries.
///
/// The default retries forever at a constant 200ms, whatever the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Pause after the first failed attempt.
    pub delay: Duration,
    /// Multiplier applied to the pause after each failure (1.0 keeps it constant).
    pub backoff_factor: f64,
    /// Ceiling for the grown pause.
    pub max_delay: Duration,
    /// Total attempts before giving up; `None` retries until accepted.
    pub max_attempts: Option<u32>,
    /// Stop at the first order rejection instead of retrying it.
    pub give_up_on_rejection: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            backoff_factor: 1.0,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: None,
            give_up_on_rejection: false,
        }
    }
}

impl RetryPolicy {
    pub fn constant(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, factor: f64, max_delay: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_delay = max_delay;
        self
    }

    pub fn giving_up_on_rejection(mut self) -> Self {
        self.give_up_on_rejection = true;
        self
    }

    /// Pause to use after `current`, never above `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return current.min(self.max_delay);
        }
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Attempting,
    Done,
    /// Only reachable with a bounded policy.
    GaveUp,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("Order not accepted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: GatewayError },
    #[error("Order rejected on attempt {attempts}: {source}")]
    Rejected {
        attempts: u32,
        #[source]
        source: GatewayError,
    },
}

/// Resubmits one fixed order until the exchange accepts it.
///
/// Dropping the `run` future stops the loop; the attempt count and state stay
/// readable afterwards.
#[derive(Debug)]
pub struct SubmissionLoop {
    request: OrderRequest,
    policy: RetryPolicy,
    state: SubmissionState,
    attempts: u32,
}

impl SubmissionLoop {
    pub fn new(request: OrderRequest, policy: RetryPolicy) -> Self {
        Self {
            request,
            policy,
            state: SubmissionState::Attempting,
            attempts: 0,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn request(&self) -> &OrderRequest {
        &self.request
    }

    pub async fn run<G>(&mut self, gateway: &G) -> Result<OrderAck, RetryError>
    where
        G: ExchangeGateway + ?Sized,
    {
        self.state = SubmissionState::Attempting;
        let mut delay = self.policy.delay.min(self.policy.max_delay);

        loop {
            self.attempts += 1;

            let err = match submit_order(gateway, &self.request).await {
                Ok(ack) => {
                    self.state = SubmissionState::Done;
                    info!(
                        symbol = %self.request.symbol,
                        side = %self.request.side,
                        order_id = ack.order_id,
                        attempts = self.attempts,
                        "Order accepted"
                    );
                    return Ok(ack);
                }
                Err(err) => err,
            };

            let kind = err.kind();
            if self.policy.give_up_on_rejection && kind == FailureKind::OrderRejected {
                self.state = SubmissionState::GaveUp;
                warn!(attempts = self.attempts, error = %err, "Order rejected, not retrying");
                return Err(RetryError::Rejected {
                    attempts: self.attempts,
                    source: err,
                });
            }
            if self.policy.exhausted(self.attempts) {
                self.state = SubmissionState::GaveUp;
                warn!(attempts = self.attempts, error = %err, "Retry attempts exhausted");
                return Err(RetryError::Exhausted {
                    attempts: self.attempts,
                    last: err,
                });
            }

            info!(
                attempt = self.attempts,
                kind = ?kind,
                delay_ms = delay.as_millis() as u64,
                "Order not accepted, retrying"
            );
            tokio::time::sleep(delay).await;
            delay = self.policy.next_delay(delay);
        }
    }
}
