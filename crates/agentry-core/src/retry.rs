//! Bounded retry with exponential backoff for rate-limited model calls.
//!
//! Only `AgentError::RateLimited` is retried. Any other failure, and a rate
//! limit that persists past the attempt budget, surfaces as
//! `AgentError::ModelCall`, which is fatal to the run.

use std::thread;
use std::time::Duration;

use tracing::warn;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    prompt::Prompt,
};

use crate::traits::ModelClient;

/// How many times to try a model call and how long to wait between tries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Retry immediately; for tests and scripted collaborators.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Call `model`, retrying rate limits according to `policy`.
pub fn call_with_retry(
    model: &dyn ModelClient,
    prompt: &Prompt,
    policy: &RetryPolicy,
) -> AgentResult<String> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 0..attempts {
        match model.call(prompt) {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() => {
                if attempt + 1 == attempts {
                    return Err(AgentError::ModelCall {
                        reason: format!("still rate limited after {attempts} attempts: {e}"),
                    });
                }
                let wait = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    backoff_ms = wait.as_millis() as u64,
                    error = %e,
                    "model rate limited, backing off"
                );
                thread::sleep(wait);
            }
            Err(AgentError::ModelCall { reason }) => return Err(AgentError::ModelCall { reason }),
            Err(other) => {
                return Err(AgentError::ModelCall {
                    reason: other.to_string(),
                })
            }
        }
    }

    // The loop always returns on its last attempt.
    Err(AgentError::ModelCall {
        reason: "no model call attempted".to_string(),
    })
}

/// A `ModelClient` decorator applying `call_with_retry` to every call.
///
/// Useful for tier models installed in an `ActionContext`, which tools call
/// directly rather than through the agent loop.
pub struct RetryingModel<M> {
    inner: M,
    policy: RetryPolicy,
}

impl<M: ModelClient> RetryingModel<M> {
    pub fn new(inner: M, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<M: ModelClient> ModelClient for RetryingModel<M> {
    fn call(&self, prompt: &Prompt) -> AgentResult<String> {
        call_with_retry(&self.inner, prompt, &self.policy)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Fails with the queued errors, then answers "ok".
    struct FlakyModel {
        failures: Mutex<Vec<AgentError>>,
        calls: Mutex<u32>,
    }

    impl FlakyModel {
        fn new(failures: Vec<AgentError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl ModelClient for FlakyModel {
        fn call(&self, _prompt: &Prompt) -> AgentResult<String> {
            *self.calls.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok("ok".to_string())
            } else {
                Err(failures.remove(0))
            }
        }
    }

    fn rate_limited() -> AgentError {
        AgentError::RateLimited {
            reason: "429".to_string(),
        }
    }

    #[test]
    fn retries_rate_limits_then_succeeds() {
        let model = FlakyModel::new(vec![rate_limited(), rate_limited()]);
        let out = call_with_retry(&model, &Prompt::default(), &RetryPolicy::immediate(3)).unwrap();
        assert_eq!(out, "ok");
        assert_eq!(model.calls(), 3);
    }

    #[test]
    fn exhausted_budget_is_fatal() {
        let model = FlakyModel::new(vec![rate_limited(), rate_limited(), rate_limited()]);
        let err = call_with_retry(&model, &Prompt::default(), &RetryPolicy::immediate(3)).unwrap_err();
        assert!(matches!(err, AgentError::ModelCall { .. }));
        assert_eq!(model.calls(), 3);
    }

    #[test]
    fn generic_errors_are_not_retried() {
        let model = FlakyModel::new(vec![AgentError::ModelCall {
            reason: "bad request".to_string(),
        }]);
        let err = call_with_retry(&model, &Prompt::default(), &RetryPolicy::immediate(3)).unwrap_err();
        assert!(err.to_string().contains("bad request"));
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn retrying_model_wraps_inner() {
        let model = RetryingModel::new(
            FlakyModel::new(vec![rate_limited()]),
            RetryPolicy::immediate(2),
        );
        assert_eq!(model.call(&Prompt::default()).unwrap(), "ok");
        assert_eq!(model.inner.calls(), 2);
    }
}
