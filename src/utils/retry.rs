use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::GenerationError;

const JITTER_FACTOR: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retry_timeouts: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries: max_retries.min(1),
            base_delay,
            retry_timeouts: true,
        }
    }

    pub fn without_timeout_retry(&self) -> Self {
        RetryPolicy {
            retry_timeouts: false,
            ..self.clone()
        }
    }

    fn should_retry(&self, err: &GenerationError) -> bool {
        match err {
            GenerationError::Timeout { .. } => self.retry_timeouts,
            other => other.is_retryable(),
        }
    }

    pub fn fail_fast() -> Self {
        RetryPolicy::new(0, Duration::ZERO)
    }

    fn jittered_delay(&self) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        if base_ms <= 0.0 {
            return Duration::ZERO;
        }
        let factor = rand::thread_rng().gen_range(-JITTER_FACTOR..=JITTER_FACTOR);
        Duration::from_millis((base_ms * (1.0 + factor)).max(0.0) as u64)
    }
}

#[derive(Debug, Clone)]
pub struct OutboundPolicy {
    pub model_timeout: Duration,
    pub seed_fetch_timeout: Duration,
    pub upload_timeout: Duration,
    pub retry: RetryPolicy,
}

pub async fn call_with_retry<T, F, Fut>(
    operation: &str,
    timeout: Duration,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout {
                operation: operation.to_string(),
                elapsed_ms: timeout.as_millis() as u64,
            }),
        };

        let err = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation, attempt = attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !policy.should_retry(&err) || attempt >= max_attempts {
            if attempt > 1 {
                warn!(
                    operation = operation,
                    attempts = attempt,
                    error = %err,
                    "Outbound call failed after retry"
                );
            }
            return Err(err);
        }

        let delay = policy.jittered_delay();
        warn!(
            operation = operation,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Outbound call failed; retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn flaky() -> GenerationError {
        GenerationError::ModelInvocation {
            message: "503 Service Unavailable".to_string(),
            transient: true,
        }
    }

    #[tokio::test]
    async fn retries_a_transient_failure_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let result = call_with_retry("test", Duration::from_secs(1), &policy, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(flaky())
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn never_attempts_more_than_twice() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(7, Duration::from_millis(1));
        let result: Result<(), _> =
            call_with_retry("test", Duration::from_secs(1), &policy, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(flaky())
            })
            .await;
        assert!(matches!(result, Err(GenerationError::ModelInvocation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failures_fail_fast() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let result: Result<(), _> =
            call_with_retry("test", Duration::from_secs(1), &policy, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::Upload {
                    message: "Invalid Signature".to_string(),
                    transient: false,
                })
            })
            .await;
        assert!(matches!(result, Err(GenerationError::Upload { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_calls_surface_as_timeouts() {
        let policy = RetryPolicy::fail_fast();
        let result: Result<(), _> =
            call_with_retry("seed.fetch", Duration::from_millis(20), &policy, || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        match result {
            Err(err @ GenerationError::Timeout { .. }) => {
                assert_eq!(err.to_string(), "seed.fetch timed out after 20ms");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeouts_retry_only_when_allowed() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let slow = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), GenerationError>(())
        };

        let result = call_with_retry("model.generate", Duration::from_millis(10), &policy, slow).await;
        assert!(matches!(result, Err(GenerationError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        calls.store(0, Ordering::SeqCst);
        let result = call_with_retry(
            "hosting.upload",
            Duration::from_millis(10),
            &policy.without_timeout_retry(),
            slow,
        )
        .await;
        assert!(matches!(result, Err(GenerationError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn jitter_stays_within_a_quarter_of_the_base() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1000));
        for _ in 0..50 {
            let delay = policy.jittered_delay().as_millis();
            assert!((750..=1250).contains(&delay), "delay {delay} out of range");
        }
    }
}
