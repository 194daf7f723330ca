use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Fixed-backoff retry budget for establishing a broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Runs `connect` until it succeeds or the policy is exhausted, sleeping
/// `backoff` between attempts. Returns the last error on exhaustion.
pub async fn connect_with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    endpoint: &str,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match connect().await {
            Ok(connection) => {
                if attempt > 1 {
                    tracing::info!(endpoint, attempt, "connected after retry");
                }
                return Ok(connection);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    endpoint,
                    attempt,
                    attempts,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    error = %e,
                    "connection attempt failed, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(endpoint, attempts, error = %e, "giving up on connection");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::BusError;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = connect_with_retry(quick(5), "bus", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(BusError::Connection(format!("refused #{n}")))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), BusError> = connect_with_retry(quick(4), "bus", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BusError::Connection("refused".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(BusError::Connection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let _: Result<(), BusError> = connect_with_retry(quick(0), "bus", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BusError::Connection("refused".to_string()))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_policy_is_five_attempts_two_seconds_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }
}
