use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How many times to try a flaky call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Back-off before retrying after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// Classification of a failed attempt.
#[derive(Debug)]
pub enum Retry<E> {
    /// Try again after the normal back-off.
    Transient(E),
    /// The remote side asked us to slow down; wait twice as long.
    Throttled(E),
    /// Retrying cannot help (bad credentials, 404, ...).
    Abort(E),
}

impl<E> Retry<E> {
    pub fn into_inner(self) -> E {
        match self {
            Retry::Transient(e) | Retry::Throttled(e) | Retry::Abort(e) => e,
        }
    }
}

/// Run `op` until it succeeds, aborts, or the policy runs out of attempts.
///
/// `op` receives the 1-based attempt number. The last error is returned.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Retry<E>>>,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let failure = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        let delay = match &failure {
            Retry::Abort(_) => None,
            _ if attempt >= attempts => None,
            Retry::Transient(_) => Some(policy.delay_for(attempt)),
            Retry::Throttled(_) => Some(policy.delay_for(attempt) * 2),
        };

        let Some(delay) = delay else {
            let error = failure.into_inner();
            tracing::warn!(label, attempt, error = %error, "giving up");
            return Err(error);
        };

        if let Retry::Transient(e) | Retry::Throttled(e) = &failure {
            tracing::warn!(
                label,
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                error = %e,
                "attempt failed, retrying"
            );
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        };

        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = retry(&RetryPolicy::default(), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(Retry::Transient(format!("boom {attempt}")))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_when_attempts_exhausted() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry(&RetryPolicy::default(), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(Retry::Throttled(format!("slow down {attempt}"))) }
        })
        .await;

        assert_eq!(result, Err("slow down 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    async fn time_until_exhausted(throttled: bool) -> Duration {
        let started = tokio::time::Instant::now();
        let _: Result<(), String> = retry(&RetryPolicy::default(), "test", |_| async move {
            if throttled {
                Err(Retry::Throttled("429".to_string()))
            } else {
                Err(Retry::Transient("503".to_string()))
            }
        })
        .await;
        started.elapsed()
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_failures_back_off_twice_as_long() {
        // Default policy: waits after attempts 1 and 2 only.
        let transient = time_until_exhausted(false).await;
        let throttled = time_until_exhausted(true).await;

        assert_eq!(transient, Duration::from_secs(2 + 4));
        assert_eq!(throttled, Duration::from_secs(4 + 8));
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry(&RetryPolicy::default(), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Retry::Abort("unauthorized".to_string())) }
        })
        .await;

        assert_eq!(result, Err("unauthorized".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
