//! Bounded readiness wait for an external dependency.
//!
//! Polls an async predicate with a short interval at first and a longer one
//! once `slow_after` has elapsed, for at most `max_wait` in total.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::config::ReadinessConfig;

/// Polling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessPolicy {
    pub max_wait: Duration,
    pub initial_interval: Duration,
    pub slow_interval: Duration,
    pub slow_after: Duration,
    pub progress_every: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

impl From<&ReadinessConfig> for ReadinessPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            max_wait: Duration::from_millis(config.max_wait_ms),
            initial_interval: Duration::from_millis(config.initial_interval_ms),
            slow_interval: Duration::from_millis(config.slow_interval_ms),
            slow_after: Duration::from_millis(config.slow_after_ms),
            progress_every: Duration::from_millis(config.progress_every_ms),
        }
    }
}

impl ReadinessPolicy {
    /// Sleep interval to use once `elapsed` has been spent waiting.
    pub fn interval_at(&self, elapsed: Duration) -> Duration {
        if elapsed < self.slow_after {
            self.initial_interval
        } else {
            self.slow_interval
        }
    }
}

/// Result of one readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the predicate reported ready before the budget ran out.
    pub ready: bool,
    /// Number of predicate checks performed.
    pub attempts: u32,
    /// Time spent waiting.
    pub elapsed: Duration,
}

/// Poll `probe` until it returns true or the policy's budget is exhausted.
///
/// Running out of budget is not an error; the outcome reports `ready: false`.
pub async fn wait_until_ready<F, Fut>(policy: &ReadinessPolicy, mut probe: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut next_progress = policy.progress_every;

    loop {
        let elapsed = start.elapsed();
        if elapsed >= policy.max_wait {
            return PollOutcome {
                ready: false,
                attempts,
                elapsed,
            };
        }

        attempts += 1;
        if probe().await {
            return PollOutcome {
                ready: true,
                attempts,
                elapsed: start.elapsed(),
            };
        }

        let remaining = policy.max_wait.saturating_sub(start.elapsed());
        let interval = policy.interval_at(start.elapsed()).min(remaining);
        sleep(interval).await;

        let elapsed = start.elapsed();
        if !policy.progress_every.is_zero() && elapsed >= next_progress {
            tracing::info!(
                elapsed_secs = elapsed.as_secs_f64(),
                attempts,
                "Waiting for voice engine to become ready"
            );
            while next_progress <= elapsed {
                next_progress += policy.progress_every;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn assert_close(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= Duration::from_millis(2),
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_interval_switches_after_slow_after() {
        let policy = ReadinessPolicy::default();
        assert_eq!(policy.interval_at(Duration::ZERO), Duration::from_millis(300));
        assert_eq!(policy.interval_at(Duration::from_millis(4_999)), Duration::from_millis(300));
        assert_eq!(policy.interval_at(Duration::from_secs(5)), Duration::from_secs(1));
        assert_eq!(policy.interval_at(Duration::from_secs(12)), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_early_when_ready() {
        let policy = ReadinessPolicy::default();
        let calls = RefCell::new(0u32);

        let outcome = wait_until_ready(&policy, || {
            *calls.borrow_mut() += 1;
            let n = *calls.borrow();
            async move { n == 3 }
        })
        .await;

        assert!(outcome.ready);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(*calls.borrow(), 3);
        assert_close(outcome.elapsed, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_immediately_does_not_sleep() {
        let outcome = wait_until_ready(&ReadinessPolicy::default(), || async { true }).await;

        assert!(outcome.ready);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let start = Instant::now();
        let outcome = wait_until_ready(&ReadinessPolicy::default(), || async { false }).await;

        assert!(!outcome.ready);
        assert_close(outcome.elapsed, Duration::from_secs(15));
        assert_close(start.elapsed(), Duration::from_secs(15));
        // 18 checks 0.3s apart (0 to 5.1s), then 1s steps, the last sleep truncated.
        assert_eq!(outcome.attempts, 27);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_slows_down_after_five_seconds() {
        let start = Instant::now();
        let checks: RefCell<Vec<Duration>> = RefCell::new(Vec::new());

        let outcome = wait_until_ready(&ReadinessPolicy::default(), || {
            checks.borrow_mut().push(start.elapsed());
            let n = checks.borrow().len();
            async move { n > 20 }
        })
        .await;

        assert!(outcome.ready);
        let checks = checks.into_inner();
        assert_eq!(checks.len(), 21);

        for pair in checks.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let expected = if prev < Duration::from_secs(5) {
                Duration::from_millis(300)
            } else {
                Duration::from_secs(1)
            };
            assert_close(next - prev, expected);
        }
        // 18 checks reach 5.1s; the remaining 3 intervals are 1s each.
        assert_close(*checks.last().unwrap(), Duration::from_millis(8_100));
    }
}
