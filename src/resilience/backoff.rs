//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `attempt` (1-based).
///
/// Doubles from `base` per attempt, capped at `max`, plus up to 10% jitter.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt - 1);
    let delay = base.saturating_mul(factor).min(max);

    let jitter_ms = (delay.as_millis() / 10) as u64;
    if jitter_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(2);

        assert_eq!(backoff_delay(0, base, max), Duration::ZERO);

        let first = backoff_delay(1, base, max);
        assert!(first >= base && first < Duration::from_millis(550));

        let second = backoff_delay(2, base, max);
        assert!(second >= Duration::from_secs(1));

        let capped = backoff_delay(10, base, max);
        assert!(capped >= max && capped < Duration::from_millis(2_200));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let delay = backoff_delay(u32::MAX, Duration::from_millis(100), Duration::from_secs(1));
        assert!(delay >= Duration::from_secs(1));
    }
}
