//! Exponential backoff with optional jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate the exponential backoff delay after failed attempt `attempt`.
///
/// Attempt `n` (1-based) waits `base_ms * 2^(n-1)`, capped at `max_ms`.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);

    Duration::from_millis(delay_ms.min(max_ms))
}

/// Apply jitter of 0 to 10% of the delay.
pub fn with_jitter(delay: Duration) -> Duration {
    let delay_ms = delay.as_millis() as u64;
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 100, 2000), Duration::from_millis(100));
        assert_eq!(calculate_backoff(2, 100, 2000), Duration::from_millis(200));
        assert_eq!(calculate_backoff(3, 100, 2000), Duration::from_millis(400));
        assert_eq!(calculate_backoff(10, 100, 1000), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_is_non_decreasing() {
        let mut previous = Duration::ZERO;
        for attempt in 1..70 {
            let delay = calculate_backoff(attempt, 250, 30_000);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let d = with_jitter(base);
            assert!(d >= base);
            assert!(d < Duration::from_millis(1100));
        }
        assert_eq!(with_jitter(Duration::from_millis(5)), Duration::from_millis(5));
    }
}
