//! Exponential backoff between execution attempts.

use std::time::Duration;

/// Delay before retrying after `attempt` (1-based): `min(max, min * 2^attempt)`.
///
/// Attempt 0 yields no delay.
pub fn calculate_backoff(attempt: u32, min: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    min.checked_mul(factor).unwrap_or(max).min(max)
}

/// Next per-node readmission delay: doubles from `min`, capped at `max`.
pub fn next_node_backoff(current: Duration, min: Duration, max: Duration) -> Duration {
    if current.is_zero() {
        return min.min(max);
    }
    current.saturating_mul(2).clamp(min.min(max), max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let min = Duration::from_millis(250);
        let max = Duration::from_millis(8000);

        assert_eq!(calculate_backoff(0, min, max), Duration::ZERO);
        assert_eq!(calculate_backoff(1, min, max), Duration::from_millis(500));
        assert_eq!(calculate_backoff(2, min, max), Duration::from_millis(1000));
        assert_eq!(calculate_backoff(5, min, max), max);
    }

    #[test]
    fn test_backoff_saturates() {
        let max = Duration::from_secs(8);
        assert_eq!(calculate_backoff(64, Duration::from_millis(250), max), max);
        assert_eq!(calculate_backoff(40, Duration::from_secs(u64::MAX / 4), max), max);
    }

    #[test]
    fn test_node_backoff_doubles_to_cap() {
        let min = Duration::from_millis(250);
        let max = Duration::from_secs(1);

        let first = next_node_backoff(Duration::ZERO, min, max);
        assert_eq!(first, min);
        let second = next_node_backoff(first, min, max);
        assert_eq!(second, Duration::from_millis(500));
        assert_eq!(next_node_backoff(Duration::from_millis(800), min, max), max);
    }
}
