//! Backoff strategy: decides the delay before a retry.

use chrono::Duration;

/// Pluggable backoff strategy.
///
/// `retry_count` is the number of retries already consumed (0 for the first
/// re-queue).
pub trait Backoff: Send + Sync {
    fn next_delay(&self, retry_count: u32) -> Duration;
}

/// Constant delay between attempts. The default.
///
/// Deliberately not exponential: publish failures here are dominated by
/// moderation-queue hiccups and short outages, and the retry budget is small.
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    pub delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self {
            delay: Duration::minutes(10),
        }
    }
}

impl Backoff for FixedBackoff {
    fn next_delay(&self, _retry_count: u32) -> Duration {
        self.delay
    }
}

/// Exponential backoff, available as an opt-in alternative.
///
/// delay = base * multiplier^retry_count
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub multiplier: f64,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, multiplier: f64) -> Self {
        Self { base, multiplier }
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&self, retry_count: u32) -> Duration {
        let base_secs = self.base.num_milliseconds() as f64 / 1000.0;
        let delay_secs = base_secs * self.multiplier.powi(retry_count as i32);
        Duration::milliseconds((delay_secs * 1000.0) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = FixedBackoff::new(Duration::minutes(10));
        assert_eq!(backoff.next_delay(0), Duration::minutes(10));
        assert_eq!(backoff.next_delay(5), Duration::minutes(10));
    }

    #[test]
    fn exponential_backoff_increases() {
        let backoff = ExponentialBackoff::new(Duration::seconds(2), 2.0);

        let d0 = backoff.next_delay(0);
        let d1 = backoff.next_delay(1);
        let d2 = backoff.next_delay(2);

        assert_eq!(d0, Duration::seconds(2));
        assert_eq!(d1, Duration::seconds(4));
        assert_eq!(d2, Duration::seconds(8));
    }
}
