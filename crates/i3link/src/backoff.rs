//! Reconnect delay policy.

use std::time::Duration;

use rand::Rng;

/// Linear backoff with a cap and a little random jitter.
///
/// Attempt `n` (1-based) waits `base * n`, capped at `max`, plus up to 10%
/// extra so that many MUDs dropped by the same gateway restart don't all
/// come back in the same instant.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    base: Duration,
    max: Duration,
    /// 0 = unlimited.
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max: max.max(base),
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are used up.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if self.exhausted() {
            return None;
        }
        self.attempt = self.attempt.saturating_add(1);
        let delay = self.base.saturating_mul(self.attempt).min(self.max);
        Some(delay + jitter(delay))
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.max_attempts != 0 && self.attempt >= self.max_attempts
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Called after a successful authentication.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}

fn jitter(delay: Duration) -> Duration {
    let max_ms = (delay.as_millis() / 10) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(d: Duration, base: Duration) -> bool {
        d >= base && d <= base + base / 10
    }

    #[test]
    fn test_next_delay_grows_linearly() {
        let mut b = Backoff::new(Duration::from_secs(5), Duration::from_secs(300), 0);
        assert!(within(b.next_delay().unwrap(), Duration::from_secs(5)));
        assert!(within(b.next_delay().unwrap(), Duration::from_secs(10)));
        assert!(within(b.next_delay().unwrap(), Duration::from_secs(15)));
        assert_eq!(b.attempts(), 3);
    }

    #[test]
    fn test_next_delay_is_capped() {
        let mut b = Backoff::new(Duration::from_secs(100), Duration::from_secs(150), 0);
        b.next_delay();
        assert!(within(b.next_delay().unwrap(), Duration::from_secs(150)));
        assert!(within(b.next_delay().unwrap(), Duration::from_secs(150)));
    }

    #[test]
    fn test_max_attempts_exhausts() {
        let mut b = Backoff::new(Duration::from_millis(1), Duration::from_secs(1), 2);
        assert!(b.next_delay().is_some());
        assert!(b.next_delay().is_some());
        assert!(b.exhausted());
        assert_eq!(b.next_delay(), None);

        b.reset();
        assert!(!b.exhausted());
        assert!(b.next_delay().is_some());
    }

    #[test]
    fn test_zero_base_has_no_jitter() {
        let mut b = Backoff::new(Duration::ZERO, Duration::ZERO, 0);
        assert_eq!(b.next_delay(), Some(Duration::ZERO));
    }
}
