//! BackoffPolicy - Poll interval policy for waiters and transient retries

use std::time::Duration;

/// Delay policy between poll attempts: a fixed delay or exponential growth
/// capped at a maximum, with an optional jitter fraction.
///
/// Jitter is subtractive: a jittered delay is drawn from
/// `(1 - jitter) * base ..= base`, so it never exceeds the un-jittered
/// delay for the attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    initial: Duration,
    multiplier: f64,
    max: Duration,
    jitter: f64,
}

impl BackoffPolicy {
    /// Fixed delay between attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            multiplier: 1.0,
            max: delay,
            jitter: 0.0,
        }
    }

    /// Exponential backoff doubling from `initial`, capped at `max`.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            multiplier: 2.0,
            max,
            jitter: 0.0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Jitter fraction in `0.0..=1.0`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Un-jittered delay for the zero-indexed attempt.
    fn base_delay(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1.0 {
            return self.initial.min(self.max);
        }
        // Exponent is clamped; past ~32 doublings the cap dominates anyway.
        let factor = self.multiplier.powi(attempt.min(32) as i32);
        self.initial.mul_f64(factor).min(self.max)
    }

    /// Delay to sleep before the next attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        base.mul_f64(1.0 - self.jitter * rand::random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_is_constant() {
        let policy = BackoffPolicy::fixed(Duration::from_secs(5));
        assert_eq!(policy.delay(0), Duration::from_secs(5));
        assert_eq!(policy.delay(10), Duration::from_secs(5));
    }

    #[test]
    fn exponential_doubles_until_cap() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(4), Duration::from_secs(10));
        assert_eq!(policy.delay(30), Duration::from_secs(10));
    }

    #[test]
    fn jittered_delay_never_exceeds_base() {
        let policy = BackoffPolicy::fixed(Duration::from_secs(4)).with_jitter(0.5);
        for _ in 0..100 {
            let d = policy.delay(0);
            assert!(d <= Duration::from_secs(4));
            assert!(d >= Duration::from_secs(2));
        }
    }

    #[test]
    fn jitter_fraction_is_clamped() {
        let policy = BackoffPolicy::fixed(Duration::from_secs(1)).with_jitter(7.0);
        for _ in 0..100 {
            assert!(policy.delay(0) <= Duration::from_secs(1));
        }
    }

    #[test]
    fn large_attempt_does_not_overflow() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(2), Duration::from_secs(60));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(60));
    }
}
