//! Retry policy with exponential backoff.
//!
//! A [`RetryPolicy`] defines how many times a transient failure may be
//! retried and how long to wait between attempts. The delay schedule is
//! exponential with a hard cap:
//!
//! ```text
//! delay(attempt) = min(initial_delay_ms × backoff_multiplier ^ attempt, max_delay_ms)
//! ```
//!
//! With the defaults (3 retries, 1000 ms initial, ×2 multiplier, 10 000 ms
//! cap, no jitter) a fully failing operation waits 1 s, 2 s, 4 s between its
//! four attempts. Jitter, when enabled, randomizes each delay within
//! ±25 % to avoid synchronized retries across concurrent workflows.
//!
//! The policy only describes the schedule; *what counts as retryable* is the
//! caller's decision, made per error before each sleep.
//!
//! # Example
//!
//! ```rust
//! use stategraph::RetryPolicy;
//!
//! let policy = RetryPolicy::default()
//!     .with_max_retries(5)
//!     .with_initial_delay_ms(500);
//!
//! assert_eq!(policy.delay_for(0).as_millis(), 500);
//! assert_eq!(policy.delay_for(1).as_millis(), 1000);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configurable exponential-backoff retry policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt (so `max_retries + 1`
    /// attempts in total).
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_multiplier: f64,
    /// Randomize each delay within ±25% when set.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial delay in milliseconds.
    pub fn with_initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set the maximum delay in milliseconds.
    pub fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, factor: f64) -> Self {
        self.backoff_multiplier = factor;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether another retry is allowed after `attempt` failures of the
    /// initial try (attempt is zero-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay to sleep before retrying after the given zero-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let mut delay = exp.min(self.max_delay_ms as f64);
        if self.jitter {
            let factor = 0.75 + rand::random::<f64>() * 0.5;
            delay *= factor;
        }
        Duration::from_millis(delay.max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_up_to_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        // cap kicks in well before attempt 10
        assert_eq!(policy.delay_for(10), Duration::from_millis(10_000));
    }

    #[test]
    fn allows_exactly_max_retries() {
        let policy = RetryPolicy::default().with_max_retries(3);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn none_never_retries() {
        assert!(!RetryPolicy::none().should_retry(0));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::default().with_jitter(true);
        for _ in 0..100 {
            let delay = policy.delay_for(1).as_millis() as f64;
            assert!((1500.0..=2500.0).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn deserializes_partial_config_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_retries": 5}"#).unwrap();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay_ms, 1000);
        assert!(!policy.jitter);
    }
}
