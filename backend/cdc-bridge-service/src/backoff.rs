//! Restart delay policy with exponential backoff and jitter
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first restart
    pub initial_backoff: Duration,
    /// Upper bound for the un-jittered delay
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to backoff (±30%)
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before restart number `attempt` (1-based): exponential growth
    /// capped at `max_backoff`, then spread by up to 30% either way.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let grown = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = grown.min(self.max_backoff.as_millis() as f64);

        let spread = if self.jitter {
            rand::thread_rng().gen_range(0.7..1.3)
        } else {
            1.0
        };
        Duration::from_millis((capped_ms * spread) as u64)
    }
}
