use std::time::Duration;

use crate::config::BackoffSection;

/// Linear-capped reconnect schedule: attempt `i` (1-based) waits
/// `min(i * base, cap)`. Waits never decrease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap: cap.max(base),
            max_attempts,
        }
    }

    pub fn from_config(cfg: &BackoffSection) -> Self {
        Self::new(
            Duration::from_millis(cfg.base_ms),
            Duration::from_millis(cfg.cap_ms),
            cfg.max_attempts,
        )
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.max(1)).min(self.cap)
    }

    /// Every wait of one reconnect sequence, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_attempts).map(|i| self.delay(i))
    }
}
