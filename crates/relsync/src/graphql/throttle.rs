//! Self-throttling against the upstream quota.
//!
//! Every query reports the remaining quota of the rolling window. Once it
//! drops below the soft threshold the client asks the quota endpoint for the
//! exact figures and sleeps until the quota has recovered.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::QuotaStatus;

pub const DEFAULT_SOFT_THRESHOLD: u32 = 1000;
pub const DEFAULT_HARD_FLOOR: u32 = 200;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(400);
pub const DEFAULT_MIN_POLL: Duration = Duration::from_secs(10);

/// Quota thresholds and delay bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaThrottle {
    /// Remaining quota below which the client starts throttling.
    pub soft_threshold: u32,
    /// Remaining quota at or below which the client waits for the reset.
    pub hard_floor: u32,
    /// Delay when the quota is nearly exhausted but above the hard floor.
    pub max_delay: Duration,
    /// Minimum wait between two quota polls.
    pub min_poll: Duration,
}

impl Default for QuotaThrottle {
    fn default() -> Self {
        Self {
            soft_threshold: DEFAULT_SOFT_THRESHOLD,
            hard_floor: DEFAULT_HARD_FLOOR,
            max_delay: DEFAULT_MAX_DELAY,
            min_poll: DEFAULT_MIN_POLL,
        }
    }
}

impl QuotaThrottle {
    #[must_use]
    pub fn new(soft_threshold: u32, hard_floor: u32) -> Self {
        Self {
            soft_threshold,
            hard_floor,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn needs_throttle(&self, remaining: u32) -> bool {
        remaining < self.soft_threshold
    }

    /// How long to wait given an exact quota reading.
    ///
    /// Above the hard floor the delay scales linearly from zero at the soft
    /// threshold up to `max_delay` at an empty quota. At or below the floor
    /// it is the time left until the quota resets.
    #[must_use]
    pub fn delay_for(&self, status: &QuotaStatus, now: DateTime<Utc>) -> Duration {
        if status.remaining > self.hard_floor {
            if self.soft_threshold == 0 || status.remaining >= self.soft_threshold {
                return Duration::ZERO;
            }
            let missing = u128::from(self.soft_threshold - status.remaining);
            let millis = self.max_delay.as_millis() * missing / u128::from(self.soft_threshold);
            Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
        } else {
            (status.reset_at - now).to_std().unwrap_or(Duration::ZERO)
        }
    }

    /// Sleep until the quota reported by `fetch_quota` is back at the soft
    /// threshold. Sleeps at least `min_poll` between polls.
    pub async fn wait_for_quota<F, Fut>(&self, mut fetch_quota: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = QuotaStatus>,
    {
        let mut status = fetch_quota().await;
        loop {
            let delay = self.delay_for(&status, Utc::now()).max(self.min_poll);
            if status.remaining <= self.hard_floor {
                tracing::info!(
                    remaining = status.remaining,
                    reset_at = %status.reset_at,
                    "Remaining quota very low, waiting for reset"
                );
            } else {
                tracing::debug!(
                    remaining = status.remaining,
                    delay_secs = delay.as_secs(),
                    "Remaining quota low, throttling"
                );
            }
            tokio::time::sleep(delay).await;

            status = fetch_quota().await;
            if status.remaining >= self.soft_threshold {
                break;
            }
        }
    }
}
