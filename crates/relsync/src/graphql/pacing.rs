use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request pacing against the GraphQL endpoint (requests per second).
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Client-side request pacing shared by every fan-out task.
///
/// This smooths bursts from concurrent fetches; quota accounting is handled
/// separately by [`super::QuotaThrottle`].
///
/// # Example
///
/// ```ignore
/// let pacer = ApiRateLimiter::new(10);
/// pacer.wait().await;
/// transport.send(request).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter; returns `None` when `requests_per_second` is zero,
    /// which disables pacing.
    #[must_use]
    pub fn new(requests_per_second: u32) -> Option<Self> {
        let rps = NonZeroU32::new(requests_per_second)?;
        Some(Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        })
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}
