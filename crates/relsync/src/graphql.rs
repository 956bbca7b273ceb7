//! Rate-limited GraphQL client for the upstream release API.
//!
//! - [`GraphQlClient`] issues queries, follows cursors and retries transient failures
//! - [`QuotaThrottle`] sleeps when the remaining quota runs low
//! - [`ApiRateLimiter`] paces requests client-side

pub mod client;
pub mod error;
pub mod pacing;
pub mod throttle;
pub mod types;

pub use client::{
    CURSOR_VARIABLE, ClientSettings, GITHUB_GRAPHQL_URL, GITHUB_RATE_LIMIT_URL, GraphQlClient,
};
pub use error::{GraphQlError, Result};
pub use pacing::ApiRateLimiter;
pub use throttle::QuotaThrottle;
pub use types::{Page, PageInfo, QueryOutcome, QuotaStatus, RateLimit};
