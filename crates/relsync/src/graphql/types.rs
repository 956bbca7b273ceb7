//! Wire types shared by every GraphQL query.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Cursor state of a GraphQL connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// The `rateLimit { cost, remaining }` block queries ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    #[serde(default)]
    pub cost: u32,
    pub remaining: u32,
}

/// One page of a query result plus the quota it reported.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub data: T,
    pub rate_limit: Option<RateLimit>,
}

/// Result of a query against an entity that may not exist upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome<T> {
    Data(T),
    /// The upstream reported the repository as not resolvable.
    NotResolvable,
}

impl<T> QueryOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryOutcome<U> {
        match self {
            Self::Data(data) => QueryOutcome::Data(f(data)),
            Self::NotResolvable => QueryOutcome::NotResolvable,
        }
    }

    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(data) => Some(data),
            Self::NotResolvable => None,
        }
    }
}

/// Envelope of every GraphQL response.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphQlErrorEntry {
    pub message: String,
}

/// Exact remaining quota and reset time from the out-of-band endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub limit: Option<u32>,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// `GET /rate_limit` response, reduced to the GraphQL resource.
#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResources {
    pub graphql: RateLimitResource,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResource {
    #[serde(default)]
    pub limit: Option<u32>,
    pub remaining: u32,
    /// Unix timestamp (seconds).
    pub reset: i64,
}

impl RateLimitResource {
    pub fn into_status(self) -> Option<QuotaStatus> {
        let reset_at = DateTime::from_timestamp(self.reset, 0)?;
        Some(QuotaStatus {
            limit: self.limit,
            remaining: self.remaining,
            reset_at,
        })
    }
}
