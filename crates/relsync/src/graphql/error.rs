//! GraphQL client error types.

use thiserror::Error;

use crate::http::HttpError;

/// HTTP statuses the upstream returns for temporary bans and overload.
pub const RETRYABLE_STATUSES: [u16; 4] = [403, 502, 503, 504];

/// Substring of the GraphQL error returned for a repository that does not exist.
pub const NOT_RESOLVABLE_MARKER: &str = "Could not resolve to a Repository";

/// Errors that can occur when querying the upstream GraphQL API.
#[derive(Debug, Error)]
pub enum GraphQlError {
    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("GraphQL query failed: {}", messages.join("; "))]
    Query { messages: Vec<String> },

    #[error("no data returned for query")]
    MissingData,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("upstream query hit retry limit after {attempts} attempts: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

impl GraphQlError {
    /// Whether the error is transient and the query should be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
            Self::Query { .. } => true,
            _ => false,
        }
    }
}

/// Result type for GraphQL operations.
pub type Result<T> = std::result::Result<T, GraphQlError>;
