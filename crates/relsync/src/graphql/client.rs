//! Rate-limited GraphQL client.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::http::{HttpRequest, HttpTransport};
use crate::retry::{RetryPolicy, with_retry};

use super::error::{GraphQlError, NOT_RESOLVABLE_MARKER, Result};
use crate::short_error_message;
use super::pacing::{ApiRateLimiter, DEFAULT_REQUESTS_PER_SECOND};
use super::throttle::QuotaThrottle;
use super::types::{
    GraphQlResponse, Page, PageInfo, QueryOutcome, QuotaStatus, RateLimit, RateLimitResponse,
};

pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const GITHUB_RATE_LIMIT_URL: &str = "https://api.github.com/rate_limit";

/// Seconds to back off when the quota endpoint cannot be read.
const QUOTA_FALLBACK_RESET_SECS: i64 = 100;

/// Name of the cursor variable every paginated query declares.
pub const CURSOR_VARIABLE: &str = "cursor";

/// Connection and policy settings for [`GraphQlClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub graphql_url: String,
    pub rate_limit_url: String,
    pub token: Option<String>,
    pub throttle: QuotaThrottle,
    pub retry: RetryPolicy,
    /// Client-side pacing; 0 disables it.
    pub requests_per_second: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            graphql_url: GITHUB_GRAPHQL_URL.to_string(),
            rate_limit_url: GITHUB_RATE_LIMIT_URL.to_string(),
            token: None,
            throttle: QuotaThrottle::default(),
            retry: RetryPolicy::default(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

/// What a single successful HTTP exchange produced.
enum Exchange {
    Data(Value),
    NotResolvable,
}

/// GraphQL client that paginates, self-throttles and retries.
#[derive(Clone)]
pub struct GraphQlClient {
    transport: Arc<dyn HttpTransport>,
    settings: ClientSettings,
    pacer: Option<ApiRateLimiter>,
}

impl GraphQlClient {
    pub fn new(transport: Arc<dyn HttpTransport>, settings: ClientSettings) -> Self {
        let pacer = ApiRateLimiter::new(settings.requests_per_second);
        Self {
            transport,
            settings,
            pacer,
        }
    }

    /// Client backed by reqwest with a 60 second request timeout.
    #[cfg(feature = "github")]
    pub fn with_reqwest(settings: ClientSettings) -> std::result::Result<Self, crate::http::HttpError> {
        let transport = crate::http::reqwest_transport::ReqwestTransport::with_timeout(
            std::time::Duration::from_secs(60),
        )?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if let Some(token) = &self.settings.token {
            headers.push(("Authorization".to_string(), format!("bearer {token}")));
        }
        headers
    }

    async fn send_once(&self, body: &[u8]) -> Result<Exchange> {
        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }

        let request = HttpRequest::post(&self.settings.graphql_url, self.headers(), body.to_vec());
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(GraphQlError::Status {
                status: response.status,
                message: response.body_excerpt(),
            });
        }

        let parsed: GraphQlResponse = serde_json::from_slice(&response.body)
            .map_err(|e| GraphQlError::Decode(e.to_string()))?;

        if !parsed.errors.is_empty() {
            if parsed
                .errors
                .iter()
                .any(|e| e.message.contains(NOT_RESOLVABLE_MARKER))
            {
                return Ok(Exchange::NotResolvable);
            }
            return Err(GraphQlError::Query {
                messages: parsed.errors.into_iter().map(|e| e.message).collect(),
            });
        }

        match parsed.data {
            Some(Value::Null) | None => Err(GraphQlError::MissingData),
            Some(data) => Ok(Exchange::Data(data)),
        }
    }

    /// Issue one query and return its data with the reported quota.
    ///
    /// Transient failures are retried with linear backoff; once the attempt
    /// budget is spent the query fails with [`GraphQlError::RetryExhausted`].
    /// If the reported quota is below the soft threshold this waits for it to
    /// recover before returning, so the caller's next query is not blocked.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<QueryOutcome<Page<T>>> {
        let body = json!({ "query": query, "variables": variables }).to_string();
        let policy = self.settings.retry;

        let exchange = with_retry(
            || self.send_once(body.as_bytes()),
            policy,
            GraphQlError::is_retryable,
            short_error_message,
            "graphql",
        )
        .await;

        let data = match exchange {
            Ok(Exchange::Data(data)) => data,
            Ok(Exchange::NotResolvable) => return Ok(QueryOutcome::NotResolvable),
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    attempts = policy.max_attempts,
                    error = %short_error_message(&e),
                    "Upstream query hit retry limit"
                );
                return Err(GraphQlError::RetryExhausted {
                    attempts: policy.max_attempts,
                    last: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let rate_limit = data
            .get("rateLimit")
            .and_then(|v| serde_json::from_value::<RateLimit>(v.clone()).ok());
        let decoded: T =
            serde_json::from_value(data).map_err(|e| GraphQlError::Decode(e.to_string()))?;

        if let Some(rate_limit) = rate_limit {
            self.throttle_if_needed(rate_limit).await;
        }

        Ok(QueryOutcome::Data(Page {
            data: decoded,
            rate_limit,
        }))
    }

    /// Issue a paginated query with the given cursor.
    pub async fn query_page<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &Value,
        cursor: Option<&str>,
    ) -> Result<QueryOutcome<Page<T>>> {
        self.query(query, with_cursor(variables, cursor)).await
    }

    /// Follow a cursor-based connection to the end, concatenating pages.
    ///
    /// `extract` pulls the items and page info out of one page; returning
    /// `None` means the connection is absent (e.g. a null repository).
    pub async fn query_all<P, I, F>(
        &self,
        query: &str,
        variables: Value,
        mut extract: F,
    ) -> Result<QueryOutcome<Vec<I>>>
    where
        P: DeserializeOwned,
        F: FnMut(P) -> Option<(Vec<I>, PageInfo)>,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut first = true;

        loop {
            let page = match self
                .query_page::<P>(query, &variables, cursor.as_deref())
                .await?
            {
                QueryOutcome::Data(page) => page,
                QueryOutcome::NotResolvable if first => return Ok(QueryOutcome::NotResolvable),
                QueryOutcome::NotResolvable => break,
            };
            first = false;

            let Some((mut page_items, page_info)) = extract(page.data) else {
                if items.is_empty() {
                    return Ok(QueryOutcome::NotResolvable);
                }
                break;
            };
            items.append(&mut page_items);

            match page_info.end_cursor {
                Some(next) if page_info.has_next_page && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                Some(_) if page_info.has_next_page => {
                    tracing::warn!("Upstream returned the same cursor twice, stopping pagination");
                    break;
                }
                _ => break,
            }
        }

        Ok(QueryOutcome::Data(items))
    }

    async fn throttle_if_needed(&self, rate_limit: RateLimit) {
        if !self.settings.throttle.needs_throttle(rate_limit.remaining) {
            return;
        }
        tracing::debug!(
            remaining = rate_limit.remaining,
            cost = rate_limit.cost,
            "Quota below soft threshold"
        );
        self.settings
            .throttle
            .wait_for_quota(|| self.quota_status())
            .await;
    }

    /// Read the exact remaining quota from the out-of-band endpoint.
    ///
    /// Failures read as an empty quota resetting shortly, so callers back off
    /// rather than hammering a struggling upstream.
    pub async fn quota_status(&self) -> QuotaStatus {
        match self.fetch_quota_status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(error = %short_error_message(&e), "Failed to read remaining quota");
                QuotaStatus {
                    limit: None,
                    remaining: 0,
                    reset_at: Utc::now() + chrono::Duration::seconds(QUOTA_FALLBACK_RESET_SECS),
                }
            }
        }
    }

    /// Read the quota, surfacing failures.
    pub async fn fetch_quota_status(&self) -> Result<QuotaStatus> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = &self.settings.token {
            headers.push(("Authorization".to_string(), format!("bearer {token}")));
        }
        let response = self
            .transport
            .send(HttpRequest::get(&self.settings.rate_limit_url, headers))
            .await?;
        if !response.is_success() {
            return Err(GraphQlError::Status {
                status: response.status,
                message: response.body_excerpt(),
            });
        }
        let parsed: RateLimitResponse = serde_json::from_slice(&response.body)
            .map_err(|e| GraphQlError::Decode(e.to_string()))?;
        parsed
            .resources
            .graphql
            .into_status()
            .ok_or_else(|| GraphQlError::Decode("invalid reset timestamp".to_string()))
    }
}

fn with_cursor(variables: &Value, cursor: Option<&str>) -> Value {
    let mut variables = match variables {
        Value::Object(map) => Value::Object(map.clone()),
        _ => Value::Object(serde_json::Map::new()),
    };
    if let Value::Object(map) = &mut variables {
        map.insert(
            CURSOR_VARIABLE.to_string(),
            cursor.map_or(Value::Null, |c| Value::String(c.to_string())),
        );
    }
    variables
}
