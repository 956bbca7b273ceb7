use std::error::Error;

use chrono::{DateTime, Utc};
use relsync::graphql::{GraphQlClient, QuotaStatus};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, format_duration, print_rows};
use crate::config::Config;

/// Quota status formatted for display.
#[derive(Debug, Clone, Serialize, Tabled)]
struct QuotaDisplay {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
    #[tabled(rename = "Throttling")]
    throttling: String,
    #[tabled(rename = "Resets At")]
    reset_at: String,
    #[tabled(rename = "Resets In")]
    reset_in: String,
}

impl QuotaDisplay {
    fn new(status: &QuotaStatus, config: &Config, now: DateTime<Utc>) -> Self {
        let updater = &config.updater;
        let throttling = if status.remaining < updater.quota_hard_floor {
            "until reset"
        } else if status.remaining < updater.quota_soft_threshold {
            "scaled delay"
        } else {
            "no"
        };
        let reset_in = if status.reset_at > now {
            format_duration(status.reset_at - now)
        } else {
            "now".to_string()
        };

        Self {
            resource: "graphql".to_string(),
            limit: status
                .limit
                .map_or_else(|| "?".to_string(), |limit| limit.to_string()),
            remaining: status.remaining.to_string(),
            throttling: throttling.to_string(),
            reset_at: status.reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }
}

/// Show the remaining GraphQL quota.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let client = GraphQlClient::with_reqwest(config.client_settings())?;
    let status = client.fetch_quota_status().await?;
    print_rows(&[QuotaDisplay::new(&status, config, Utc::now())], output)?;
    Ok(())
}
