use std::error::Error;
use std::sync::Arc;

use relsync::Release;
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, print_rows};
use crate::commands::shared::{build_updater, describe_outcome};
use crate::config::Config;
use crate::progress::ProgressReporter;

#[derive(Debug, Serialize, Tabled)]
struct ReleaseRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Binaries")]
    binaries: usize,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

impl From<&Release> for ReleaseRow {
    fn from(release: &Release) -> Self {
        Self {
            id: release.id.to_string(),
            vendor: release.vendor.to_string(),
            name: release.release_name.clone(),
            binaries: release.binaries.len(),
            updated_at: release.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Queue a release for re-fetch and run one reconciliation that includes it.
pub(crate) async fn handle_refresh(
    name: &str,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn Error>> {
    let reporter = Arc::new(ProgressReporter::new());
    let updater = build_updater(config, database_url, Some(reporter.as_callback())).await?;

    let matches = updater.request_refresh(name);
    if matches.is_empty() {
        return Err(format!("no release named '{}' in the stored snapshot", name).into());
    }

    let rows: Vec<ReleaseRow> = matches.iter().map(ReleaseRow::from).collect();
    print_rows(&rows, OutputFormat::Table)?;

    let result = updater.run_reconcile().await;
    reporter.finish();

    println!("{}", describe_outcome(&result?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use relsync::model::{ReleaseType, VersionData};
    use relsync::{ReleaseId, Vendor};

    #[test]
    fn release_row_shows_identity_and_update_time() {
        let updated = Utc.with_ymd_and_hms(2024, 4, 16, 12, 30, 0).unwrap();
        let release = Release::new(
            ReleaseId::new("RE_kwDO"),
            ReleaseType::Ga,
            "https://example.invalid/release",
            "jdk-17.0.11+9",
            updated,
            updated,
            Vec::new(),
            Vendor::Eclipse,
            VersionData::parse_release_name("jdk-17.0.11+9").unwrap(),
        );

        let row = ReleaseRow::from(&release);
        assert_eq!(row.id, "RE_kwDO");
        assert_eq!(row.vendor, "eclipse");
        assert_eq!(row.name, "jdk-17.0.11+9");
        assert_eq!(row.binaries, 0);
        assert_eq!(row.updated_at, "2024-04-16 12:30:00 UTC");
    }
}
