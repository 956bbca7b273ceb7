use std::collections::BTreeMap;
use std::error::Error;

use chrono::{DateTime, Utc};
use relsync::{DataStore, Release, SeaOrmStore, Snapshot, StoredChecksum, Vendor};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, format_duration, print_rows};
use crate::commands::shared::connect_or_exit;
use crate::config::Config;

/// Release counts for one vendor within one major version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
struct VersionRow {
    #[tabled(rename = "Version")]
    version: u32,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Releases")]
    releases: usize,
    #[tabled(rename = "Early access")]
    early_access: usize,
    #[tabled(rename = "Latest")]
    latest: String,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    checksum: Option<String>,
    structural_hash: Option<i64>,
    updated_at: Option<DateTime<Utc>>,
    releases: usize,
    versions: Vec<VersionRow>,
}

/// One row per (version, vendor); versions without releases get a single
/// placeholder row so that every tracked version shows up.
fn version_rows(snapshot: &Snapshot) -> Vec<VersionRow> {
    let mut rows = Vec::new();
    for (version, feature) in &snapshot.feature_releases {
        let mut by_vendor: BTreeMap<Vendor, Vec<&Release>> = BTreeMap::new();
        for release in feature.iter() {
            by_vendor.entry(release.vendor).or_default().push(release);
        }

        if by_vendor.is_empty() {
            rows.push(VersionRow {
                version: *version,
                vendor: "-".to_string(),
                releases: 0,
                early_access: 0,
                latest: "-".to_string(),
            });
            continue;
        }

        for (vendor, releases) in by_vendor {
            let latest = releases
                .iter()
                .max_by_key(|r| (r.timestamp, r.id.as_str()))
                .map_or_else(|| "-".to_string(), |r| r.release_name.clone());
            rows.push(VersionRow {
                version: *version,
                vendor: vendor.to_string(),
                releases: releases.len(),
                early_access: releases.iter().filter(|r| r.is_early_access()).count(),
                latest,
            });
        }
    }
    rows
}

fn describe_checksum(stored: Option<&StoredChecksum>, now: DateTime<Utc>) -> String {
    match stored {
        Some(stored) => format!(
            "Checksum: {} (structural {})\nUpdated:  {} ({} ago)",
            stored.token.checksum,
            stored.token.structural_hash,
            stored.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_duration(now - stored.updated_at)
        ),
        None => "Nothing committed yet".to_string(),
    }
}

/// Show the stored checksum and per-version release counts.
pub(crate) async fn handle_status(
    output: OutputFormat,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn Error>> {
    let store = SeaOrmStore::new(connect_or_exit(database_url).await);

    let stored = store.current_checksum().await?;
    let snapshot = store
        .load_snapshot()
        .await?
        .unwrap_or_default()
        .with_tracked_versions(&config.updater.tracked_versions);
    let rows = version_rows(&snapshot);

    match output {
        OutputFormat::Table => {
            println!("{}", describe_checksum(stored.as_ref(), Utc::now()));
            println!("Releases: {}", snapshot.release_count());
            print_rows(&rows, output)?;
        }
        OutputFormat::Json => {
            let report = StatusReport {
                checksum: stored.as_ref().map(|s| s.token.checksum.clone()),
                structural_hash: stored.as_ref().map(|s| s.token.structural_hash),
                updated_at: stored.as_ref().map(|s| s.updated_at),
                releases: snapshot.release_count(),
                versions: rows,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use relsync::model::{ReleaseType, VersionData};
    use relsync::{FeatureRelease, HashToken, ReleaseId};

    fn release(id: &str, name: &str, vendor: Vendor, days: i64) -> Release {
        let published = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(days);
        let release_type = if name.contains("-ea") {
            ReleaseType::Ea
        } else {
            ReleaseType::Ga
        };
        Release::new(
            ReleaseId::new(id),
            release_type,
            "https://example.invalid",
            name,
            published,
            published,
            Vec::new(),
            vendor,
            VersionData::parse_release_name(name).unwrap(),
        )
    }

    #[test]
    fn version_rows_group_by_vendor_and_keep_empty_versions() {
        let snapshot = Snapshot::from_feature_releases([
            FeatureRelease::from_releases(
                17,
                [
                    release("1", "jdk-17.0.1+12", Vendor::Eclipse, 0),
                    release("2", "jdk-17.0.2+8", Vendor::Eclipse, 30),
                    release("3", "jdk-17.0.2+8", Vendor::Ibm, 31),
                ],
            ),
            FeatureRelease::new(21),
        ]);

        let rows = version_rows(&snapshot);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].vendor, "eclipse");
        assert_eq!(rows[0].releases, 2);
        assert_eq!(rows[0].latest, "jdk-17.0.2+8");
        assert_eq!(rows[1].vendor, "ibm");
        assert_eq!(rows[2].version, 21);
        assert_eq!(rows[2].releases, 0);
    }

    #[test]
    fn describe_checksum_reports_age() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let stored = StoredChecksum {
            token: HashToken {
                checksum: "abc=".to_string(),
                structural_hash: 42,
            },
            updated_at: now - Duration::minutes(90),
        };

        let text = describe_checksum(Some(&stored), now);
        assert!(text.contains("abc="));
        assert!(text.contains("structural 42"));
        assert!(text.contains("1h 30m ago"));

        assert_eq!(describe_checksum(None, now), "Nothing committed yet");
    }
}
