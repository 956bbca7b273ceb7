//! Full synchronization: rebuild the snapshot from complete upstream detail.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::model::{FeatureRelease, Release, Snapshot};
use crate::short_error_message;
use crate::upstream::{ReleaseFilter, ReleaseSource, VersionDetail};

use super::error::{Result, SyncError};
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::quarantine::QuarantineSet;
use super::types::FullSyncOutcome;

/// Fetch every tracked version in full and assemble a fresh snapshot.
///
/// The quarantine is cleared first and refilled with the releases that fail
/// to map. Releases of `previous` that this fetch did not cover (filtered
/// out, from a repository that did not resolve, or failing to map) are
/// copied over so a full sync never drops data it did not re-read.
#[tracing::instrument(skip_all, fields(filter = ?filter.filter_type))]
pub async fn full_sync(
    source: Arc<dyn ReleaseSource>,
    previous: &Snapshot,
    filter: &ReleaseFilter,
    tracked_versions: &[u32],
    quarantine: &mut QuarantineSet,
    on_progress: Option<&ProgressCallback>,
) -> Result<FullSyncOutcome> {
    quarantine.clear();
    emit(
        on_progress,
        SyncProgress::FullSyncStarted {
            filter: filter.filter_type,
            versions: tracked_versions.len(),
        },
    );

    let mut tasks = JoinSet::new();
    for &version in tracked_versions {
        let source = Arc::clone(&source);
        let filter = filter.clone();
        tasks.spawn(async move { (version, source.detail(version, &filter).await) });
    }

    let mut details = Vec::new();
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((version, Ok(detail))) => {
                emit(
                    on_progress,
                    SyncProgress::VersionFetched {
                        version,
                        releases: detail.releases().count(),
                        unmapped: detail.unmapped.len(),
                    },
                );
                quarantine.extend(detail.unmapped.iter().cloned());
                details.push(detail);
            }
            Ok((version, Err(e))) => {
                tracing::warn!(version, error = %short_error_message(&e), "Failed to fetch version");
                emit(
                    on_progress,
                    SyncProgress::VersionFailed {
                        version,
                        error: short_error_message(&e),
                    },
                );
                first_error.get_or_insert(SyncError::for_version(version, e));
            }
            Err(e) => {
                tracing::error!(error = %e, "Full sync task failed");
                first_error.get_or_insert(SyncError::TaskPanicked(e.to_string()));
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    details.sort_by_key(|d| d.version);

    let mut snapshot = Snapshot::default();
    let mut uncovered = Vec::new();
    let mut fetched = 0;
    let mut unmapped = 0;
    for detail in details {
        let version = detail.version;
        if let Some(old) = previous.feature_release(version) {
            uncovered.push((version, not_covered(old, &detail, filter)));
        }
        unmapped += detail.unmapped.len();

        let releases = detail.into_releases();
        fetched += releases.len();
        snapshot.add_missing(version, releases);
    }
    snapshot = snapshot.with_tracked_versions(tracked_versions);

    let mut copied = 0;
    for (version, releases) in uncovered {
        let count = snapshot.add_missing(version, releases);
        if count > 0 {
            tracing::debug!(version, count, "Copied releases from previous snapshot");
            emit(on_progress, SyncProgress::CopiedOver { version, count });
        }
        copied += count;
    }

    emit(
        on_progress,
        SyncProgress::FullSyncComplete {
            releases: snapshot.release_count(),
        },
    );
    tracing::info!(fetched, copied, unmapped, "Full sync finished");

    Ok(FullSyncOutcome {
        snapshot,
        fetched,
        copied,
        unmapped,
    })
}

/// Releases of `old` that the fetch behind `detail` did not re-read.
fn not_covered(old: &FeatureRelease, detail: &VersionDetail, filter: &ReleaseFilter) -> Vec<Release> {
    let unresolved: BTreeSet<String> = detail
        .repos
        .iter()
        .filter(|(_, listing)| listing.is_not_found())
        .map(|(repo, _)| repo.full_name())
        .collect();

    old.iter()
        .filter(|release| {
            !filter.includes_release(release)
                || detail.unmapped.contains(&release.id)
                || release
                    .source_repository
                    .as_ref()
                    .is_some_and(|repo| unresolved.contains(repo))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReleaseId, ReleaseType, Vendor, fixtures::release};
    use crate::upstream::{ReleaseFilterType, RepoListing, UpstreamRepo};
    use chrono::{Duration, Utc};

    fn temurin() -> UpstreamRepo {
        UpstreamRepo::new("adoptium", "temurin17-binaries", Vendor::Eclipse)
    }

    #[test]
    fn not_covered_selects_filtered_unresolved_and_unmapped_releases() {
        let now = Utc::now();
        let mut ea = release("ea", "jdk-17.0.3+1", Vendor::Eclipse, now);
        ea.release_type = ReleaseType::Ea;
        let old = FeatureRelease::from_releases(
            17,
            [
                release("adopt", "jdk-17.0.1+1", Vendor::Adoptopenjdk, now),
                release("kept", "jdk-17.0.2+1", Vendor::Eclipse, now)
                    .with_upstream("AdoptOpenJDK/semeru17-binaries", 1),
                release("broken", "jdk-17.0.4+1", Vendor::Eclipse, now),
                release("plain", "jdk-17.0.5+1", Vendor::Eclipse, now),
                ea,
            ],
        );
        let detail = VersionDetail {
            version: 17,
            repos: vec![
                (temurin(), RepoListing::EmptyOk),
                (
                    UpstreamRepo::new("AdoptOpenJDK", "semeru17-binaries", Vendor::Ibm),
                    RepoListing::NotFound,
                ),
            ],
            unmapped: vec![ReleaseId::new("broken")],
        };
        let filter = ReleaseFilter::new(ReleaseFilterType::ReleasesOnly, [Vendor::Adoptopenjdk]).at(now);

        let mut ids: Vec<String> = not_covered(&old, &detail, &filter)
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        ids.sort();

        assert_eq!(ids, vec!["adopt", "broken", "ea", "kept"]);
    }

    #[test]
    fn stale_prerelease_is_not_covered_by_all_filter() {
        let now = Utc::now();
        let mut ea = release("old-ea", "jdk-17.0.3+1", Vendor::Eclipse, now - Duration::days(120));
        ea.release_type = ReleaseType::Ea;
        let old = FeatureRelease::from_releases(17, [ea]);
        let detail = VersionDetail {
            version: 17,
            repos: vec![(temurin(), RepoListing::EmptyOk)],
            unmapped: vec![],
        };
        let filter = ReleaseFilter::new(ReleaseFilterType::All, []).at(now);

        assert_eq!(not_covered(&old, &detail, &filter).len(), 1);
    }
}
