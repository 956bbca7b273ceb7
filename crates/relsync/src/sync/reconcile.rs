//! Incremental reconciliation of a snapshot against upstream summaries.
//!
//! For every major version the previous releases are compared with a cheap
//! upstream summary. Releases that vanished upstream are dropped, and only
//! the releases that are new, updated, young, explicitly requested or whose
//! asset count changed are fetched in full. Everything else is kept as is.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::model::{FeatureRelease, ReleaseId, Snapshot};
use crate::short_error_message;
use crate::upstream::{ReleaseSource, SourceError, SummaryEntry, VersionSummary};

use super::error::{Result, SyncError};
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::quarantine::QuarantineSet;
use super::types::{ReconcileOptions, ReconcileOutcome, ReconcileStats, RefreshReason};

/// Result of reconciling one major version.
#[derive(Debug, Clone)]
pub struct VersionReconcile {
    pub feature_release: FeatureRelease,
    pub stats: ReconcileStats,
    /// Releases that failed to fetch or map, with the reason.
    pub quarantined: Vec<(ReleaseId, String)>,
}

/// Drop releases that are no longer listed upstream.
///
/// Releases read from a repository that did not resolve are kept: absence
/// of a repository says nothing about its releases. Returns the retained
/// releases, the number removed and the number kept for that reason.
#[must_use]
pub fn retain_listed(previous: &FeatureRelease, summary: &VersionSummary) -> (FeatureRelease, usize, usize) {
    let listed = summary.by_id();
    let unresolved = summary.unresolved_repos();

    let mut retained = previous.clone();
    let mut removed = 0;
    let mut kept_unresolved = 0;
    retained.retain(|release| {
        if listed.contains_key(&release.id) {
            return true;
        }
        if release
            .source_repository
            .as_ref()
            .is_some_and(|repo| unresolved.contains(repo))
        {
            kept_unresolved += 1;
            return true;
        }
        removed += 1;
        false
    });
    (retained, removed, kept_unresolved)
}

/// Decide which summary entries need a full re-fetch, and why.
///
/// Entries younger than the cool-down window are never fetched. Quarantined
/// ids are skipped unless their name was explicitly requested. The result is
/// ordered by id.
#[must_use]
pub fn plan_refresh(
    retained: &FeatureRelease,
    summary: &VersionSummary,
    quarantine: &QuarantineSet,
    explicit: &BTreeSet<String>,
    options: &ReconcileOptions,
) -> Vec<(ReleaseId, RefreshReason)> {
    let now = options.now();
    summary
        .by_id()
        .into_values()
        .filter_map(|entry| {
            refresh_reason(entry, retained, quarantine, explicit, options, now)
                .map(|reason| (entry.id.clone(), reason))
        })
        .collect()
}

fn refresh_reason(
    entry: &SummaryEntry,
    retained: &FeatureRelease,
    quarantine: &QuarantineSet,
    explicit: &BTreeSet<String>,
    options: &ReconcileOptions,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<RefreshReason> {
    if now - entry.published_at < options.cool_down {
        return None;
    }
    if quarantine.contains(&entry.id) {
        return None;
    }
    let requested = explicit.contains(&entry.name);

    let Some(existing) = retained.get(&entry.id) else {
        return Some(RefreshReason::New);
    };
    let young = now - entry.published_at < options.young_window
        || now - entry.updated_at < options.young_window;

    if entry.updated_at > existing.updated_at {
        Some(RefreshReason::Updated)
    } else if young {
        Some(RefreshReason::Young)
    } else if requested {
        Some(RefreshReason::Explicit)
    } else if entry.asset_count != existing.asset_count {
        Some(RefreshReason::BinaryCountChanged)
    } else {
        None
    }
}

/// Reconcile one major version against upstream.
///
/// Fetches run concurrently and never cancel each other. A release whose
/// fetch fails for release-specific reasons keeps its previous value and is
/// reported for quarantine; any other failure fails the version once every
/// sibling fetch has finished.
#[tracing::instrument(skip_all, fields(version = previous.version))]
pub async fn reconcile_version(
    source: Arc<dyn ReleaseSource>,
    previous: &FeatureRelease,
    quarantine: &QuarantineSet,
    explicit: &BTreeSet<String>,
    options: &ReconcileOptions,
) -> Result<VersionReconcile> {
    let version = previous.version;
    let summary = source
        .summary(version)
        .await
        .map_err(|e| SyncError::for_version(version, e))?;

    let (mut feature_release, removed, kept_unresolved) = retain_listed(previous, &summary);
    let plan = plan_refresh(&feature_release, &summary, quarantine, explicit, options);

    let mut stats = ReconcileStats {
        removed,
        kept_unresolved,
        ..ReconcileStats::default()
    };
    if kept_unresolved > 0 {
        tracing::info!(version, kept = kept_unresolved, "Keeping releases of unresolved repositories");
    }

    let pool = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (id, reason) in plan {
        let source = Arc::clone(&source);
        let pool = Arc::clone(&pool);
        tasks.spawn(async move {
            let Ok(_permit) = pool.acquire_owned().await else {
                return (id, reason, Err(SourceError::TaskPanicked("fetch pool closed".to_string())));
            };
            let result = source.release_by_id(&id).await;
            (id, reason, result)
        });
    }

    let mut quarantined = Vec::new();
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, reason, Ok(release))) => {
                tracing::debug!(version, release_id = %release.id, ?reason, "Re-fetched release");
                stats.record(reason);
                feature_release.upsert(release);
            }
            Ok((id, _, Err(e))) if e.is_quarantinable() => {
                tracing::warn!(
                    version,
                    release_id = %id,
                    error = %short_error_message(&e),
                    "Quarantining release"
                );
                quarantined.push((id, short_error_message(&e)));
            }
            Ok((id, _, Err(e))) => {
                tracing::warn!(
                    version,
                    release_id = %id,
                    error = %short_error_message(&e),
                    "Failed to fetch release"
                );
                first_error.get_or_insert(SyncError::for_version(version, e));
            }
            Err(e) => {
                tracing::error!(version, error = %e, "Release fetch task failed");
                first_error.get_or_insert(SyncError::TaskPanicked(e.to_string()));
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    quarantined.sort();
    stats.quarantined = quarantined.len();

    Ok(VersionReconcile {
        feature_release,
        stats,
        quarantined,
    })
}

/// Reconcile every version of `previous` concurrently.
///
/// The pass fails as a whole if any version fails; the caller then keeps
/// the previous snapshot. Ids quarantined by the versions that succeeded are
/// added to `quarantine` either way.
#[tracing::instrument(skip_all, fields(versions = previous.feature_releases.len()))]
pub async fn reconcile_snapshot(
    source: Arc<dyn ReleaseSource>,
    previous: &Snapshot,
    quarantine: &mut QuarantineSet,
    explicit: &BTreeSet<String>,
    options: &ReconcileOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<ReconcileOutcome> {
    let options = options.at(options.now());
    emit(
        on_progress,
        SyncProgress::ReconcileStarted {
            versions: previous.feature_releases.len(),
            pending_refresh: explicit.len(),
        },
    );

    let mut tasks = JoinSet::new();
    for feature in previous.feature_releases.values() {
        let source = Arc::clone(&source);
        let feature = feature.clone();
        let quarantine = quarantine.clone();
        let explicit = explicit.clone();
        tasks.spawn(async move {
            let version = feature.version;
            let result = reconcile_version(source, &feature, &quarantine, &explicit, &options).await;
            (version, result)
        });
    }

    let mut reconciled = Vec::new();
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(result))) => reconciled.push(result),
            Ok((version, Err(e))) => {
                emit(
                    on_progress,
                    SyncProgress::VersionFailed {
                        version,
                        error: short_error_message(&e),
                    },
                );
                first_error.get_or_insert(e);
            }
            Err(e) => {
                tracing::error!(error = %e, "Reconcile task failed");
                first_error.get_or_insert(SyncError::TaskPanicked(e.to_string()));
            }
        }
    }
    reconciled.sort_by_key(|r| r.feature_release.version);
    for result in &mut reconciled {
        let version = result.feature_release.version;
        for (id, reason) in std::mem::take(&mut result.quarantined) {
            emit(
                on_progress,
                SyncProgress::ReleaseQuarantined {
                    version,
                    release_id: id.to_string(),
                    reason,
                },
            );
            quarantine.insert(id);
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let mut snapshot = Snapshot::default();
    let mut stats = std::collections::BTreeMap::new();
    for result in reconciled {
        let version = result.feature_release.version;
        emit(
            on_progress,
            SyncProgress::VersionReconciled {
                version,
                removed: result.stats.removed,
                added: result.stats.added,
                refreshed: result.stats.refreshed(),
                quarantined: result.stats.quarantined,
            },
        );
        snapshot = snapshot.with_feature_release(result.feature_release);
        stats.insert(version, result.stats);
    }

    let changed = stats.values().map(ReconcileStats::changed).sum();
    emit(on_progress, SyncProgress::ReconcileComplete { changed });
    tracing::info!(changed, quarantined = quarantine.len(), "Reconciliation finished");

    Ok(ReconcileOutcome { snapshot, stats })
}
