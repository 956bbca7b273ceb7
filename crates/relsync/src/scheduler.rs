//! Periodic updater: full sync once a day, reconciliation every few minutes.
//!
//! The [`Updater`] owns the committed snapshot and publishes it through a
//! watch channel, so readers ([`SnapshotHandle`]) always see the last commit
//! and never a candidate. Two jobs run on their own tasks:
//!
//! - full sync: after the initial delay, then every `full_sync_period`, a
//!   releases-only phase followed by an all-releases phase, each committed
//! - reconcile: starts after the first full-sync phase, then every
//!   `reconcile_period`, or early when a refresh is requested
//!
//! A failed pass is logged and the previous snapshot stays published.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::coordinator::{CommitOutcome, CommittedSnapshot, PersistenceCoordinator};
use crate::model::{Release, Snapshot};
use crate::short_error_message;
use crate::store::DataStore;
use crate::sync::{
    ProgressCallback, QuarantineSet, Result, UpdaterSettings, full_sync, reconcile_snapshot,
};
use crate::upstream::{ReleaseFilterType, ReleaseSource};

/// Read-only access to the committed snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    rx: watch::Receiver<CommittedSnapshot>,
}

impl SnapshotHandle {
    /// The last committed snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.rx.borrow().snapshot)
    }

    /// The last committed snapshot with its store token.
    #[must_use]
    pub fn committed(&self) -> CommittedSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait until a new snapshot is published.
    ///
    /// Returns `false` once the updater is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

struct Inner {
    source: Arc<dyn ReleaseSource>,
    coordinator: PersistenceCoordinator,
    settings: UpdaterSettings,
    published: watch::Sender<CommittedSnapshot>,
    quarantine: Mutex<QuarantineSet>,
    pending_refresh: Mutex<BTreeSet<String>>,
    refresh_requested: Notify,
    first_phase_done: Notify,
    on_progress: Option<ProgressCallback>,
}

/// Runs sync passes and publishes their commits.
#[derive(Clone)]
pub struct Updater {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Updater {
    /// Load the stored snapshot and build an updater around it.
    ///
    /// A load failure starts from an empty snapshot.
    pub async fn new(
        source: Arc<dyn ReleaseSource>,
        store: Arc<dyn DataStore>,
        settings: UpdaterSettings,
        on_progress: Option<ProgressCallback>,
    ) -> Self {
        let coordinator = PersistenceCoordinator::new(store);
        let initial = coordinator.load_or_empty(&settings.tracked_versions).await;
        tracing::info!(
            releases = initial.snapshot.release_count(),
            versions = initial.snapshot.feature_releases.len(),
            "Loaded snapshot"
        );
        let (published, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                source,
                coordinator,
                settings,
                published,
                quarantine: Mutex::new(QuarantineSet::new()),
                pending_refresh: Mutex::new(BTreeSet::new()),
                refresh_requested: Notify::new(),
                first_phase_done: Notify::new(),
                on_progress,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &UpdaterSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle {
            rx: self.inner.published.subscribe(),
        }
    }

    /// The last committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.published.borrow().snapshot)
    }

    fn committed(&self) -> CommittedSnapshot {
        self.inner.published.borrow().clone()
    }

    fn publish(&self, outcome: &CommitOutcome) {
        if !matches!(outcome, CommitOutcome::Unchanged(_)) {
            self.inner.published.send_replace(outcome.committed().clone());
        }
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.inner.on_progress.as_ref()
    }

    /// Run one full sync with `filter_type` and commit it.
    ///
    /// The quarantine is cleared first, whether or not the sync succeeds.
    pub async fn run_full_sync(&self, filter_type: ReleaseFilterType) -> Result<CommitOutcome> {
        let settings = &self.inner.settings;
        let previous = self.committed();
        lock(&self.inner.quarantine).clear();
        let mut quarantine = QuarantineSet::new();

        let synced = full_sync(
            Arc::clone(&self.inner.source),
            &previous.snapshot,
            &settings.release_filter(filter_type),
            &settings.tracked_versions,
            &mut quarantine,
            self.progress(),
        )
        .await;
        lock(&self.inner.quarantine).extend(quarantine.iter().cloned());
        let outcome = synced?;

        let commit = self
            .inner
            .coordinator
            .commit(outcome.snapshot, &previous, self.progress())
            .await?;
        self.publish(&commit);
        Ok(commit)
    }

    /// The daily job: a releases-only full sync, then an all-releases one.
    ///
    /// The reconcile job is released after the first phase, whether or not it
    /// succeeded.
    pub async fn run_daily_full_sync(&self) -> Result<()> {
        let first = self.run_full_sync(ReleaseFilterType::ReleasesOnly).await;
        self.inner.first_phase_done.notify_one();
        first?;
        self.run_full_sync(ReleaseFilterType::All).await?;
        Ok(())
    }

    /// Run one reconciliation pass and commit it.
    ///
    /// Release names queued by [`Updater::request_refresh`] are consumed; they
    /// are queued again if the pass fails.
    pub async fn run_reconcile(&self) -> Result<CommitOutcome> {
        let previous = self.committed();
        let explicit = std::mem::take(&mut *lock(&self.inner.pending_refresh));
        let known = lock(&self.inner.quarantine).clone();
        let mut quarantine = known.clone();

        let reconciled = reconcile_snapshot(
            Arc::clone(&self.inner.source),
            &previous.snapshot,
            &mut quarantine,
            &explicit,
            &self.inner.settings.reconcile_options(),
            self.progress(),
        )
        .await;
        // Only this pass's additions: a full sync may have cleared the set meanwhile.
        lock(&self.inner.quarantine).extend(
            quarantine
                .iter()
                .filter(|id| !known.contains(id))
                .cloned(),
        );
        let outcome = match reconciled {
            Ok(outcome) => outcome,
            Err(e) => {
                lock(&self.inner.pending_refresh).extend(explicit);
                return Err(e);
            }
        };

        let commit = self
            .inner
            .coordinator
            .commit(outcome.snapshot, &previous, self.progress())
            .await?;
        self.publish(&commit);
        Ok(commit)
    }

    /// Queue every release named `name` for re-fetch on the next reconcile.
    ///
    /// Returns the matching releases of the current snapshot. Nothing is
    /// queued when there are none.
    pub fn request_refresh(&self, name: &str) -> Vec<Release> {
        let matches: Vec<Release> = self
            .snapshot()
            .find_by_name(name)
            .into_iter()
            .cloned()
            .collect();
        if matches.is_empty() {
            tracing::info!(name, "No release to refresh");
            return matches;
        }

        lock(&self.inner.pending_refresh).insert(name.to_string());
        self.inner.refresh_requested.notify_one();
        tracing::info!(name, releases = matches.len(), "Queued release refresh");
        matches
    }

    /// Run both jobs until `shutdown` resolves.
    ///
    /// Returns immediately when the updater is disabled.
    pub async fn run(&self, shutdown: impl Future<Output = ()> + Send) {
        if self.inner.settings.disable_updater {
            tracing::info!("Updater disabled");
            return;
        }

        let mut jobs = JoinSet::new();
        jobs.spawn(self.clone().full_sync_job());
        jobs.spawn(self.clone().reconcile_job());

        tokio::select! {
            () = shutdown => tracing::info!("Stopping updater"),
            Some(joined) = jobs.join_next() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Updater job stopped");
                }
            }
        }
        jobs.shutdown().await;
    }

    async fn full_sync_job(self) {
        let settings = &self.inner.settings;
        let mut ticker = interval_at(
            Instant::now() + settings.full_sync_initial_delay(),
            settings.full_sync_period(),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            tracing::info!("Starting daily full sync");
            if let Err(e) = self.run_daily_full_sync().await {
                tracing::error!(error = %short_error_message(&e), "Full sync failed, keeping previous snapshot");
            }
        }
    }

    async fn reconcile_job(self) {
        self.inner.first_phase_done.notified().await;

        let settings = &self.inner.settings;
        let mut ticker = interval_at(
            Instant::now() + settings.reconcile_initial_delay(),
            settings.reconcile_period(),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.inner.refresh_requested.notified() => {
                    tracing::debug!("Reconcile woken by refresh request");
                }
            }
            if let Err(e) = self.run_reconcile().await {
                tracing::error!(error = %short_error_message(&e), "Reconcile failed, keeping previous snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::hash_snapshot;
    use crate::graphql::GraphQlError;
    use crate::model::{FeatureRelease, ReleaseId, Vendor, fixtures::release};
    use crate::store::MemoryStore;
    use crate::upstream::{
        ReleaseFilter, RepoListing, SourceError, SummaryEntry, UpstreamRepo, VersionDetail,
        VersionSummary,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn repo() -> UpstreamRepo {
        UpstreamRepo::new("adoptium", "temurin17-binaries", Vendor::Eclipse)
    }

    /// Upstream holding a fixed set of old releases under version 17.
    ///
    /// `missing` releases are listed in the summary but cannot be fetched.
    /// With `fail_summaries`, every version other than 17 fails to list.
    #[derive(Default)]
    struct StaticSource {
        releases: Vec<Release>,
        missing: Vec<Release>,
        fail: bool,
        fail_summaries: bool,
        details: AtomicUsize,
        summaries: AtomicUsize,
        by_id: AtomicUsize,
    }

    #[async_trait]
    impl ReleaseSource for StaticSource {
        async fn summary(&self, version: u32) -> crate::upstream::source::Result<VersionSummary> {
            self.summaries.fetch_add(1, Ordering::SeqCst);
            if self.fail_summaries && version != 17 {
                return Err(SourceError::upstream(
                    format!("summary of {version}"),
                    GraphQlError::MissingData,
                ));
            }
            let entries = if version == 17 {
                self.releases
                    .iter()
                    .chain(&self.missing)
                    .map(|r| SummaryEntry {
                        id: r.id.clone(),
                        name: r.release_name.clone(),
                        published_at: r.updated_at,
                        updated_at: r.updated_at,
                        is_prerelease: false,
                        asset_count: r.asset_count,
                    })
                    .collect()
            } else {
                Vec::new()
            };
            Ok(VersionSummary::new(
                version,
                vec![(repo(), RepoListing::from_items(entries))],
            ))
        }

        async fn detail(
            &self,
            version: u32,
            _filter: &ReleaseFilter,
        ) -> crate::upstream::source::Result<VersionDetail> {
            self.details.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Missing(ReleaseId::new("quota")));
            }
            let releases = if version == 17 { self.releases.clone() } else { Vec::new() };
            Ok(VersionDetail {
                version,
                repos: vec![(repo(), RepoListing::from_items(releases))],
                unmapped: Vec::new(),
            })
        }

        async fn release_by_id(&self, id: &ReleaseId) -> crate::upstream::source::Result<Release> {
            self.by_id.fetch_add(1, Ordering::SeqCst);
            self.releases
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .ok_or_else(|| SourceError::Missing(id.clone()))
        }
    }

    fn settings() -> UpdaterSettings {
        UpdaterSettings {
            tracked_versions: vec![17],
            ..UpdaterSettings::default()
        }
    }

    fn releases() -> Vec<Release> {
        vec![
            release("1", "jdk-17.0.1+12", Vendor::Eclipse, t0()),
            release("2", "jdk-17.0.2+8", Vendor::Eclipse, t0()),
        ]
    }

    async fn updater(source: Arc<StaticSource>, store: Arc<MemoryStore>) -> Updater {
        Updater::new(source, store, settings(), None).await
    }

    #[tokio::test]
    async fn full_sync_commits_and_publishes() {
        let source = Arc::new(StaticSource {
            releases: releases(),
            ..StaticSource::default()
        });
        let store = Arc::new(MemoryStore::new());
        let updater = updater(source, store.clone()).await;
        let handle = updater.handle();

        let outcome = updater
            .run_full_sync(ReleaseFilterType::ReleasesOnly)
            .await
            .unwrap();

        assert!(outcome.wrote_candidate());
        assert_eq!(handle.current().release_count(), 2);
        assert_eq!(
            store.current_checksum().await.unwrap().map(|s| s.token),
            Some(hash_snapshot(&handle.current()).unwrap())
        );
    }

    #[tokio::test]
    async fn failed_full_sync_keeps_previous_snapshot() {
        let seeded = Snapshot::from_feature_releases([FeatureRelease::from_releases(17, releases())]);
        let token = hash_snapshot(&seeded).unwrap();
        let store = Arc::new(MemoryStore::with_snapshot(seeded.clone(), token));
        let source = Arc::new(StaticSource {
            fail: true,
            ..StaticSource::default()
        });
        let updater = updater(source, store).await;

        assert!(updater.run_full_sync(ReleaseFilterType::All).await.is_err());
        assert_eq!(*updater.snapshot(), seeded);
    }

    #[tokio::test(start_paused = true)]
    async fn full_sync_clears_quarantine_even_when_it_fails() {
        let source = Arc::new(StaticSource {
            fail: true,
            ..StaticSource::default()
        });
        let updater = updater(source, Arc::new(MemoryStore::new())).await;
        lock(&updater.inner.quarantine).insert(ReleaseId::new("stale"));

        assert!(updater.run_full_sync(ReleaseFilterType::ReleasesOnly).await.is_err());
        assert!(lock(&updater.inner.quarantine).is_empty());
    }

    #[tokio::test]
    async fn failed_reconcile_keeps_ids_it_quarantined() {
        let seeded = Snapshot::from_feature_releases([
            FeatureRelease::from_releases(17, releases()),
            FeatureRelease::new(21),
        ]);
        let token = hash_snapshot(&seeded).unwrap();
        let store = Arc::new(MemoryStore::with_snapshot(seeded.clone(), token));
        let source = Arc::new(StaticSource {
            releases: releases(),
            missing: vec![release("3", "jdk-17.0.3+7", Vendor::Eclipse, t0())],
            fail_summaries: true,
            ..StaticSource::default()
        });
        let updater = updater(source.clone(), store).await;

        assert!(updater.run_reconcile().await.is_err());
        assert_eq!(*updater.snapshot(), seeded);
        assert!(lock(&updater.inner.quarantine).contains(&ReleaseId::new("3")));

        updater.run_reconcile().await.unwrap_err();
        assert_eq!(source.by_id.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reconcile_matching_upstream_is_unchanged() {
        let seeded = Snapshot::from_feature_releases([FeatureRelease::from_releases(17, releases())]);
        let token = hash_snapshot(&seeded).unwrap();
        let store = Arc::new(MemoryStore::with_snapshot(seeded, token));
        let source = Arc::new(StaticSource {
            releases: releases(),
            ..StaticSource::default()
        });
        let updater = updater(source.clone(), store).await;

        let outcome = updater.run_reconcile().await.unwrap();

        assert!(matches!(outcome, CommitOutcome::Unchanged(_)));
        assert_eq!(source.by_id.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_request_is_consumed_by_next_reconcile() {
        let seeded = Snapshot::from_feature_releases([FeatureRelease::from_releases(17, releases())]);
        let token = hash_snapshot(&seeded).unwrap();
        let store = Arc::new(MemoryStore::with_snapshot(seeded, token));
        let source = Arc::new(StaticSource {
            releases: releases(),
            ..StaticSource::default()
        });
        let updater = updater(source.clone(), store).await;

        assert!(updater.request_refresh("jdk-99").is_empty());
        let matched = updater.request_refresh("jdk-17.0.2+8");
        assert_eq!(matched.len(), 1);

        updater.run_reconcile().await.unwrap();
        assert_eq!(source.by_id.load(Ordering::SeqCst), 1);

        updater.run_reconcile().await.unwrap();
        assert_eq!(source.by_id.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_updater_returns_immediately() {
        let source = Arc::new(StaticSource::default());
        let updater = Updater::new(
            source.clone(),
            Arc::new(MemoryStore::new()),
            UpdaterSettings {
                disable_updater: true,
                ..settings()
            },
            None,
        )
        .await;

        updater.run(std::future::pending()).await;

        assert_eq!(source.details.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_follow_their_schedule() {
        let source = Arc::new(StaticSource {
            releases: releases(),
            ..StaticSource::default()
        });
        let updater = updater(source.clone(), Arc::new(MemoryStore::new())).await;

        let runner = updater.clone();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            runner
                .run(async {
                    let _ = stop_rx.await;
                })
                .await;
        });

        tokio::time::sleep(StdDuration::from_secs(30)).await;
        assert_eq!(source.details.load(Ordering::SeqCst), 0);

        // First daily run at one minute: two phases, one version each.
        tokio::time::sleep(StdDuration::from_secs(45)).await;
        assert_eq!(source.details.load(Ordering::SeqCst), 2);
        assert_eq!(source.summaries.load(Ordering::SeqCst), 0);

        // First reconcile one minute after the first phase.
        tokio::time::sleep(StdDuration::from_secs(60)).await;
        assert_eq!(source.summaries.load(Ordering::SeqCst), 1);

        tokio::time::sleep(StdDuration::from_secs(6 * 60)).await;
        assert_eq!(source.summaries.load(Ordering::SeqCst), 2);

        let _ = stop_tx.send(());
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_request_wakes_reconcile_early() {
        let source = Arc::new(StaticSource {
            releases: releases(),
            ..StaticSource::default()
        });
        let updater = Updater::new(
            source.clone(),
            Arc::new(MemoryStore::new()),
            UpdaterSettings {
                instant_full_sync: true,
                ..settings()
            },
            None,
        )
        .await;

        let runner = updater.clone();
        let task = tokio::spawn(async move { runner.run(std::future::pending()).await });

        // Full sync at t=0, first reconcile at one minute.
        tokio::time::sleep(StdDuration::from_secs(90)).await;
        assert_eq!(source.summaries.load(Ordering::SeqCst), 1);
        assert_eq!(updater.request_refresh("jdk-17.0.1+12").len(), 1);

        tokio::time::sleep(StdDuration::from_secs(1)).await;
        assert_eq!(source.summaries.load(Ordering::SeqCst), 2);
        assert!(source.by_id.load(Ordering::SeqCst) >= 1);

        task.abort();
    }
}
