//! Checksum-guarded persistence of snapshots.
//!
//! Sync passes compute candidates without holding any lock. Only the final
//! compare-and-write runs under the coordinator's mutex: the stored token is
//! re-read, and a candidate is written only if the store still holds the
//! snapshot the candidate was derived from. A pass that loses the race
//! returns the winner's snapshot instead of overwriting it.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::checksum::{HashToken, hash_snapshot};
use crate::model::Snapshot;
use crate::short_error_message;
use crate::store::{DataStore, Result};
use crate::sync::{ProgressCallback, SyncProgress, emit};

/// A snapshot together with the store token it was committed (or loaded) under.
///
/// `token` is `None` when the snapshot never came from the store, e.g. on a
/// fresh database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedSnapshot {
    pub snapshot: Arc<Snapshot>,
    pub token: Option<HashToken>,
}

impl CommittedSnapshot {
    #[must_use]
    pub fn new(snapshot: Snapshot, token: Option<HashToken>) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            token,
        }
    }

    /// An empty snapshot not backed by the store.
    #[must_use]
    pub fn empty(tracked_versions: &[u32]) -> Self {
        Self::new(Snapshot::empty(tracked_versions), None)
    }
}

/// Result of [`PersistenceCoordinator::commit`].
///
/// Every variant carries the authoritative snapshot the caller should
/// publish and derive its next candidate from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The candidate equals the previous snapshot; nothing was written.
    Unchanged(CommittedSnapshot),
    /// The candidate was written.
    Committed(CommittedSnapshot),
    /// Another writer committed first; the candidate was discarded.
    Superseded(CommittedSnapshot),
    /// Another writer committed first and the stored token no longer matched
    /// the stored data, so the reloaded snapshot was written back.
    Resynced(CommittedSnapshot),
}

impl CommitOutcome {
    #[must_use]
    pub fn committed(&self) -> &CommittedSnapshot {
        match self {
            Self::Unchanged(c) | Self::Committed(c) | Self::Superseded(c) | Self::Resynced(c) => c,
        }
    }

    #[must_use]
    pub fn into_committed(self) -> CommittedSnapshot {
        match self {
            Self::Unchanged(c) | Self::Committed(c) | Self::Superseded(c) | Self::Resynced(c) => c,
        }
    }

    /// Whether the candidate itself was persisted.
    #[must_use]
    pub fn wrote_candidate(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Serializes loads and compare-and-write commits against a [`DataStore`].
pub struct PersistenceCoordinator {
    store: Arc<dyn DataStore>,
    lock: Mutex<()>,
}

impl PersistenceCoordinator {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Load the stored snapshot and its token.
    ///
    /// Returns `None` when nothing was ever committed.
    pub async fn load(&self) -> Result<Option<CommittedSnapshot>> {
        let _guard = self.lock.lock().await;
        self.load_locked().await
    }

    /// Load the stored snapshot, falling back to an empty one.
    ///
    /// A load failure is logged, not returned. The fallback carries no token,
    /// so the first commit after it re-reads the store instead of
    /// overwriting it.
    pub async fn load_or_empty(&self, tracked_versions: &[u32]) -> CommittedSnapshot {
        match self.load().await {
            Ok(Some(committed)) => CommittedSnapshot {
                snapshot: Arc::new(
                    Arc::unwrap_or_clone(committed.snapshot).with_tracked_versions(tracked_versions),
                ),
                token: committed.token,
            },
            Ok(None) => {
                tracing::info!("No stored snapshot, starting empty");
                CommittedSnapshot::empty(tracked_versions)
            }
            Err(e) => {
                tracing::error!(error = %short_error_message(&e), "Failed to load snapshot, starting empty");
                CommittedSnapshot::empty(tracked_versions)
            }
        }
    }

    async fn load_locked(&self) -> Result<Option<CommittedSnapshot>> {
        let stored = self.store.current_checksum().await?;
        let Some(snapshot) = self.store.load_snapshot().await? else {
            return Ok(None);
        };
        let token = match stored {
            Some(stored) => stored.token,
            None => hash_snapshot(&snapshot)?,
        };
        Ok(Some(CommittedSnapshot::new(snapshot, Some(token))))
    }

    /// Commit `candidate`, derived from `previous`.
    ///
    /// Writes only if the store still holds `previous`. Otherwise the stored
    /// snapshot wins and is returned; if its recomputed token differs from
    /// the stored one, it is written back under the fresh token.
    #[tracing::instrument(skip_all, fields(releases = candidate.release_count()))]
    pub async fn commit(
        &self,
        candidate: Snapshot,
        previous: &CommittedSnapshot,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<CommitOutcome> {
        let candidate_token = hash_snapshot(&candidate)?;
        if candidate_token == hash_snapshot(&previous.snapshot)? {
            tracing::debug!("Candidate unchanged, skipping commit");
            emit(on_progress, SyncProgress::CommitSkipped);
            return Ok(CommitOutcome::Unchanged(previous.clone()));
        }

        let _guard = self.lock.lock().await;

        let stored = self.store.current_checksum().await?.map(|s| s.token);
        if stored == previous.token {
            return self.write(candidate, candidate_token, on_progress).await;
        }

        tracing::warn!(
            expected = ?previous.token.as_ref().map(|t| &t.checksum),
            found = ?stored.as_ref().map(|t| &t.checksum),
            "Store changed since the candidate was computed, discarding it"
        );
        emit(
            on_progress,
            SyncProgress::CommitConflict {
                expected: previous.token.as_ref().map(|t| t.checksum.clone()),
                found: stored.as_ref().map(|t| t.checksum.clone()),
            },
        );

        let Some(reloaded) = self.store.load_snapshot().await? else {
            // The store was emptied; there is no winner to preserve.
            return self.write(candidate, candidate_token, on_progress).await;
        };
        let reloaded_token = hash_snapshot(&reloaded)?;

        if stored.as_ref() == Some(&reloaded_token) {
            return Ok(CommitOutcome::Superseded(CommittedSnapshot::new(
                reloaded,
                Some(reloaded_token),
            )));
        }

        tracing::warn!(
            checksum = %reloaded_token.checksum,
            "Stored token does not match stored data, writing it back"
        );
        self.store.commit(&reloaded, &reloaded_token).await?;
        Ok(CommitOutcome::Resynced(CommittedSnapshot::new(
            reloaded,
            Some(reloaded_token),
        )))
    }

    async fn write(
        &self,
        candidate: Snapshot,
        token: HashToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<CommitOutcome> {
        self.store.commit(&candidate, &token).await?;
        tracing::info!(
            checksum = %token.checksum,
            releases = candidate.release_count(),
            "Committed snapshot"
        );
        emit(
            on_progress,
            SyncProgress::Committed {
                checksum: token.checksum.clone(),
                releases: candidate.release_count(),
            },
        );
        Ok(CommitOutcome::Committed(CommittedSnapshot::new(
            candidate,
            Some(token),
        )))
    }
}
