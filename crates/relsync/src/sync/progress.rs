//! Progress reporting types for sync operations.
//!
//! Sync passes report what they do through an optional callback so the CLI
//! can render bars on a terminal or plain log lines otherwise.

use crate::upstream::ReleaseFilterType;

/// Progress events emitted during sync and commit.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Starting a full sync.
    FullSyncStarted {
        /// Which releases are fetched.
        filter: ReleaseFilterType,
        /// Number of major versions to fetch.
        versions: usize,
    },

    /// Fetched the complete detail of one major version.
    VersionFetched {
        version: u32,
        /// Releases that mapped.
        releases: usize,
        /// Releases that failed to map and were quarantined.
        unmapped: usize,
    },

    /// Fetching a major version failed; the pass will be abandoned.
    VersionFailed { version: u32, error: String },

    /// Releases carried over from the previous snapshot.
    CopiedOver { version: u32, count: usize },

    /// Full sync finished.
    FullSyncComplete {
        /// Total releases in the new snapshot.
        releases: usize,
    },

    /// Starting a reconciliation pass.
    ReconcileStarted {
        versions: usize,
        /// Release names queued for explicit refresh.
        pending_refresh: usize,
    },

    /// One major version was reconciled.
    VersionReconciled {
        version: u32,
        removed: usize,
        added: usize,
        refreshed: usize,
        quarantined: usize,
    },

    /// A release failed to fetch or map and is skipped for the rest of the run.
    ReleaseQuarantined {
        version: u32,
        release_id: String,
        reason: String,
    },

    /// Reconciliation finished.
    ReconcileComplete {
        /// Releases added, replaced or removed across all versions.
        changed: usize,
    },

    /// The candidate equals the current snapshot; nothing to write.
    CommitSkipped,

    /// The candidate was written.
    Committed { checksum: String, releases: usize },

    /// Another writer committed first; the stored snapshot was reloaded.
    CommitConflict {
        expected: Option<String>,
        found: Option<String>,
    },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
