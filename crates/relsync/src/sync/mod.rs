//! Sync passes that turn upstream state into a candidate snapshot.
//!
//! # Module Structure
//!
//! - [`types`] - `UpdaterSettings`, `ReconcileOptions` and pass results
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`reconcile`] - Incremental reconciliation against cheap summaries
//! - [`full`] - Full rebuild from complete upstream detail
//!
//! Passes only compute candidates. Committing them is the job of
//! [`crate::coordinator::PersistenceCoordinator`].
//!
//! # Example
//!
//! ```ignore
//! use relsync::sync::{QuarantineSet, ReconcileOptions, reconcile_snapshot};
//!
//! let mut quarantine = QuarantineSet::new();
//! let outcome = reconcile_snapshot(
//!     source,
//!     &previous,
//!     &mut quarantine,
//!     &BTreeSet::new(),
//!     &ReconcileOptions::default(),
//!     None,
//! )
//! .await?;
//! ```

mod error;
pub mod full;
mod progress;
mod quarantine;
pub mod reconcile;
pub mod types;

pub use error::{Result, SettingsError, SyncError};
pub use full::full_sync;
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use quarantine::QuarantineSet;
pub use reconcile::{VersionReconcile, plan_refresh, reconcile_snapshot, reconcile_version, retain_listed};
pub use types::{
    DEFAULT_FETCH_CONCURRENCY, DEFAULT_TRACKED_VERSIONS, FullSyncOutcome, ReconcileOptions,
    ReconcileOutcome, ReconcileStats, RefreshReason, UpdaterSettings,
};
