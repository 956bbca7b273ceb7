//! Relsync - keeps a store of vendor JDK release metadata in sync with upstream.
//!
//! Releases are read from upstream repositories through a rate-limited
//! GraphQL client, normalized into a versioned [`Snapshot`], and persisted
//! through a checksum-guarded coordinator so that concurrent updaters do not
//! overwrite each other's work.
//!
//! # Features
//!
//! - `github` - The reqwest-backed HTTP transport for the GraphQL client.
//! - `sqlite` - SQLite support for the SeaORM store.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to create the schema on connection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use relsync::{SeaOrmStore, Updater, UpdaterSettings, connect_and_migrate};
//!
//! let db = connect_and_migrate("sqlite://relsync.db?mode=rwc").await?;
//! let store = Arc::new(SeaOrmStore::new(db));
//! let updater = Updater::new(source, store, UpdaterSettings::default(), None).await;
//! updater.run(shutdown).await;
//! ```

pub mod checksum;
pub mod coordinator;
pub mod db;
pub mod entity;
pub mod graphql;
pub mod http;
pub mod model;
pub mod retry;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod upstream;

#[cfg(feature = "migrate")]
pub mod migration;

pub use checksum::{HashToken, hash_snapshot};
pub use coordinator::{CommitOutcome, CommittedSnapshot, PersistenceCoordinator};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use model::{FeatureRelease, Release, ReleaseId, Snapshot, Vendor};
pub use scheduler::{SnapshotHandle, Updater};
pub use store::{DataStore, MemoryStore, SeaOrmStore, StoreError, StoredChecksum};
pub use sync::{SettingsError, SyncError, SyncProgress, UpdaterSettings};
pub use upstream::{GraphQlReleaseSource, ReleaseFilter, ReleaseFilterType, ReleaseSource};

/// First line of an error's display output, for log lines and progress events.
///
/// # Example
///
/// ```
/// use relsync::short_error_message;
/// let error = std::io::Error::other("quota exhausted\nretry after reset");
/// assert_eq!(short_error_message(&error), "quota exhausted");
/// ```
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_error_message_keeps_single_line() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "repository not found");
        assert_eq!(short_error_message(&err), "repository not found");
    }

    #[test]
    fn short_error_message_drops_trailing_lines() {
        let err = std::io::Error::other("first\nsecond");
        assert_eq!(short_error_message(&err), "first");
    }
}
