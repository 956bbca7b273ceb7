//! Durable snapshot storage.
//!
//! - [`DataStore`] is the seam the persistence coordinator writes through
//! - [`SeaOrmStore`] keeps one row per feature release plus a token row
//! - [`MemoryStore`] keeps everything in process, for tests and dry runs

mod memory;
mod sea;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;

use crate::checksum::HashToken;
use crate::model::Snapshot;

pub use memory::MemoryStore;
pub use sea::SeaOrmStore;

/// Errors from the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("failed to (de)serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored snapshot is corrupt: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The token recorded with the last commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChecksum {
    pub token: HashToken,
    pub updated_at: DateTime<Utc>,
}

/// Durable storage for the committed snapshot.
///
/// `commit` must replace the snapshot and its token atomically: a reader of
/// `current_checksum` never sees a token that does not belong to the
/// snapshot `load_snapshot` returns.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Load the stored snapshot, or `None` when nothing was ever committed.
    async fn load_snapshot(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot and its token.
    async fn commit(&self, snapshot: &Snapshot, token: &HashToken) -> Result<()>;

    /// The token of the stored snapshot, or `None` when nothing was committed.
    async fn current_checksum(&self) -> Result<Option<StoredChecksum>>;
}
