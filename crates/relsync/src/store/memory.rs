use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::checksum::HashToken;
use crate::model::Snapshot;

use super::{DataStore, Result, StoredChecksum};

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<(Snapshot, StoredChecksum)>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `snapshot` under `token`.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot, token: HashToken) -> Self {
        let stored = StoredChecksum {
            token,
            updated_at: Utc::now(),
        };
        Self {
            state: Mutex::new(Some((snapshot, stored))),
        }
    }

    fn state(&self) -> MutexGuard<'_, Option<(Snapshot, StoredChecksum)>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        Ok(self.state().as_ref().map(|(snapshot, _)| snapshot.clone()))
    }

    async fn commit(&self, snapshot: &Snapshot, token: &HashToken) -> Result<()> {
        let stored = StoredChecksum {
            token: token.clone(),
            updated_at: Utc::now(),
        };
        *self.state() = Some((snapshot.clone(), stored));
        Ok(())
    }

    async fn current_checksum(&self) -> Result<Option<StoredChecksum>> {
        Ok(self.state().as_ref().map(|(_, stored)| stored.clone()))
    }
}
