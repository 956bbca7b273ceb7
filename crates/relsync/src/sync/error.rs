use thiserror::Error;

use crate::store::StoreError;
use crate::upstream::SourceError;

/// Pass-level sync failures.
///
/// A pass that fails leaves the committed snapshot untouched.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read version {version}: {source}")]
    Source {
        version: u32,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("sync task failed: {0}")]
    TaskPanicked(String),
}

impl SyncError {
    pub(crate) fn for_version(version: u32, source: SourceError) -> Self {
        Self::Source { version, source }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// An updater setting too large (or negative) to schedule with.
#[derive(Debug, Error)]
#[error("updater setting {key} = {value} is out of range")]
pub struct SettingsError {
    pub key: &'static str,
    pub value: String,
}

impl SettingsError {
    pub(crate) fn out_of_range(key: &'static str, value: impl ToString) -> Self {
        Self {
            key,
            value: value.to_string(),
        }
    }
}
