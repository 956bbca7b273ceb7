//! The release source seam used by the sync engine.

use async_trait::async_trait;
use thiserror::Error;

use crate::graphql::GraphQlError;
use crate::model::{Release, ReleaseId};

use super::filter::ReleaseFilter;
use super::listing::{VersionDetail, VersionSummary};

/// Errors from reading upstream releases.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("upstream query for {context} failed: {source}")]
    Upstream {
        context: String,
        #[source]
        source: GraphQlError,
    },

    #[error("release {release_id} could not be mapped: {reason}")]
    Mapping { release_id: ReleaseId, reason: String },

    #[error("release {0} not found upstream")]
    Missing(ReleaseId),

    #[error("fetch task failed: {0}")]
    TaskPanicked(String),
}

impl SourceError {
    pub fn upstream(context: impl Into<String>, source: GraphQlError) -> Self {
        Self::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure is specific to one release, which should then be
    /// skipped for the rest of the run rather than failing the pass.
    #[must_use]
    pub fn is_quarantinable(&self) -> bool {
        matches!(self, Self::Mapping { .. } | Self::Missing(_))
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Read access to the upstream release repositories.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Cheap per-repository summaries of every release of `version`.
    async fn summary(&self, version: u32) -> Result<VersionSummary>;

    /// Fully mapped releases of `version` that pass `filter`.
    async fn detail(&self, version: u32, filter: &ReleaseFilter) -> Result<VersionDetail>;

    /// Fetch and map one release with its complete asset list.
    async fn release_by_id(&self, id: &ReleaseId) -> Result<Release>;
}
