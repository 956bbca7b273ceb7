//! Raw upstream release records as returned by the GraphQL API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::graphql::PageInfo;
use crate::model::ReleaseId;

/// One release asset (file).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhAsset {
    pub name: String,
    pub download_url: String,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}

/// The nested, paginated asset list of a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhAssetConnection {
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub nodes: Vec<GhAsset>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// A release with (possibly partial) assets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhRelease {
    pub id: ReleaseId,
    pub url: String,
    pub name: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_prerelease: bool,
    #[serde(default)]
    pub resource_path: String,
    #[serde(default)]
    pub release_assets: GhAssetConnection,
}

impl GhRelease {
    /// Merge further asset pages into this release.
    ///
    /// Assets are unioned by name; a later page wins on conflict.
    pub fn merge_assets(&mut self, more: Vec<GhAsset>) {
        for asset in more {
            match self
                .release_assets
                .nodes
                .iter_mut()
                .find(|existing| existing.name == asset.name)
            {
                Some(existing) => *existing = asset,
                None => self.release_assets.nodes.push(asset),
            }
        }
        self.release_assets.page_info = PageInfo::default();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCount {
    #[serde(default)]
    pub total_count: u32,
}

/// Cheap per-release summary: ids, timestamps and the asset count.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhReleaseSummary {
    pub id: ReleaseId,
    pub name: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_prerelease: bool,
    #[serde(default)]
    pub release_assets: AssetCount,
}

/// `releases { nodes, pageInfo }` connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConnection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryReleases<T> {
    pub releases: ReleaseConnection<T>,
}

/// Response of the per-repository list queries.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryData<T> {
    pub repository: Option<RepositoryReleases<T>>,
}

/// Response of the release-by-id query.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeData<T> {
    pub node: Option<T>,
}

/// `... on Release { releaseAssets }` continuation node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPageNode {
    #[serde(default)]
    pub release_assets: GhAssetConnection,
}
