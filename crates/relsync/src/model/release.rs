use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::binary::{Binary, BinaryKey};
use super::vendor::Vendor;
use super::version::VersionData;

/// Upstream global node id of a release; the only reliable diff key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(String);

impl ReleaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReleaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// General availability.
    Ga,
    /// Early access.
    Ea,
}

/// Source archive attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePackage {
    pub name: String,
    pub link: String,
    pub size: u64,
}

/// A normalized release.
///
/// Release names are not unique across vendors; `id` plus `vendor` is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub release_type: ReleaseType,
    pub release_link: String,
    pub release_name: String,
    /// Publish time.
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub binaries: Vec<Binary>,
    pub download_count: u64,
    pub vendor: Vendor,
    pub version_data: VersionData,
    #[serde(default)]
    pub source: Option<SourcePackage>,
    /// Number of upstream assets this release was built from.
    #[serde(default)]
    pub asset_count: u32,
    /// `owner/name` of the upstream repository the release was read from.
    #[serde(default)]
    pub source_repository: Option<String>,
}

impl Release {
    /// Build a release, de-duplicating binaries by [`BinaryKey`].
    ///
    /// When two binaries share a key the later one wins. Binaries are kept in
    /// key order so that equal inputs serialize identically.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ReleaseId,
        release_type: ReleaseType,
        release_link: impl Into<String>,
        release_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        binaries: Vec<Binary>,
        vendor: Vendor,
        version_data: VersionData,
    ) -> Self {
        let binaries = dedup_binaries(binaries);
        let download_count = binaries.iter().map(|b| b.download_count).sum();
        Self {
            id,
            release_type,
            release_link: release_link.into(),
            release_name: release_name.into(),
            timestamp,
            updated_at,
            binaries,
            download_count,
            vendor,
            version_data,
            source: None,
            asset_count: 0,
            source_repository: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<SourcePackage>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_upstream(mut self, repository: impl Into<String>, asset_count: u32) -> Self {
        self.source_repository = Some(repository.into());
        self.asset_count = asset_count;
        self
    }

    #[must_use]
    pub fn is_early_access(&self) -> bool {
        self.release_type == ReleaseType::Ea
    }
}

fn dedup_binaries(binaries: Vec<Binary>) -> Vec<Binary> {
    let mut by_key: BTreeMap<BinaryKey, Binary> = BTreeMap::new();
    for binary in binaries {
        by_key.insert(binary.key(), binary);
    }
    by_key.into_values().collect()
}
