use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::release::{Release, ReleaseId};

/// All releases tracked for one major version, across vendors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRelease {
    pub version: u32,
    pub releases: BTreeMap<ReleaseId, Release>,
}

impl FeatureRelease {
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            version,
            releases: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn from_releases(version: u32, releases: impl IntoIterator<Item = Release>) -> Self {
        let mut feature = Self::new(version);
        for release in releases {
            feature.upsert(release);
        }
        feature
    }

    #[must_use]
    pub fn get(&self, id: &ReleaseId) -> Option<&Release> {
        self.releases.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ReleaseId) -> bool {
        self.releases.contains_key(id)
    }

    /// Insert or replace a release by id.
    pub fn upsert(&mut self, release: Release) {
        self.releases.insert(release.id.clone(), release);
    }

    /// Keep only the releases whose id satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Release) -> bool) {
        self.releases.retain(|_, release| keep(release));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Release> {
        self.releases.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Releases ordered by version, newest first.
    #[must_use]
    pub fn sorted_newest_first(&self) -> Vec<&Release> {
        let mut releases: Vec<&Release> = self.releases.values().collect();
        releases.sort_by(|a, b| {
            b.version_data
                .cmp(&a.version_data)
                .then_with(|| a.id.cmp(&b.id))
        });
        releases
    }
}

/// The full release dataset: one [`FeatureRelease`] per tracked major version.
///
/// Snapshots are replaced wholesale, never mutated once published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub feature_releases: BTreeMap<u32, FeatureRelease>,
}

impl Snapshot {
    /// An empty snapshot with an entry for every tracked version.
    #[must_use]
    pub fn empty(tracked_versions: &[u32]) -> Self {
        Self {
            feature_releases: tracked_versions
                .iter()
                .map(|v| (*v, FeatureRelease::new(*v)))
                .collect(),
        }
    }

    #[must_use]
    pub fn from_feature_releases(features: impl IntoIterator<Item = FeatureRelease>) -> Self {
        Self {
            feature_releases: features.into_iter().map(|f| (f.version, f)).collect(),
        }
    }

    /// Make sure every tracked version has an entry, keeping existing ones.
    #[must_use]
    pub fn with_tracked_versions(mut self, tracked_versions: &[u32]) -> Self {
        for version in tracked_versions {
            self.feature_releases
                .entry(*version)
                .or_insert_with(|| FeatureRelease::new(*version));
        }
        self
    }

    #[must_use]
    pub fn feature_release(&self, version: u32) -> Option<&FeatureRelease> {
        self.feature_releases.get(&version)
    }

    #[must_use]
    pub fn versions(&self) -> Vec<u32> {
        self.feature_releases.keys().copied().collect()
    }

    pub fn releases(&self) -> impl Iterator<Item = &Release> {
        self.feature_releases.values().flat_map(FeatureRelease::iter)
    }

    #[must_use]
    pub fn release_count(&self) -> usize {
        self.feature_releases.values().map(FeatureRelease::len).sum()
    }

    #[must_use]
    pub fn contains_release(&self, id: &ReleaseId) -> bool {
        self.feature_releases.values().any(|f| f.contains(id))
    }

    /// Releases whose name matches exactly, across all versions and vendors.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<&Release> {
        self.releases().filter(|r| r.release_name == name).collect()
    }

    /// Replace (or add) the entry for one version.
    #[must_use]
    pub fn with_feature_release(mut self, feature: FeatureRelease) -> Self {
        self.feature_releases.insert(feature.version, feature);
        self
    }

    /// Add releases under `version`, skipping ids already present anywhere.
    ///
    /// Returns how many were added.
    pub fn add_missing(&mut self, version: u32, releases: impl IntoIterator<Item = Release>) -> usize {
        let known: HashSet<ReleaseId> = self.releases().map(|r| r.id.clone()).collect();
        let feature = self
            .feature_releases
            .entry(version)
            .or_insert_with(|| FeatureRelease::new(version));
        let mut added = 0;
        for release in releases {
            if !known.contains(&release.id) && !feature.contains(&release.id) {
                feature.upsert(release);
                added += 1;
            }
        }
        added
    }
}
