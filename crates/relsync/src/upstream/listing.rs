//! Per-repository listing results, aggregated per major version.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::model::{Release, ReleaseId};

use super::repos::UpstreamRepo;
use super::types::GhReleaseSummary;

/// What one upstream repository returned.
///
/// A repository that does not exist for a vendor/version pairing is
/// [`RepoListing::NotFound`]; one that exists but has no releases is
/// [`RepoListing::EmptyOk`]. Only the latter is authoritative about absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoListing<T> {
    NotFound,
    EmptyOk,
    Releases(Vec<T>),
}

impl<T> RepoListing<T> {
    /// Listing for a repository that resolved.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            Self::EmptyOk
        } else {
            Self::Releases(items)
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Releases(items) => items,
            Self::NotFound | Self::EmptyOk => &[],
        }
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Releases(items) => items,
            Self::NotFound | Self::EmptyOk => Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> RepoListing<U> {
        match self {
            Self::NotFound => RepoListing::NotFound,
            Self::EmptyOk => RepoListing::EmptyOk,
            Self::Releases(items) => RepoListing::from_items(items.into_iter().map(f).collect()),
        }
    }
}

/// Cheap view of one upstream release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub id: ReleaseId,
    pub name: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_prerelease: bool,
    pub asset_count: u32,
}

impl From<GhReleaseSummary> for SummaryEntry {
    fn from(raw: GhReleaseSummary) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            published_at: raw.published_at,
            updated_at: raw.updated_at,
            is_prerelease: raw.is_prerelease,
            asset_count: raw.release_assets.total_count,
        }
    }
}

/// Summaries of every tracked repository for one major version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionSummary {
    pub version: u32,
    pub repos: Vec<(UpstreamRepo, RepoListing<SummaryEntry>)>,
}

impl VersionSummary {
    #[must_use]
    pub fn new(version: u32, repos: Vec<(UpstreamRepo, RepoListing<SummaryEntry>)>) -> Self {
        Self { version, repos }
    }

    /// Every summary entry, flattened across repositories.
    pub fn entries(&self) -> impl Iterator<Item = &SummaryEntry> {
        self.repos.iter().flat_map(|(_, listing)| listing.items())
    }

    /// Entries keyed by id. A later repository wins if ids collide.
    #[must_use]
    pub fn by_id(&self) -> BTreeMap<&ReleaseId, &SummaryEntry> {
        self.entries().map(|entry| (&entry.id, entry)).collect()
    }

    /// `owner/name` of every repository that did not resolve.
    #[must_use]
    pub fn unresolved_repos(&self) -> BTreeSet<String> {
        self.repos
            .iter()
            .filter(|(_, listing)| listing.is_not_found())
            .map(|(repo, _)| repo.full_name())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

/// Fully mapped releases of one major version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionDetail {
    pub version: u32,
    pub repos: Vec<(UpstreamRepo, RepoListing<Release>)>,
    /// Releases that failed to map.
    pub unmapped: Vec<ReleaseId>,
}

impl VersionDetail {
    pub fn releases(&self) -> impl Iterator<Item = &Release> {
        self.repos.iter().flat_map(|(_, listing)| listing.items())
    }

    #[must_use]
    pub fn into_releases(self) -> Vec<Release> {
        self.repos
            .into_iter()
            .flat_map(|(_, listing)| listing.into_items())
            .collect()
    }
}
