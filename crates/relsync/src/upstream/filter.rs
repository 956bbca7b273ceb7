//! Which upstream releases a full fetch includes.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Release, Vendor};

/// Default age after which prereleases are left out of full fetches.
pub const DEFAULT_PRERELEASE_DAY_CUTOFF: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseFilterType {
    ReleasesOnly,
    SnapshotsOnly,
    All,
}

/// Inclusion predicate for full fetches, evaluated before mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFilter {
    pub filter_type: ReleaseFilterType,
    /// Accept every release, excluded vendors included.
    pub include_all: bool,
    pub excluded_vendors: BTreeSet<Vendor>,
    pub day_cutoff: Duration,
    pub now: DateTime<Utc>,
}

impl ReleaseFilter {
    #[must_use]
    pub fn new(filter_type: ReleaseFilterType, excluded_vendors: impl IntoIterator<Item = Vendor>) -> Self {
        Self {
            filter_type,
            include_all: false,
            excluded_vendors: excluded_vendors.into_iter().collect(),
            day_cutoff: Duration::days(DEFAULT_PRERELEASE_DAY_CUTOFF),
            now: Utc::now(),
        }
    }

    #[must_use]
    pub fn include_all(mut self, include_all: bool) -> Self {
        self.include_all = include_all;
        self
    }

    #[must_use]
    pub fn with_day_cutoff(mut self, days: i64) -> Self {
        self.day_cutoff = Duration::try_days(days).unwrap_or(Duration::MAX);
        self
    }

    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Whether a vendor's repositories are fetched at all.
    #[must_use]
    pub fn includes_vendor(&self, vendor: Vendor) -> bool {
        self.include_all || !self.excluded_vendors.contains(&vendor)
    }

    #[must_use]
    pub fn includes(&self, vendor: Vendor, updated_at: DateTime<Utc>, prerelease: bool) -> bool {
        if self.include_all {
            return true;
        }
        if !self.includes_vendor(vendor) {
            return false;
        }
        let stale_prerelease = prerelease && self.now - updated_at > self.day_cutoff;
        match self.filter_type {
            ReleaseFilterType::ReleasesOnly => !prerelease,
            ReleaseFilterType::SnapshotsOnly => prerelease && !stale_prerelease,
            ReleaseFilterType::All => !stale_prerelease,
        }
    }

    /// Whether a stored release would have been fetched by this filter.
    #[must_use]
    pub fn includes_release(&self, release: &Release) -> bool {
        self.includes(release.vendor, release.updated_at, release.is_early_access())
    }
}
