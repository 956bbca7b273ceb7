//! Sync settings and result types.

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::graphql::throttle::{DEFAULT_HARD_FLOOR, DEFAULT_SOFT_THRESHOLD};
use crate::graphql::{ClientSettings, QuotaThrottle};
use crate::model::{Snapshot, Vendor};
use crate::retry::RetryPolicy;
use crate::sync::SettingsError;
use crate::upstream::filter::DEFAULT_PRERELEASE_DAY_CUTOFF;
use crate::upstream::{ReleaseFilter, ReleaseFilterType};

/// Major versions tracked out of the box.
pub const DEFAULT_TRACKED_VERSIONS: [u32; 5] = [8, 11, 17, 21, 25];

/// Default number of concurrent release fetches per version.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Settings for the sync engine and scheduler.
///
/// Every field has a default, so a partial configuration file works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterSettings {
    pub quota_soft_threshold: u32,
    pub quota_hard_floor: u32,
    pub max_throttle_delay_secs: u64,
    pub min_throttle_poll_secs: u64,
    pub retry_attempts: usize,
    pub retry_base_delay_secs: u64,
    pub requests_per_second: u32,
    pub fetch_concurrency: usize,
    pub full_sync_period_hours: u64,
    pub reconcile_period_minutes: u64,
    pub reconcile_initial_delay_minutes: u64,
    pub instant_full_sync: bool,
    pub cool_down_minutes: i64,
    pub young_window_hours: i64,
    pub prerelease_day_cutoff: i64,
    pub excluded_vendors: Vec<Vendor>,
    pub include_excluded_vendors: bool,
    pub disable_updater: bool,
    pub tracked_versions: Vec<u32>,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            quota_soft_threshold: DEFAULT_SOFT_THRESHOLD,
            quota_hard_floor: DEFAULT_HARD_FLOOR,
            max_throttle_delay_secs: 400,
            min_throttle_poll_secs: 10,
            retry_attempts: 20,
            retry_base_delay_secs: 5,
            requests_per_second: 10,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            full_sync_period_hours: 24,
            reconcile_period_minutes: 6,
            reconcile_initial_delay_minutes: 1,
            instant_full_sync: false,
            cool_down_minutes: 10,
            young_window_hours: 24,
            prerelease_day_cutoff: DEFAULT_PRERELEASE_DAY_CUTOFF,
            excluded_vendors: vec![Vendor::Adoptopenjdk],
            include_excluded_vendors: false,
            disable_updater: false,
            tracked_versions: DEFAULT_TRACKED_VERSIONS.to_vec(),
        }
    }
}

impl UpdaterSettings {
    /// Throttle, retry and pacing for the GraphQL client. Endpoints and the
    /// token are left at their defaults for the caller to fill in.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            throttle: QuotaThrottle {
                soft_threshold: self.quota_soft_threshold,
                hard_floor: self.quota_hard_floor,
                max_delay: StdDuration::from_secs(self.max_throttle_delay_secs),
                min_poll: StdDuration::from_secs(self.min_throttle_poll_secs),
            },
            retry: RetryPolicy::new(
                StdDuration::from_secs(self.retry_base_delay_secs),
                self.retry_attempts,
            ),
            requests_per_second: self.requests_per_second,
            ..ClientSettings::default()
        }
    }

    #[must_use]
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            cool_down: Duration::try_minutes(self.cool_down_minutes).unwrap_or(Duration::MAX),
            young_window: Duration::try_hours(self.young_window_hours).unwrap_or(Duration::MAX),
            concurrency: self.fetch_concurrency.max(1),
            now: None,
        }
    }

    /// Filter for one full-sync phase.
    #[must_use]
    pub fn release_filter(&self, filter_type: ReleaseFilterType) -> ReleaseFilter {
        ReleaseFilter::new(filter_type, self.excluded_vendors.iter().copied())
            .include_all(self.include_excluded_vendors)
            .with_day_cutoff(self.prerelease_day_cutoff)
    }

    #[must_use]
    pub fn full_sync_period(&self) -> StdDuration {
        StdDuration::from_secs(self.full_sync_period_hours.max(1).saturating_mul(3600))
    }

    #[must_use]
    pub fn full_sync_initial_delay(&self) -> StdDuration {
        if self.instant_full_sync {
            StdDuration::ZERO
        } else {
            StdDuration::from_secs(60)
        }
    }

    #[must_use]
    pub fn reconcile_period(&self) -> StdDuration {
        StdDuration::from_secs(self.reconcile_period_minutes.max(1).saturating_mul(60))
    }

    #[must_use]
    pub fn reconcile_initial_delay(&self) -> StdDuration {
        StdDuration::from_secs(self.reconcile_initial_delay_minutes.saturating_mul(60))
    }

    /// Reject periods and windows that overflow when converted to durations.
    ///
    /// Periods must also fit a chrono duration so that scheduling them from
    /// the current instant cannot overflow.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let periods = [
            ("full_sync_period_hours", self.full_sync_period_hours, 3600),
            ("reconcile_period_minutes", self.reconcile_period_minutes, 60),
            ("reconcile_initial_delay_minutes", self.reconcile_initial_delay_minutes, 60),
        ];
        for (key, value, unit_secs) in periods {
            let fits = value
                .checked_mul(unit_secs)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(Duration::try_seconds)
                .is_some();
            if !fits {
                return Err(SettingsError::out_of_range(key, value));
            }
        }

        let windows = [
            ("cool_down_minutes", self.cool_down_minutes, Duration::try_minutes(self.cool_down_minutes)),
            ("young_window_hours", self.young_window_hours, Duration::try_hours(self.young_window_hours)),
            ("prerelease_day_cutoff", self.prerelease_day_cutoff, Duration::try_days(self.prerelease_day_cutoff)),
        ];
        for (key, value, window) in windows {
            if value < 0 || window.is_none() {
                return Err(SettingsError::out_of_range(key, value));
            }
        }
        Ok(())
    }
}

/// Windows used to decide which releases to re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Minimum age before a release is trusted as fully uploaded.
    pub cool_down: Duration,
    /// Releases published or updated this recently are always re-fetched.
    pub young_window: Duration,
    /// Concurrent release fetches per version.
    pub concurrency: usize,
    /// Fixed clock for tests; `None` reads the system clock.
    pub now: Option<DateTime<Utc>>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        UpdaterSettings::default().reconcile_options()
    }
}

impl ReconcileOptions {
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// Why a release is re-fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefreshReason {
    New,
    Updated,
    Young,
    Explicit,
    BinaryCountChanged,
}

/// Per-version counts of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub removed: usize,
    pub added: usize,
    pub updated: usize,
    pub young: usize,
    pub explicit: usize,
    pub binary_count: usize,
    pub quarantined: usize,
    /// Releases kept because their repository did not resolve.
    pub kept_unresolved: usize,
}

impl ReconcileStats {
    pub(crate) fn record(&mut self, reason: RefreshReason) {
        match reason {
            RefreshReason::New => self.added += 1,
            RefreshReason::Updated => self.updated += 1,
            RefreshReason::Young => self.young += 1,
            RefreshReason::Explicit => self.explicit += 1,
            RefreshReason::BinaryCountChanged => self.binary_count += 1,
        }
    }

    /// Releases re-fetched for an existing id.
    #[must_use]
    pub fn refreshed(&self) -> usize {
        self.updated + self.young + self.explicit + self.binary_count
    }

    /// Releases added, replaced or removed.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.removed + self.added + self.refreshed()
    }
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub snapshot: Snapshot,
    pub stats: BTreeMap<u32, ReconcileStats>,
}

/// Result of a full sync.
#[derive(Debug, Clone)]
pub struct FullSyncOutcome {
    pub snapshot: Snapshot,
    /// Releases fetched from upstream.
    pub fetched: usize,
    /// Releases carried over from the previous snapshot.
    pub copied: usize,
    /// Releases that failed to map and were quarantined.
    pub unmapped: usize,
}
