#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relsync::model::{Release, ReleaseId, ReleaseType, Vendor, VersionData};
use relsync::upstream::source::Result;
use relsync::upstream::{
    ReleaseFilter, ReleaseSource, RepoListing, SourceError, SummaryEntry, UpstreamRepo,
    VersionDetail, VersionSummary,
};

pub const TEMURIN: &str = "adoptium/temurin8-binaries";

pub fn temurin() -> UpstreamRepo {
    UpstreamRepo::new("adoptium", "temurin8-binaries", Vendor::Eclipse)
}

pub fn release(id: &str, name: &str, updated_at: DateTime<Utc>) -> Release {
    let version = VersionData::parse_release_name(name).expect("test release names parse");
    Release::new(
        ReleaseId::new(id),
        ReleaseType::Ga,
        format!("https://github.com/{TEMURIN}/releases/tag/{name}"),
        name,
        updated_at,
        updated_at,
        Vec::new(),
        Vendor::Eclipse,
        version,
    )
    .with_upstream(TEMURIN, 2)
}

pub fn entry(release: &Release) -> SummaryEntry {
    SummaryEntry {
        id: release.id.clone(),
        name: release.release_name.clone(),
        published_at: release.timestamp,
        updated_at: release.updated_at,
        is_prerelease: false,
        asset_count: release.asset_count,
    }
}

/// Scripted upstream.
///
/// Summaries and details are served per version. Release lookups by id are
/// recorded, and ids scripted as unmappable fail with a mapping error.
#[derive(Default)]
pub struct FakeSource {
    summaries: Mutex<HashMap<u32, VersionSummary>>,
    details: Mutex<HashMap<u32, VersionDetail>>,
    releases: Mutex<HashMap<ReleaseId, Release>>,
    unmappable: Mutex<Vec<ReleaseId>>,
    fetched: Mutex<Vec<ReleaseId>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_summary(&self, version: u32, listing: RepoListing<SummaryEntry>) {
        self.summaries
            .lock()
            .unwrap()
            .insert(version, VersionSummary::new(version, vec![(temurin(), listing)]));
    }

    pub fn set_detail(&self, detail: VersionDetail) {
        self.details.lock().unwrap().insert(detail.version, detail);
    }

    pub fn set_release(&self, release: Release) {
        self.releases.lock().unwrap().insert(release.id.clone(), release);
    }

    pub fn set_unmappable(&self, id: &str) {
        self.unmappable.lock().unwrap().push(ReleaseId::new(id));
    }

    pub fn fetched(&self) -> Vec<ReleaseId> {
        let mut fetched = self.fetched.lock().unwrap().clone();
        fetched.sort();
        fetched
    }

    pub fn clear_fetched(&self) {
        self.fetched.lock().unwrap().clear();
    }
}

#[async_trait]
impl ReleaseSource for FakeSource {
    async fn summary(&self, version: u32) -> Result<VersionSummary> {
        Ok(self
            .summaries
            .lock()
            .unwrap()
            .get(&version)
            .cloned()
            .unwrap_or_else(|| VersionSummary::new(version, vec![(temurin(), RepoListing::EmptyOk)])))
    }

    async fn detail(&self, version: u32, filter: &ReleaseFilter) -> Result<VersionDetail> {
        let mut detail = self
            .details
            .lock()
            .unwrap()
            .get(&version)
            .cloned()
            .unwrap_or(VersionDetail {
                version,
                repos: vec![(temurin(), RepoListing::EmptyOk)],
                unmapped: Vec::new(),
            });
        for (repo, listing) in &mut detail.repos {
            if !filter.includes_vendor(repo.vendor) {
                *listing = RepoListing::EmptyOk;
            }
        }
        Ok(detail)
    }

    async fn release_by_id(&self, id: &ReleaseId) -> Result<Release> {
        self.fetched.lock().unwrap().push(id.clone());
        if self.unmappable.lock().unwrap().contains(id) {
            return Err(SourceError::Mapping {
                release_id: id.clone(),
                reason: "no binaries".to_string(),
            });
        }
        self.releases
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::Missing(id.clone()))
    }
}
