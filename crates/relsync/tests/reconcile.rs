mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use relsync::model::{FeatureRelease, ReleaseId, Snapshot};
use relsync::sync::{QuarantineSet, ReconcileOptions, reconcile_snapshot};
use relsync::upstream::RepoListing;

use common::{FakeSource, entry, release};

fn snapshot(releases: impl IntoIterator<Item = relsync::Release>) -> Snapshot {
    Snapshot::from_feature_releases([FeatureRelease::from_releases(8, releases)])
}

fn ids(snapshot: &Snapshot) -> Vec<String> {
    snapshot.releases().map(|r| r.id.to_string()).collect()
}

#[tokio::test]
async fn updated_and_new_releases_are_fetched() {
    let now = Utc::now();
    let t0 = now - Duration::days(30);
    let t1 = now - Duration::days(2);
    let a_before = release("1", "jdk8u322-b06", t0);
    let mut a_after = release("1", "jdk8u322-b06", t1);
    a_after.timestamp = t0;
    let b = release("2", "jdk8u332-b09", now - Duration::minutes(11));

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(vec![entry(&a_after), entry(&b)]));
    source.set_release(a_after.clone());
    source.set_release(b.clone());

    let mut quarantine = QuarantineSet::new();
    let outcome = reconcile_snapshot(
        source.clone(),
        &snapshot([a_before]),
        &mut quarantine,
        &BTreeSet::new(),
        &ReconcileOptions::default().at(now),
        None,
    )
    .await
    .unwrap();

    assert_eq!(ids(&outcome.snapshot), vec!["1", "2"]);
    let feature = outcome.snapshot.feature_release(8).unwrap();
    assert_eq!(feature.get(&ReleaseId::new("1")).unwrap().updated_at, t1);
    let stats = &outcome.stats[&8];
    assert_eq!((stats.removed, stats.added, stats.updated, stats.young), (0, 1, 1, 0));
    assert_eq!(source.fetched(), vec![ReleaseId::new("1"), ReleaseId::new("2")]);
}

#[tokio::test]
async fn reconciling_against_identical_upstream_is_idempotent() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let releases = vec![
        release("1", "jdk8u322-b06", t0),
        release("2", "jdk8u332-b09", t0 + Duration::days(90)),
    ];
    let previous = snapshot(releases.clone());

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(releases.iter().map(entry).collect()));

    let mut quarantine = QuarantineSet::new();
    let outcome = reconcile_snapshot(
        source.clone(),
        &previous,
        &mut quarantine,
        &BTreeSet::new(),
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.snapshot, previous);
    assert!(source.fetched().is_empty());
}

#[tokio::test]
async fn release_missing_from_summary_is_removed() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let kept = release("1", "jdk8u322-b06", t0);
    let gone = release("2", "jdk8u332-b09", t0);

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(vec![entry(&kept)]));

    let outcome = reconcile_snapshot(
        source,
        &snapshot([kept.clone(), gone]),
        &mut QuarantineSet::new(),
        &BTreeSet::new(),
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.snapshot, snapshot([kept]));
    assert_eq!(outcome.stats[&8].removed, 1);
}

#[tokio::test]
async fn unresolved_repository_keeps_its_releases() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let previous = snapshot([release("1", "jdk8u322-b06", t0)]);

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::NotFound);

    let outcome = reconcile_snapshot(
        source,
        &previous,
        &mut QuarantineSet::new(),
        &BTreeSet::new(),
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.snapshot, previous);
    assert_eq!(outcome.stats[&8].kept_unresolved, 1);
}

#[tokio::test]
async fn authoritative_empty_listing_empties_the_version() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let previous = snapshot([release("1", "jdk8u322-b06", t0)]);

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::EmptyOk);

    let outcome = reconcile_snapshot(
        source,
        &previous,
        &mut QuarantineSet::new(),
        &BTreeSet::new(),
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert!(outcome.snapshot.feature_release(8).unwrap().is_empty());
}

#[tokio::test]
async fn release_within_cool_down_is_not_added() {
    let now = Utc::now();
    let fresh = release("2", "jdk8u332-b09", now - Duration::minutes(3));

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(vec![entry(&fresh)]));
    source.set_release(fresh);

    let outcome = reconcile_snapshot(
        source.clone(),
        &snapshot(Vec::new()),
        &mut QuarantineSet::new(),
        &BTreeSet::new(),
        &ReconcileOptions::default().at(now),
        None,
    )
    .await
    .unwrap();

    assert!(outcome.snapshot.feature_release(8).unwrap().is_empty());
    assert!(source.fetched().is_empty());
}

#[tokio::test]
async fn unmappable_release_is_quarantined_and_not_fetched_again() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let good = release("1", "jdk8u322-b06", t0);
    let broken = release("2", "jdk8u332-b09", t0);

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(vec![entry(&good), entry(&broken)]));
    source.set_release(good.clone());
    source.set_unmappable("2");

    let mut quarantine = QuarantineSet::new();
    let first = reconcile_snapshot(
        source.clone(),
        &snapshot(Vec::new()),
        &mut quarantine,
        &BTreeSet::new(),
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(ids(&first.snapshot), vec!["1"]);
    assert!(quarantine.contains(&ReleaseId::new("2")));
    assert_eq!(first.stats[&8].quarantined, 1);

    source.clear_fetched();
    reconcile_snapshot(
        source.clone(),
        &first.snapshot,
        &mut quarantine,
        &BTreeSet::new(),
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert!(source.fetched().is_empty());
}

#[tokio::test]
async fn explicit_refresh_skips_quarantined_release() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let fixed = release("2", "jdk8u332-b09", t0);

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(vec![entry(&fixed)]));
    source.set_release(fixed);

    let mut quarantine = QuarantineSet::new();
    quarantine.insert(ReleaseId::new("2"));
    let explicit = BTreeSet::from(["jdk8u332-b09".to_string()]);

    let outcome = reconcile_snapshot(
        source.clone(),
        &snapshot(Vec::new()),
        &mut quarantine,
        &explicit,
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert!(ids(&outcome.snapshot).is_empty());
    assert!(source.fetched().is_empty());
    assert!(quarantine.contains(&ReleaseId::new("2")));
}

#[tokio::test]
async fn changed_asset_count_triggers_refetch() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let stored = release("1", "jdk8u322-b06", t0);
    let upstream = release("1", "jdk8u322-b06", t0).with_upstream(common::TEMURIN, 5);

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(vec![entry(&upstream)]));
    source.set_release(upstream.clone());

    let outcome = reconcile_snapshot(
        source,
        &snapshot([stored]),
        &mut QuarantineSet::new(),
        &BTreeSet::new(),
        &ReconcileOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.snapshot, snapshot([upstream]));
    assert_eq!(outcome.stats[&8].binary_count, 1);
}

#[tokio::test]
async fn young_release_is_refetched_without_a_change_signal() {
    let now = Utc::now();
    let published = now - Duration::hours(2);
    let stored = release("1", "jdk8u322-b06", published);
    let mut upstream = release("1", "jdk8u322-b06", published);
    upstream.download_count = 42;
    upstream.release_link = format!("{}?refetched", upstream.release_link);

    let source = Arc::new(FakeSource::new());
    source.set_summary(8, RepoListing::Releases(vec![entry(&upstream)]));
    source.set_release(upstream.clone());
    assert_eq!(entry(&stored), entry(&upstream));

    let outcome = reconcile_snapshot(
        source.clone(),
        &snapshot([stored]),
        &mut QuarantineSet::new(),
        &BTreeSet::new(),
        &ReconcileOptions::default().at(now),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.snapshot, snapshot([upstream]));
    assert_eq!(outcome.stats[&8].young, 1);
    assert_eq!(source.fetched(), vec![ReleaseId::new("1")]);
}
