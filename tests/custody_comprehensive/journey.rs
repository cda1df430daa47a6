//! Journey resolution tests
//!
//! Resolution is deterministic, read-only, and either complete or an error.

use crate::*;

fn product_with_two_sources(db: &Verdant) -> (UnitId, UnitId, UnitId) {
    let a = received_batch(db, ashwagandha());
    let b = received_batch(db, harvest("Tulsi Leaves", 6.0));
    lab_report(db, &a, "R-A");
    lab_report(db, &b, "R-B");
    let p = db.products.aggregate("Blend", [a, b], processor()).unwrap().id();
    (a, b, p)
}

#[test]
fn test_journey_includes_every_source_history() {
    let db = create_db();
    let (a, b, p) = product_with_two_sources(&db);
    let journey = db.journeys.resolve(&p.token()).unwrap();

    let mut expected = vec![a, b];
    expected.sort();
    let listed: Vec<UnitId> = journey.source_batches.iter().map(|s| s.summary.id).collect();
    assert_eq!(listed, expected);
    for source in &journey.source_batches {
        assert_eq!(source.summary.status, UnitStatus::Consumed);
        assert_eq!(source.summary.consumed_by, Some(p));
        assert_eq!(source.stages.len(), 5);
    }
    assert_eq!(journey.timeline.len(), 11);
    assert!(journey
        .timeline
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(journey.trust.lab_tested);
}

#[test]
fn test_journey_by_url_and_token_agree() {
    let db = create_db();
    let (_, _, p) = product_with_two_sources(&db);
    let by_token = db.journeys.resolve(&p.token()).unwrap();
    let by_url = db.journeys.resolve(&db.journeys.tracking_url(&p)).unwrap();
    let by_legacy_url = db
        .journeys
        .resolve(&format!("https://verdant.example/product/{}", p.token()))
        .unwrap();
    assert_eq!(by_token, by_url);
    assert_eq!(by_token, by_legacy_url);
}

#[test]
fn test_resolve_is_deterministic_and_read_only() {
    let db = create_db();
    let (a, _, p) = product_with_two_sources(&db);
    let version = db.version();
    let history = db.batches.get(&a).unwrap().history().to_vec();

    let first = db.journeys.resolve(&p.token()).unwrap().to_json().unwrap();
    let second = db.journeys.resolve(&p.token()).unwrap().to_json().unwrap();
    assert_eq!(first, second);
    assert_eq!(db.version(), version);
    assert_eq!(db.batches.get(&a).unwrap().history(), history.as_slice());
}

#[test]
fn test_offline_entries_sorted_by_device_time() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    let synced_late = chrono::Utc::now() - chrono::Duration::hours(6);
    db.batches
        .receive_with(&id, Submission::by(dealer()).occurred_at(synced_late))
        .unwrap();

    let journey = db.journeys.resolve(&id.token()).unwrap();
    // Append order is untouched
    assert_eq!(journey.stages[0].event_type, EventType::Created);
    // The timeline follows device time
    assert_eq!(journey.timeline[0].event_type, EventType::Received);
    assert_eq!(journey.timeline[0].timestamp, synced_late);
    assert!(journey.timeline[0].recorded_at >= journey.timeline[1].recorded_at);
}

#[test]
fn test_journey_serializes_stage_details() {
    let db = create_db();
    let id = received_batch(&db, ashwagandha());
    let journey = db.journeys.resolve(&id.token()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&journey.to_json().unwrap()).unwrap();
    assert_eq!(json["stages"][1]["detail"]["type"], "transferred");
    assert_eq!(json["stages"][1]["detail"]["to"]["id"], "collective");
    assert_eq!(json["trust"]["lab_tested"], false);
}

#[test]
fn test_malformed_and_unknown_tokens() {
    let db = create_db();
    let err = db.journeys.resolve("not-a-real-token").unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier(_)));

    let ghost = UnitId::generate(UnitKind::Product).unwrap();
    let err = db.journeys.resolve(&ghost.token()).unwrap_err();
    assert!(matches!(err, Error::UnitNotFound(id) if id == ghost));
}

#[tokio::test]
async fn test_async_resolve_matches_sync() {
    let db = create_db();
    let (_, _, p) = product_with_two_sources(&db);
    let sync = db.journeys.resolve(&p.token()).unwrap();
    let fanned = db.journeys.resolve_async(&p.token()).await.unwrap();
    assert_eq!(sync, fanned);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_resolve_rejects_garbage() {
    let db = create_db();
    let err = db.journeys.resolve_async("https://verdant.example/about").await.unwrap_err();
    assert_eq!(err.code(), "invalid_identifier");
}
