//! Idempotency tests
//!
//! A resubmitted event with a known key returns the original event and
//! leaves the history untouched. A different event under a known key is
//! rejected.

use crate::*;

#[test]
fn test_transfer_resubmitted_once() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    let submission = Submission::by(grower()).idempotent(key("tx-1"));

    let first = db.batches.transfer_with(&id, dealer(), submission.clone()).unwrap();
    let second = db.batches.transfer_with(&id, dealer(), submission).unwrap();

    assert!(!first.is_duplicate());
    assert!(second.is_duplicate());
    assert_eq!(first.event(), second.event());
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 2);
}

#[test]
fn test_receive_retry_after_state_moved_on() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    let submission = Submission::by(dealer()).idempotent(key("rx-1"));
    db.batches.receive_with(&id, submission.clone()).unwrap();
    lab_report(&db, &id, "R1");

    // A plain resubmission would be an invalid Received -> Received
    let retry = db.batches.receive_with(&id, submission).unwrap();
    assert!(retry.is_duplicate());
    assert_eq!(retry.event().sequence, 2);
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 3);
}

#[test]
fn test_duplicate_accepted_on_terminal_unit() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    let submission = Submission::by(dealer()).idempotent(key("rx-2"));
    db.batches.receive_with(&id, submission.clone()).unwrap();
    db.products.aggregate("Powder", [id], processor()).unwrap();

    let retry = db.batches.receive_with(&id, submission).unwrap();
    assert!(retry.is_duplicate());
    assert_eq!(db.batches.get(&id).unwrap().status(), UnitStatus::Consumed);
}

#[test]
fn test_keys_are_scoped_per_unit() {
    let db = create_db();
    let a = db.batches.create(ashwagandha()).unwrap().id();
    let b = db.batches.create(harvest("Tulsi Leaves", 4.0)).unwrap().id();
    let submission = Submission::by(dealer()).idempotent(key("rx-shared"));

    assert!(!db.batches.receive_with(&a, submission.clone()).unwrap().is_duplicate());
    assert!(!db.batches.receive_with(&b, submission).unwrap().is_duplicate());
    assert_eq!(db.batches.list_by_status(UnitStatus::Received).unwrap().len(), 2);
}

#[test]
fn test_without_key_resubmission_is_rejected() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    db.batches.receive(&id, dealer()).unwrap();
    assert!(db.batches.receive(&id, dealer()).is_err());
}

#[test]
fn test_evidence_resubmitted_once() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    let evidence = Evidence::new(EvidenceRef::new("R1").unwrap(), EvidenceType::LabReport);
    let submission = Submission::by(lab()).idempotent(key("upload-1"));

    db.evidence.attach_with(&id, evidence.clone(), submission.clone()).unwrap();
    let retry = db.evidence.attach_with(&id, evidence, submission).unwrap();
    assert!(retry.is_duplicate());
    assert_eq!(db.evidence.of(&id).unwrap().len(), 1);
}

#[test]
fn test_aggregation_resubmitted_once() {
    let db = create_db();
    let b1 = received_batch(&db, ashwagandha());
    let b2 = received_batch(&db, harvest("Tulsi Leaves", 8.0));
    let request = NewProduct::new("Blend", [b1, b2], processor()).idempotent(key("agg-1"));

    let first = db.products.aggregate_with(request.clone()).unwrap();
    let second = db.products.aggregate_with(request).unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(db.products.list().unwrap().len(), 1);
}

#[test]
fn test_key_reused_for_different_event_is_rejected() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    db.batches
        .transfer_with(&id, dealer(), Submission::by(grower()).idempotent(key("k1")))
        .unwrap();

    let err = db
        .batches
        .receive_with(&id, Submission::by(dealer()).idempotent(key("k1")))
        .unwrap_err();
    assert_eq!(err.code(), "idempotency_key_reused");
    assert!(err.is_user_correctable());

    let unit = db.batches.get(&id).unwrap();
    assert_eq!(unit.status(), UnitStatus::Transferred);
    assert_eq!(unit.history().len(), 2);
}

#[test]
fn test_key_reused_by_another_actor_is_rejected() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    db.batches
        .transfer_with(&id, dealer(), Submission::by(grower()).idempotent(key("tx-9")))
        .unwrap();

    let err = db
        .batches
        .transfer_with(&id, dealer(), Submission::by(retailer()).idempotent(key("tx-9")))
        .unwrap_err();
    assert_eq!(err.code(), "idempotency_key_reused");
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 2);
}
