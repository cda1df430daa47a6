//! Custody lifecycle tests
//!
//! Transition rules for batches and products, terminal states, and the
//! agreement between `read` and a replay of the history.

use crate::*;

// =============================================================================
// BATCH TRANSITIONS
// =============================================================================

#[test]
fn test_new_batch_is_created() {
    let db = create_db();
    let batch = db.batches.create(ashwagandha()).unwrap();
    assert_eq!(batch.status(), UnitStatus::Created);
    assert_eq!(batch.kind(), UnitKind::Batch);
    assert_eq!(batch.history().len(), 1);
    assert_eq!(batch.history()[0].event_type(), EventType::Created);
    assert_eq!(batch.custody().holder, grower());
}

#[test]
fn test_full_transfer_chain() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();

    db.batches.transfer(&id, grower(), dealer()).unwrap();
    let unit = db.batches.get(&id).unwrap();
    assert_eq!(unit.status(), UnitStatus::Transferred);
    assert_eq!(unit.custody().in_transit_to, Some(dealer()));

    db.batches.receive(&id, dealer()).unwrap();
    let unit = db.batches.get(&id).unwrap();
    assert_eq!(unit.status(), UnitStatus::Received);
    assert_eq!(unit.custody().holder, dealer());
    assert_eq!(unit.custody().in_transit_to, None);
}

#[test]
fn test_dealer_step_is_optional() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    db.batches.receive(&id, processor()).unwrap();
    assert_eq!(db.batches.get(&id).unwrap().status(), UnitStatus::Received);
}

#[test]
fn test_received_batch_can_be_handed_on() {
    let db = create_db();
    let id = received_batch(&db, ashwagandha());
    db.batches.transfer(&id, dealer(), processor()).unwrap();
    db.batches.receive(&id, processor()).unwrap();
    let unit = db.batches.get(&id).unwrap();
    assert_eq!(unit.status(), UnitStatus::Received);
    assert_eq!(unit.custody().holder, processor());
    assert_eq!(unit.history().len(), 5);
}

#[test]
fn test_double_transfer_rejected() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    db.batches.transfer(&id, grower(), dealer()).unwrap();
    let err = db.batches.transfer(&id, grower(), processor()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: UnitStatus::Transferred,
            event: EventType::Transferred,
            ..
        }
    ));
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 2);
}

#[test]
fn test_double_receive_rejected() {
    let db = create_db();
    let id = received_batch(&db, ashwagandha());
    let err = db.batches.receive(&id, dealer()).unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
    assert!(!err.is_retryable());
}

#[test]
fn test_unknown_unit() {
    let db = create_db();
    let ghost = UnitId::generate(UnitKind::Batch).unwrap();
    let err = db.batches.receive(&ghost, dealer()).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, Error::UnitNotFound(id) if id == ghost));
}

// =============================================================================
// TERMINAL STATES
// =============================================================================

#[test]
fn test_consumed_batch_rejects_every_event() {
    let db = create_db();
    let id = received_batch(&db, ashwagandha());
    db.products.aggregate("Powder", [id], processor()).unwrap();
    let before = db.batches.get(&id).unwrap().history().len();

    let attempts = vec![
        db.batches.transfer(&id, processor(), retailer()).map(|_| ()),
        db.batches.receive(&id, processor()).map(|_| ()),
        db.evidence
            .attach(&id, EvidenceRef::new("R9").unwrap(), EvidenceType::LabReport, lab())
            .map(|_| ()),
    ];
    for attempt in attempts {
        assert!(matches!(
            attempt,
            Err(Error::UnitTerminal {
                status: UnitStatus::Consumed,
                ..
            })
        ));
    }
    assert_eq!(db.batches.get(&id).unwrap().history().len(), before);
}

#[test]
fn test_distributed_product_rejects_every_event() {
    let db = create_db();
    let b1 = received_batch(&db, ashwagandha());
    let id = db.products.aggregate("Powder", [b1], processor()).unwrap().id();
    db.products.package(&id, None, processor()).unwrap();
    db.products.distribute(&id, processor(), retailer()).unwrap();

    let attempts = vec![
        db.products.package(&id, Some("LOT-2".into()), processor()).map(|_| ()),
        db.products.distribute(&id, retailer(), processor()).map(|_| ()),
        db.evidence
            .attach(&id, EvidenceRef::new("R9").unwrap(), EvidenceType::LabReport, lab())
            .map(|_| ()),
    ];
    for attempt in attempts {
        let err = attempt.unwrap_err();
        assert_eq!(err.code(), "unit_terminal");
    }
    assert_eq!(db.products.get(&id).unwrap().status(), UnitStatus::Distributed);
}

// =============================================================================
// STATUS IS THE REPLAY OF HISTORY
// =============================================================================

#[test]
fn test_read_equals_replay() {
    let db = create_db();
    let a = received_batch(&db, ashwagandha());
    let b = db.batches.create(harvest("Tulsi Leaves", 3.0)).unwrap().id();
    db.batches.transfer(&b, grower(), dealer()).unwrap();
    let product = db.products.aggregate("Powder", [a], processor()).unwrap().id();
    db.products.package(&product, Some("LOT-1".into()), processor()).unwrap();

    for id in [a, b, product] {
        let unit = db.engine().read(&id).unwrap();
        let replayed = TraceableUnit::replay(id, unit.history().to_vec()).unwrap();
        assert_eq!(unit.status(), replayed.status());
        let snapshot = db.engine().ledger().snapshot(&id).unwrap();
        assert_eq!(snapshot.status, unit.status());
        assert_eq!(snapshot.len as usize, unit.history().len());
    }
}

#[test]
fn test_history_sequences_are_dense() {
    let db = create_db();
    let id = received_batch(&db, ashwagandha());
    lab_report(&db, &id, "R1");
    let unit = db.batches.get(&id).unwrap();
    let sequences: Vec<u64> = unit.history().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
    assert!(unit
        .history()
        .windows(2)
        .all(|w| w[0].recorded_at <= w[1].recorded_at));
}

mod prop {
    use crate::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_any_action_sequence_keeps_status_replayable(actions in proptest::collection::vec(0u8..4, 0..12)) {
            let db = create_db();
            let id = db.batches.create(ashwagandha()).unwrap().id();
            let mut accepted = 1usize;

            for (i, action) in actions.iter().enumerate() {
                let result = match action {
                    0 => db.batches.transfer(&id, grower(), dealer()).map(|_| ()),
                    1 => db.batches.receive(&id, dealer()).map(|_| ()),
                    2 => db
                        .evidence
                        .attach(
                            &id,
                            EvidenceRef::new(format!("R{}", i)).unwrap(),
                            EvidenceType::LabReport,
                            lab(),
                        )
                        .map(|_| ()),
                    _ => db.batches.transfer(&id, dealer(), processor()).map(|_| ()),
                };
                match result {
                    Ok(()) => accepted += 1,
                    Err(e) => prop_assert_eq!(e.code(), "invalid_transition"),
                }

                let unit = db.batches.get(&id).unwrap();
                prop_assert_eq!(unit.history().len(), accepted);
                let replayed = TraceableUnit::replay(id, unit.history().to_vec()).unwrap();
                prop_assert_eq!(replayed.status(), unit.status());
            }
        }
    }
}
