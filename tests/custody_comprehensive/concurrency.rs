//! Concurrency tests
//!
//! Events against one unit are serialized; racing writers never interleave
//! into an invalid history.

use crate::*;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

#[test]
fn test_concurrent_evidence_on_one_batch() {
    let db = Arc::new(create_db());
    let id = received_batch(&db, ashwagandha());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                db.evidence
                    .attach(
                        &id,
                        EvidenceRef::new(format!("R{}", i)).unwrap(),
                        EvidenceType::LabReport,
                        lab(),
                    )
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let unit = db.batches.get(&id).unwrap();
    assert_eq!(unit.history().len(), 3 + THREADS);
    let sequences: Vec<u64> = unit.history().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=(3 + THREADS) as u64).collect::<Vec<_>>());
    assert_eq!(unit.status(), UnitStatus::Received);
}

#[test]
fn test_racing_receives_single_winner() {
    let db = Arc::new(create_db());
    let id = db.batches.create(ashwagandha()).unwrap().id();
    db.batches.transfer(&id, grower(), dealer()).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let submission = Submission::by(dealer()).idempotent(key(&format!("rx-{}", i)));
                db.batches.receive_with(&id, submission)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.into_iter().filter_map(|r| r.err()) {
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: UnitStatus::Received,
                ..
            }
        ));
    }
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 3);
}

#[test]
fn test_racing_aggregations_single_winner() {
    let db = Arc::new(create_db());
    let shared = received_batch(&db, ashwagandha());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                db.products.aggregate(format!("P{}", i), [shared], processor())
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<UnitId> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().map(TraceableUnit::id))
        .collect();
    assert_eq!(winners.len(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err, Error::Aggregation { .. }) || err.is_retryable(),
            "unexpected error {:?}",
            err
        );
    }

    let batch = db.batches.get(&shared).unwrap();
    assert_eq!(batch.consumed_by(), Some(winners[0]));
    assert_eq!(batch.history().len(), 4);
    assert_eq!(db.products.list().unwrap().len(), 1);
}

#[test]
fn test_overlapping_aggregations_never_share_a_batch() {
    let db = Arc::new(create_db());
    let batches: Vec<UnitId> = (0..THREADS + 1)
        .map(|i| received_batch(&db, harvest("Giloy Stem", 1.0 + i as f64)))
        .collect();
    let barrier = Arc::new(Barrier::new(THREADS));

    // Thread i wants batches i and i + 1, so neighbours collide
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            let pair = [batches[i], batches[i + 1]];
            thread::spawn(move || {
                barrier.wait();
                db.products.aggregate(format!("P{}", i), pair, processor()).ok()
            })
        })
        .collect();
    let products: Vec<TraceableUnit> = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap())
        .collect();
    assert!(!products.is_empty());

    let mut claimed = std::collections::BTreeSet::new();
    for product in &products {
        for source in &product.as_product().unwrap().source_batch_ids {
            assert!(claimed.insert(*source), "batch {} used twice", source);
            assert_eq!(db.batches.get(source).unwrap().consumed_by(), Some(product.id()));
        }
    }
    for id in &batches {
        let batch = db.batches.get(id).unwrap();
        assert_eq!(batch.status() == UnitStatus::Consumed, claimed.contains(id));
    }
}

#[test]
fn test_independent_units_in_parallel() {
    let db = Arc::new(create_db());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let id = received_batch(&db, ashwagandha());
                db.products.aggregate("Powder", [id], processor()).unwrap().id()
            })
        })
        .collect();
    let products: Vec<UnitId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(db.products.list().unwrap().len(), THREADS);
    for id in products {
        let journey = db.journeys.resolve(&id.token()).unwrap();
        assert_eq!(journey.source_batches.len(), 1);
    }
}
