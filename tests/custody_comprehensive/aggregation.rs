//! Aggregation tests
//!
//! All-or-nothing consumption of received batches into products.

use crate::*;

fn reason(err: Error) -> AggregationReason {
    match err {
        Error::Aggregation { reason } => reason,
        other => panic!("expected aggregation rejection, got {:?}", other),
    }
}

#[test]
fn test_aggregate_consumes_every_source() {
    let db = create_db();
    let sources: Vec<UnitId> = (0..4)
        .map(|i| received_batch(&db, harvest("Ashwagandha Root", 10.0 + i as f64)))
        .collect();

    let product = db
        .products
        .aggregate("Ashwagandha Powder", sources.clone(), processor())
        .unwrap();
    assert_eq!(product.status(), UnitStatus::Produced);
    assert_eq!(product.custody().holder, processor());

    let mut expected = sources.clone();
    expected.sort();
    assert_eq!(db.products.sources(&product.id()).unwrap(), expected);
    for id in &sources {
        let batch = db.batches.get(id).unwrap();
        assert_eq!(batch.status(), UnitStatus::Consumed);
        assert_eq!(batch.consumed_by(), Some(product.id()));
        assert!(!db.batches.exists_and_unconsumed(id));
    }
}

#[test]
fn test_all_or_nothing_on_unreceived_source() {
    let db = create_db();
    let good = received_batch(&db, ashwagandha());
    let fresh = db.batches.create(harvest("Tulsi Leaves", 2.0)).unwrap().id();
    let version = db.version();

    let err = db
        .products
        .aggregate("Blend", [good, fresh], processor())
        .unwrap_err();
    assert_eq!(
        reason(err),
        AggregationReason::BatchNotReceived {
            batch: fresh,
            status: UnitStatus::Created
        }
    );

    assert_eq!(db.version(), version);
    assert_eq!(db.batches.get(&good).unwrap().history().len(), 3);
    assert_eq!(db.batches.get(&fresh).unwrap().history().len(), 1);
    assert!(db.products.list().unwrap().is_empty());
}

#[test]
fn test_all_or_nothing_on_missing_source() {
    let db = create_db();
    let good = received_batch(&db, ashwagandha());
    let ghost = UnitId::generate(UnitKind::Batch).unwrap();
    let err = db.products.aggregate("Blend", [good, ghost], processor()).unwrap_err();
    assert_eq!(reason(err), AggregationReason::BatchNotFound(ghost));
    assert_eq!(db.batches.get(&good).unwrap().status(), UnitStatus::Received);
}

#[test]
fn test_batch_cannot_feed_two_products() {
    let db = create_db();
    let shared = received_batch(&db, ashwagandha());
    let other = received_batch(&db, harvest("Tulsi Leaves", 5.0));
    let first = db.products.aggregate("P1", [shared], processor()).unwrap();

    let err = db
        .products
        .aggregate("P2", [other, shared], processor())
        .unwrap_err();
    let reason = reason(err);
    assert_eq!(reason.batch(), Some(shared));
    assert_eq!(
        reason,
        AggregationReason::BatchAlreadyConsumed {
            batch: shared,
            product: Some(first.id())
        }
    );
    assert_eq!(db.batches.get(&other).unwrap().status(), UnitStatus::Received);
    assert_eq!(db.products.list().unwrap().len(), 1);
}

#[test]
fn test_product_cannot_be_a_source() {
    let db = create_db();
    let b1 = received_batch(&db, ashwagandha());
    let p1 = db.products.aggregate("P1", [b1], processor()).unwrap().id();
    let b2 = received_batch(&db, harvest("Tulsi Leaves", 5.0));
    let err = db.products.aggregate("P2", [b2, p1], processor()).unwrap_err();
    assert_eq!(reason(err), AggregationReason::NotABatch(p1));
}

#[test]
fn test_certification_is_and_of_sources() {
    let db = create_db();
    let organic = |db: &Verdant, id: &UnitId| {
        db.evidence
            .attach(
                id,
                EvidenceRef::new(format!("ORG-{}", id)).unwrap(),
                EvidenceType::OrganicCertification,
                grower(),
            )
            .unwrap();
    };
    let a = received_batch(&db, ashwagandha());
    let b = received_batch(&db, harvest("Tulsi Leaves", 5.0));
    organic(&db, &a);
    organic(&db, &b);
    lab_report(&db, &a, "R1");

    let product = db.products.aggregate("Blend", [a, b], processor()).unwrap();
    let trust = product.trust();
    assert!(trust.organic_certified);
    assert!(!trust.lab_tested);
    assert_eq!(db.evidence.of(&product.id()).unwrap().len(), 3);
}

#[test]
fn test_product_dates_and_validation() {
    let db = create_db();
    let b1 = received_batch(&db, ashwagandha());
    let made = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let expires = chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

    let backwards = NewProduct::new("Powder", [b1], processor())
        .manufactured_on(expires)
        .best_before(made);
    let err = db.products.aggregate_with(backwards).unwrap_err();
    assert_eq!(err.code(), "validation");
    assert!(db.batches.exists_and_unconsumed(&b1));

    let product = db
        .products
        .aggregate_with(
            NewProduct::new("Powder", [b1], processor())
                .manufactured_on(made)
                .best_before(expires),
        )
        .unwrap();
    let info = product.as_product().unwrap();
    assert_eq!(info.manufactured_on, Some(made));
    assert_eq!(info.best_before, Some(expires));
}
