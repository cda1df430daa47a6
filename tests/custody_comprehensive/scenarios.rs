//! End-to-end scenarios
//!
//! Whole supply-chain runs from harvest to a consumer scan.

use crate::*;

#[test]
fn test_ashwagandha_from_field_to_scan() {
    let db = create_db();

    let b1 = db.batches.create(ashwagandha()).unwrap();
    assert_eq!(b1.as_batch().unwrap().commodity.name, "Ashwagandha Root");
    assert_eq!(b1.as_batch().unwrap().quantity.amount(), 50.0);
    assert_eq!(b1.as_batch().unwrap().quantity.unit(), MeasureUnit::Kilograms);
    let b1 = b1.id();

    db.batches.transfer(&b1, grower(), dealer()).unwrap();
    db.batches.receive(&b1, dealer()).unwrap();
    lab_report(&db, &b1, "R1");
    let p1 = db
        .products
        .aggregate("Ashwagandha Powder", [b1], processor())
        .unwrap();
    assert_eq!(p1.as_product().unwrap().name, "Ashwagandha Powder");

    let journey = db.journeys.resolve(&p1.id().token()).unwrap();
    assert_eq!(journey.id(), p1.id());
    assert_eq!(journey.source_batches.len(), 1);
    assert_eq!(journey.source_batches[0].summary.id, b1);
    let refs: Vec<&str> = journey.evidence_refs().map(|r| r.as_str()).collect();
    assert_eq!(refs, vec!["R1"]);
    assert!(journey.trust.lab_tested);
    assert!(journey.trust.evidence_present);
}

#[test]
fn test_empty_aggregation_creates_nothing() {
    let db = create_db();
    let err = db
        .products
        .aggregate("Ashwagandha Powder", Vec::new(), processor())
        .unwrap_err();
    assert!(matches!(
        &err,
        Error::Aggregation {
            reason: AggregationReason::EmptySourceSet
        }
    ));
    assert_eq!(err.to_string(), "aggregation rejected: empty source set");
    assert!(db.products.list().unwrap().is_empty());
    assert_eq!(db.version(), 0);
}

#[test]
fn test_unreal_token_never_resolves() {
    let db = create_db();
    let err = db.journeys.resolve("not-a-real-token").unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier(_)));

    // Well-formed but never issued
    let unissued = UnitId::generate(UnitKind::Batch).unwrap();
    let err = db.journeys.resolve(&unissued.token()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_two_growers_one_product_to_retail() {
    let db = create_db();
    let meena = Party::grower("meena").unwrap();

    let a = received_batch(&db, ashwagandha());
    let b = db
        .batches
        .create(NewBatch::new(
            Commodity::from_label("Tulsi Leaves (Ocimum tenuiflorum)").unwrap(),
            Quantity::new(750.0, MeasureUnit::Grams).unwrap(),
            Location::named("Sitapur").unwrap(),
            meena.clone(),
        ))
        .unwrap()
        .id();
    // Meena sells straight to the processor
    db.batches.receive(&b, processor()).unwrap();

    let p = db
        .products
        .aggregate_with(
            NewProduct::new("Immunity Blend", [a, b], processor())
                .at(Location::named("Indore plant").unwrap())
                .idempotent(key("run-2024-07")),
        )
        .unwrap()
        .id();
    db.products.package(&p, Some("IB-0007".into()), processor()).unwrap();
    db.products.distribute(&p, processor(), retailer()).unwrap();

    let journey = db.journeys.resolve(&db.journeys.tracking_url(&p)).unwrap();
    assert_eq!(journey.unit.status, UnitStatus::Distributed);
    assert_eq!(journey.unit.custody.holder, retailer());
    assert_eq!(journey.source_batches.len(), 2);
    assert_eq!(journey.stages.len(), 3);
    assert!(journey.source_batches.iter().any(|s| s.stages[0].actor == meena));
    assert_eq!(
        journey.timeline.iter().filter(|s| s.event_type == EventType::Aggregated).count(),
        2
    );
    assert!(!journey.trust.evidence_present);

    assert_eq!(db.batches.list_by_party("meena").unwrap().len(), 1);
    assert_eq!(db.batches.list_by_status(UnitStatus::Consumed).unwrap().len(), 2);
}
