//! Evidence tests
//!
//! Attachment never changes status, trust flags come only from evidence,
//! and a product keeps the evidence its sources had at aggregation.

use crate::*;

#[test]
fn test_attach_in_every_open_status() {
    let db = create_db();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    lab_report(&db, &id, "R1");
    assert_eq!(db.batches.get(&id).unwrap().status(), UnitStatus::Created);

    db.batches.transfer(&id, grower(), dealer()).unwrap();
    lab_report(&db, &id, "R2");
    assert_eq!(db.batches.get(&id).unwrap().status(), UnitStatus::Transferred);

    db.batches.receive(&id, dealer()).unwrap();
    lab_report(&db, &id, "R3");
    let unit = db.batches.get(&id).unwrap();
    assert_eq!(unit.status(), UnitStatus::Received);
    assert_eq!(unit.lab_report_ref().unwrap().as_str(), "R3");
    assert_eq!(db.evidence.of(&id).unwrap().len(), 3);
}

#[test]
fn test_trust_flags_never_fabricated() {
    let db = create_db();
    let id = received_batch(&db, ashwagandha());
    assert_eq!(db.evidence.trust(&id).unwrap(), TrustSummary::default());

    db.evidence
        .attach(
            &id,
            EvidenceRef::new("FSSAI-1").unwrap(),
            EvidenceType::Registration,
            grower(),
        )
        .unwrap();
    let trust = db.evidence.trust(&id).unwrap();
    assert!(trust.evidence_present);
    assert!(!trust.lab_tested);
    assert!(!trust.organic_certified);
    assert!(!trust.ayush_certified);
}

#[test]
fn test_same_reference_listed_once() {
    let db = create_db();
    let id = received_batch(&db, ashwagandha());
    lab_report(&db, &id, "R1");
    lab_report(&db, &id, "R1");
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 5);
    let records = db.evidence.of(&id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sequence, 4);
    assert_eq!(records[0].attached_by, lab());
}

#[test]
fn test_certifications_recorded_at_creation() {
    let db = create_db();
    let request = ashwagandha().certified(Evidence::new(
        EvidenceRef::new("ORG-118").unwrap(),
        EvidenceType::OrganicCertification,
    ));
    let batch = db.batches.create(request).unwrap();
    assert_eq!(batch.history().len(), 2);
    assert_eq!(batch.history()[1].event_type(), EventType::EvidenceAttached);
    assert!(batch.trust().organic_certified);
    assert_eq!(db.version(), 1);
}

#[test]
fn test_product_evidence_is_own_or_sources() {
    let db = create_db();
    let b1 = received_batch(&db, ashwagandha());
    let product = db.products.aggregate("Powder", [b1], processor()).unwrap().id();
    assert!(!db.evidence.trust(&product).unwrap().lab_tested);

    lab_report(&db, &product, "R-PROD");
    let trust = db.evidence.trust(&product).unwrap();
    assert!(trust.lab_tested);
    assert_eq!(db.products.get(&product).unwrap().status(), UnitStatus::Produced);
}

#[test]
fn test_source_snapshot_survives_in_product() {
    let db = create_db();
    let b1 = received_batch(&db, ashwagandha());
    lab_report(&db, &b1, "R1");
    let product = db.products.aggregate("Powder", [b1], processor()).unwrap();

    // The batch is closed now; nothing can change what the product captured
    assert!(db
        .evidence
        .attach(&b1, EvidenceRef::new("R2").unwrap(), EvidenceType::LabReport, lab())
        .is_err());
    let info = product.as_product().unwrap();
    assert_eq!(info.source_evidence.len(), 1);
    assert_eq!(info.source_evidence[0].unit_id, b1);
    assert!(info.source_trust.lab_tested);
    assert_eq!(db.products.get(&product.id()).unwrap().as_product(), Some(info));
}
