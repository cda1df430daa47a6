//! Custody Comprehensive Test Suite
//!
//! End-to-end tests through the `verdant` facade.
//!
//! ## Key Verification Points
//!
//! 1. Status always equals the replay of history
//! 2. Consumed and distributed units accept no events
//! 3. Aggregation is all-or-nothing and never double-consumes a batch
//! 4. Resubmitting with the same idempotency key is a no-op success
//! 5. Journeys are deterministic, read-only and never partial
//! 6. The journal survives a reopen and rejects mid-file corruption
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test custody_comprehensive
//!
//! # Aggregation only
//! cargo test --test custody_comprehensive aggregation::
//! ```

use verdant::prelude::*;

// Test modules
pub mod aggregation;
pub mod concurrency;
pub mod evidence;
pub mod idempotency;
pub mod journal;
pub mod journey;
pub mod lifecycle;
pub mod scenarios;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// In-memory ledger
pub fn create_db() -> Verdant {
    Verdant::ephemeral()
}

pub fn grower() -> Party {
    Party::grower("suresh").unwrap()
}

pub fn dealer() -> Party {
    Party::intermediary("collective").unwrap()
}

pub fn processor() -> Party {
    Party::processor("ayur-mfg").unwrap()
}

pub fn lab() -> Party {
    Party::new("nabl-lab", PartyRole::Laboratory).unwrap()
}

pub fn retailer() -> Party {
    Party::new("corner-shop", PartyRole::Retailer).unwrap()
}

/// 50 kg of Ashwagandha Root from Neemuch
pub fn ashwagandha() -> NewBatch {
    harvest("Ashwagandha Root", 50.0)
}

pub fn harvest(commodity: &str, kg: f64) -> NewBatch {
    NewBatch::new(
        Commodity::from_label(commodity).unwrap(),
        Quantity::new(kg, MeasureUnit::Kilograms).unwrap(),
        Location::named("Neemuch, Madhya Pradesh").unwrap(),
        grower(),
    )
}

/// Create a batch and walk it through grower -> dealer -> received
pub fn received_batch(db: &Verdant, request: NewBatch) -> UnitId {
    let id = db.batches.create(request).unwrap().id();
    db.batches.transfer(&id, grower(), dealer()).unwrap();
    db.batches.receive(&id, dealer()).unwrap();
    id
}

pub fn lab_report(db: &Verdant, id: &UnitId, reference: &str) {
    db.evidence
        .attach(id, EvidenceRef::new(reference).unwrap(), EvidenceType::LabReport, lab())
        .unwrap();
}

pub fn key(raw: &str) -> IdempotencyKey {
    IdempotencyKey::new(raw).unwrap()
}
