//! Evidence attachment.
//!
//! Evidence is referenced by opaque handle; the documents themselves live
//! elsewhere. Attaching never changes a unit's status.

use crate::error::Result;
use std::sync::Arc;
use verdant_core::{
    CustodyEvent, Evidence, EvidenceRecord, EvidenceRef, EvidenceType, Party, TrustSummary, UnitId,
};
use verdant_engine::{Engine, Submission};
use verdant_ledger::AppendOutcome;

/// Evidence operations.
///
/// Access via `db.evidence`.
pub struct EvidenceLog {
    engine: Arc<Engine>,
}

impl EvidenceLog {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Attach an evidence reference to a batch or product.
    pub fn attach(
        &self,
        id: &UnitId,
        reference: EvidenceRef,
        evidence_type: EvidenceType,
        by: Party,
    ) -> Result<CustodyEvent> {
        let evidence = Evidence::new(reference, evidence_type);
        Ok(self.attach_with(id, evidence, Submission::by(by))?.into_event())
    }

    /// Attach, with full submission context.
    pub fn attach_with(&self, id: &UnitId, evidence: Evidence, submission: Submission) -> Result<AppendOutcome> {
        Ok(self.engine.attach_evidence(id, evidence, submission)?)
    }

    /// Evidence that applies to a unit, including a product's source
    /// evidence as captured at aggregation.
    pub fn of(&self, id: &UnitId) -> Result<Vec<EvidenceRecord>> {
        Ok(self.engine.evidence_of(id)?)
    }

    /// Trust flags of a unit.
    pub fn trust(&self, id: &UnitId) -> Result<TrustSummary> {
        Ok(self.engine.read(id)?.trust())
    }
}
