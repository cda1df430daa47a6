//! Evidence Attachment
//!
//! Evidence is recorded as `EVIDENCE_ATTACHED` events. Attaching never
//! changes a unit's status; the state machine only decides whether the unit
//! still accepts events at all.

use crate::custody::Submission;
use crate::engine::Engine;
use crate::error::Result;
use tracing::info;
use verdant_core::{EventPayload, Evidence, EvidenceRecord, EvidenceType, UnitId, ValidationError};
use verdant_ledger::AppendOutcome;

impl Engine {
    /// Attach an evidence reference to a unit.
    ///
    /// Fails with `UnitTerminal` once the unit is consumed or distributed.
    pub fn attach_evidence(&self, unit: &UnitId, evidence: Evidence, submission: Submission) -> Result<AppendOutcome> {
        if let EvidenceType::Other(label) = &evidence.evidence_type {
            if label.trim().is_empty() {
                return Err(ValidationError::EmptyField("evidence type label").into());
            }
        }
        let reference = evidence.reference.clone();
        let kind = evidence.evidence_type.clone();
        let outcome = self.submit(unit, EventPayload::EvidenceAttached { evidence }, submission)?;
        if !outcome.is_duplicate() {
            info!(unit = %unit, reference = %reference, evidence_type = %kind, "evidence attached");
        }
        Ok(outcome)
    }

    /// Evidence that applies to a unit.
    ///
    /// For a product this is its own evidence followed by the source batch
    /// evidence captured when it was aggregated.
    pub fn evidence_of(&self, unit: &UnitId) -> Result<Vec<EvidenceRecord>> {
        let unit = self.read(unit)?;
        let mut records = unit.evidence();
        if let Some(info) = unit.as_product() {
            records.extend(info.source_evidence.iter().cloned());
        }
        Ok(records)
    }
}
