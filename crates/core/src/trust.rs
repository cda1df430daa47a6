//! Trust summary derived from attached evidence
//!
//! Flags are computed only by scanning evidence types. Nothing is ever set
//! without a matching evidence record behind it.

use crate::event::{Evidence, EvidenceType};
use serde::{Deserialize, Serialize};

/// Certification flags shown to a verifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrustSummary {
    /// At least one evidence reference exists
    pub evidence_present: bool,
    /// A lab report is attached
    pub lab_tested: bool,
    /// An organic certification is attached
    pub organic_certified: bool,
    /// An AYUSH certification is attached
    pub ayush_certified: bool,
}

impl TrustSummary {
    /// Scan a set of evidence
    pub fn from_evidence<'a>(evidence: impl IntoIterator<Item = &'a Evidence>) -> Self {
        evidence
            .into_iter()
            .fold(TrustSummary::default(), |mut acc, e| {
                acc.evidence_present = true;
                match e.evidence_type {
                    EvidenceType::LabReport => acc.lab_tested = true,
                    EvidenceType::OrganicCertification => acc.organic_certified = true,
                    EvidenceType::AyushCertification => acc.ayush_certified = true,
                    EvidenceType::Registration | EvidenceType::Other(_) => {}
                }
                acc
            })
    }

    /// Combine the summaries of aggregated inputs.
    ///
    /// A certification flag holds only if it holds for every input;
    /// `evidence_present` holds if any input has evidence. An empty input
    /// set yields the all-false summary.
    pub fn all_of(summaries: impl IntoIterator<Item = TrustSummary>) -> Self {
        let mut iter = summaries.into_iter();
        let first = match iter.next() {
            Some(first) => first,
            None => return TrustSummary::default(),
        };
        iter.fold(first, |acc, s| TrustSummary {
            evidence_present: acc.evidence_present || s.evidence_present,
            lab_tested: acc.lab_tested && s.lab_tested,
            organic_certified: acc.organic_certified && s.organic_certified,
            ayush_certified: acc.ayush_certified && s.ayush_certified,
        })
    }

    /// Flag-wise OR
    pub fn or(self, other: TrustSummary) -> Self {
        TrustSummary {
            evidence_present: self.evidence_present || other.evidence_present,
            lab_tested: self.lab_tested || other.lab_tested,
            organic_certified: self.organic_certified || other.organic_certified,
            ayush_certified: self.ayush_certified || other.ayush_certified,
        }
    }
}
