//! Traceable units and history replay
//!
//! A [`TraceableUnit`] is never stored as such. It is rebuilt from its custody
//! history by [`TraceableUnit::replay`]: the `CREATED` seed event carries the
//! unit's immutable attributes, and every following event is run through the
//! custody state machine. Status therefore cannot drift from the history.

use crate::event::{CustodyEvent, Evidence, EventPayload, EventType, EvidenceType};
use crate::identifier::{UnitId, UnitKind};
use crate::lifecycle::{TransitionError, UnitStatus};
use crate::trust::TrustSummary;
use crate::types::{Commodity, EvidenceRef, Location, MediaRef, Party, Quantity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Immutable attributes of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// What was harvested
    pub commodity: Commodity,
    /// How much
    pub quantity: Quantity,
    /// Where it was harvested
    pub origin: Location,
    /// Who created the batch
    pub origin_party: Party,
    /// Photo of the harvest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<MediaRef>,
}

/// Immutable attributes of a product, fixed at aggregation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Product name
    pub name: String,
    /// Batches consumed to make this product (never empty)
    pub source_batch_ids: BTreeSet<UnitId>,
    /// Who produced it
    pub producing_party: Party,
    /// Manufacture date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufactured_on: Option<NaiveDate>,
    /// Best-before date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_before: Option<NaiveDate>,
    /// Evidence held by the source batches when they were aggregated
    pub source_evidence: Vec<EvidenceRecord>,
    /// Combined trust of the source batches when they were aggregated
    pub source_trust: TrustSummary,
}

/// Kind-specific attributes carried by the seed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitAttributes {
    /// Batch attributes
    Batch(BatchInfo),
    /// Product attributes
    Product(ProductInfo),
}

impl UnitAttributes {
    /// Unit kind these attributes describe
    pub fn kind(&self) -> UnitKind {
        match self {
            UnitAttributes::Batch(_) => UnitKind::Batch,
            UnitAttributes::Product(_) => UnitKind::Product,
        }
    }
}

/// One piece of evidence attached to a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Unit the evidence was attached to
    pub unit_id: UnitId,
    /// The evidence itself
    pub evidence: Evidence,
    /// Who attached it
    pub attached_by: Party,
    /// When it was attached
    pub attached_at: DateTime<Utc>,
    /// Sequence of the attaching event in the unit's history
    pub sequence: u64,
}

/// Who holds a unit right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custody {
    /// Party holding custody
    pub holder: Party,
    /// Party a pending transfer is addressed to
    pub in_transit_to: Option<Party>,
}

/// A history could not be replayed into a valid unit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// No events at all
    #[error("history is empty")]
    EmptyHistory,

    /// First event was not a seed
    #[error("first event is {found}, expected CREATED")]
    MissingSeed {
        /// Event type found instead
        found: EventType,
    },

    /// Seed attributes describe the other namespace
    #[error("seed describes a {found} but the identifier is a {expected}")]
    KindMismatch {
        /// Kind from the identifier
        expected: UnitKind,
        /// Kind from the seed attributes
        found: UnitKind,
    },

    /// Sequence numbers are not 1, 2, 3, ...
    #[error("expected sequence {expected}, found {found}")]
    SequenceGap {
        /// Expected sequence
        expected: u64,
        /// Sequence found
        found: u64,
    },

    /// `recorded_at` went backwards
    #[error("event {sequence} was recorded before its predecessor")]
    RecordedOutOfOrder {
        /// Offending sequence
        sequence: u64,
    },

    /// A product seed with no sources
    #[error("product has no source batches")]
    EmptySources,

    /// The state machine rejected an event
    #[error("event {sequence}: {source}")]
    Transition {
        /// Offending sequence
        sequence: u64,
        /// Underlying rule violation
        source: TransitionError,
    },
}

/// A batch or product with its full custody history
///
/// Deserializing reads only `id` and `history` and rebuilds the rest through
/// [`TraceableUnit::replay`], so a serialized status or attribute set that
/// disagrees with the history is ignored and a broken history is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredUnit")]
pub struct TraceableUnit {
    id: UnitId,
    status: UnitStatus,
    created_at: DateTime<Utc>,
    attributes: UnitAttributes,
    history: Vec<CustodyEvent>,
}

#[derive(Deserialize)]
struct StoredUnit {
    id: UnitId,
    history: Vec<CustodyEvent>,
}

impl TryFrom<StoredUnit> for TraceableUnit {
    type Error = ReplayError;

    fn try_from(stored: StoredUnit) -> Result<Self, Self::Error> {
        TraceableUnit::replay(stored.id, stored.history)
    }
}

impl TraceableUnit {
    /// Rebuild a unit by replaying its history through the state machine
    pub fn replay(id: UnitId, history: Vec<CustodyEvent>) -> Result<Self, ReplayError> {
        let seed = history.first().ok_or(ReplayError::EmptyHistory)?;
        let attributes = check_seed(id, &seed.payload)?.clone();
        let created_at = seed.recorded_at;

        let status = replay_status(id.kind(), &history)?;
        Ok(TraceableUnit {
            id,
            status,
            created_at,
            attributes,
            history,
        })
    }

    /// Unit identifier
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Batch or product
    pub fn kind(&self) -> UnitKind {
        self.attributes.kind()
    }

    /// Current status, derived from history
    pub fn status(&self) -> UnitStatus {
        self.status
    }

    /// When the seed event was recorded
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Kind-specific attributes
    pub fn attributes(&self) -> &UnitAttributes {
        &self.attributes
    }

    /// Full custody history in append order
    pub fn history(&self) -> &[CustodyEvent] {
        &self.history
    }

    /// Batch attributes, if this is a batch
    pub fn as_batch(&self) -> Option<&BatchInfo> {
        match &self.attributes {
            UnitAttributes::Batch(info) => Some(info),
            UnitAttributes::Product(_) => None,
        }
    }

    /// Product attributes, if this is a product
    pub fn as_product(&self) -> Option<&ProductInfo> {
        match &self.attributes {
            UnitAttributes::Product(info) => Some(info),
            UnitAttributes::Batch(_) => None,
        }
    }

    /// Evidence attached directly to this unit.
    ///
    /// The same reference attached twice with the same type is listed once,
    /// at its first attachment.
    pub fn evidence(&self) -> Vec<EvidenceRecord> {
        let mut seen = BTreeSet::new();
        self.history
            .iter()
            .filter_map(|event| event.evidence().map(|e| (event, e)))
            .filter(|(_, e)| seen.insert((*e).clone()))
            .map(|(event, e)| EvidenceRecord {
                unit_id: self.id,
                evidence: e.clone(),
                attached_by: event.actor.clone(),
                attached_at: event.timestamp(),
                sequence: event.sequence,
            })
            .collect()
    }

    /// Trust summary: own evidence, plus the source snapshot for products
    pub fn trust(&self) -> TrustSummary {
        let own = self.evidence();
        let own = TrustSummary::from_evidence(own.iter().map(|r| &r.evidence));
        match &self.attributes {
            UnitAttributes::Batch(_) => own,
            UnitAttributes::Product(info) => own.or(info.source_trust),
        }
    }

    /// Most recently attached lab report
    pub fn lab_report_ref(&self) -> Option<&EvidenceRef> {
        self.history
            .iter()
            .rev()
            .filter_map(CustodyEvent::evidence)
            .find(|e| e.evidence_type == EvidenceType::LabReport)
            .map(|e| &e.reference)
    }

    /// Product this batch was consumed into
    pub fn consumed_by(&self) -> Option<UnitId> {
        self.history.iter().find_map(|event| match &event.payload {
            EventPayload::Aggregated { product_id } => Some(*product_id),
            _ => None,
        })
    }

    /// Party currently holding the unit
    pub fn custody(&self) -> Custody {
        let mut events = self.history.iter();
        let mut holder = match events.next() {
            Some(seed) => seed.actor.clone(),
            None => self.creator().clone(),
        };
        let mut in_transit_to = None;
        for event in events {
            match &event.payload {
                EventPayload::Transferred { to } => match self.kind() {
                    UnitKind::Batch => in_transit_to = Some(to.clone()),
                    UnitKind::Product => holder = to.clone(),
                },
                EventPayload::Received => {
                    holder = event.actor.clone();
                    in_transit_to = None;
                }
                _ => {}
            }
        }
        Custody {
            holder,
            in_transit_to,
        }
    }

    /// Whether `party_id` created, held, or is due to receive this unit
    pub fn involves(&self, party_id: &str) -> bool {
        let custody = self.custody();
        self.creator().id == party_id
            || custody.holder.id == party_id
            || custody.in_transit_to.map_or(false, |p| p.id == party_id)
    }

    fn creator(&self) -> &Party {
        match &self.attributes {
            UnitAttributes::Batch(info) => &info.origin_party,
            UnitAttributes::Product(info) => &info.producing_party,
        }
    }
}

/// Check that `payload` is a valid seed for `id` and return its attributes
pub fn check_seed(id: UnitId, payload: &EventPayload) -> Result<&UnitAttributes, ReplayError> {
    let attributes = match payload {
        EventPayload::Created { attributes } => attributes,
        other => {
            return Err(ReplayError::MissingSeed {
                found: other.event_type(),
            })
        }
    };
    if attributes.kind() != id.kind() {
        return Err(ReplayError::KindMismatch {
            expected: id.kind(),
            found: attributes.kind(),
        });
    }
    if let UnitAttributes::Product(info) = attributes {
        if info.source_batch_ids.is_empty() {
            return Err(ReplayError::EmptySources);
        }
    }
    Ok(attributes)
}

/// Replay the status of a history without building the unit
pub fn replay_status(kind: UnitKind, history: &[CustodyEvent]) -> Result<UnitStatus, ReplayError> {
    let mut status: Option<UnitStatus> = None;
    let mut previous: Option<&CustodyEvent> = None;

    for (index, event) in history.iter().enumerate() {
        let expected = index as u64 + 1;
        if event.sequence != expected {
            return Err(ReplayError::SequenceGap {
                expected,
                found: event.sequence,
            });
        }
        if let Some(prev) = previous {
            if event.recorded_at < prev.recorded_at {
                return Err(ReplayError::RecordedOutOfOrder {
                    sequence: event.sequence,
                });
            }
        }

        status = Some(match status {
            None if event.event_type() == EventType::Created => UnitStatus::initial(kind),
            None => {
                return Err(ReplayError::MissingSeed {
                    found: event.event_type(),
                })
            }
            Some(current) => current
                .apply(kind, event.event_type())
                .map_err(|source| ReplayError::Transition {
                    sequence: event.sequence,
                    source,
                })?,
        });
        previous = Some(event);
    }

    status.ok_or(ReplayError::EmptyHistory)
}
