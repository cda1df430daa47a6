//! Custody event types
//!
//! A custody event is an immutable record of one lifecycle action against a
//! unit. Callers submit an [`EventDraft`]; the ledger turns it into a
//! [`CustodyEvent`] by assigning a per-unit sequence number and a
//! `recorded_at` stamp. Drafts may carry the time the action actually
//! happened (`occurred_at`) when entered from an offline device.
//!
//! The event type is derived from the payload, so the two can never disagree.

use crate::identifier::UnitId;
use crate::types::{EvidenceRef, IdempotencyKey, Location, Party};
use crate::unit::UnitAttributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of custody action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Unit seeded (batch harvested, product produced)
    Created,
    /// Custody handed to another party
    Transferred,
    /// Custody accepted by the receiving party
    Received,
    /// Evidence reference attached
    EvidenceAttached,
    /// Batch consumed into a product
    Aggregated,
    /// Product packaged for sale
    Packaged,
}

impl EventType {
    /// Every event type, in declaration order
    pub const ALL: [EventType; 6] = [
        EventType::Created,
        EventType::Transferred,
        EventType::Received,
        EventType::EvidenceAttached,
        EventType::Aggregated,
        EventType::Packaged,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "CREATED",
            EventType::Transferred => "TRANSFERRED",
            EventType::Received => "RECEIVED",
            EventType::EvidenceAttached => "EVIDENCE_ATTACHED",
            EventType::Aggregated => "AGGREGATED",
            EventType::Packaged => "PACKAGED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of attached evidence
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    /// Laboratory test report
    LabReport,
    /// Organic certification
    OrganicCertification,
    /// AYUSH (traditional medicine) certification
    AyushCertification,
    /// Trade registration, e.g. an export registration number
    Registration,
    /// Anything else, labelled by the submitter
    Other(String),
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceType::LabReport => f.write_str("lab_report"),
            EvidenceType::OrganicCertification => f.write_str("organic_certification"),
            EvidenceType::AyushCertification => f.write_str("ayush_certification"),
            EvidenceType::Registration => f.write_str("registration"),
            EvidenceType::Other(label) => write!(f, "other:{}", label),
        }
    }
}

/// An evidence reference together with its category
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Evidence {
    /// Opaque document handle
    pub reference: EvidenceRef,
    /// What the document attests
    pub evidence_type: EvidenceType,
}

impl Evidence {
    /// Pair a reference with its type
    pub fn new(reference: EvidenceRef, evidence_type: EvidenceType) -> Self {
        Evidence {
            reference,
            evidence_type,
        }
    }
}

/// Event-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    /// Seed event carrying the unit's immutable attributes
    Created {
        /// Batch or product attributes
        attributes: UnitAttributes,
    },
    /// Custody handed over
    Transferred {
        /// Destination party
        to: Party,
    },
    /// Custody accepted
    Received,
    /// Evidence attached
    EvidenceAttached {
        /// The attached evidence
        evidence: Evidence,
    },
    /// Batch consumed into a product
    Aggregated {
        /// The product this batch now belongs to
        product_id: UnitId,
    },
    /// Product packaged
    Packaged {
        /// Optional packaging lot or label reference
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lot: Option<String>,
    },
}

impl EventPayload {
    /// The event type this payload represents
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Created { .. } => EventType::Created,
            EventPayload::Transferred { .. } => EventType::Transferred,
            EventPayload::Received => EventType::Received,
            EventPayload::EvidenceAttached { .. } => EventType::EvidenceAttached,
            EventPayload::Aggregated { .. } => EventType::Aggregated,
            EventPayload::Packaged { .. } => EventType::Packaged,
        }
    }
}

/// A custody action as submitted, before the ledger records it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event-specific data
    pub payload: EventPayload,
    /// Who performed the action
    pub actor: Party,
    /// When the action happened on the submitting device, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Where the action happened, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Retry key; a second submission with the same key is a no-op
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<IdempotencyKey>,
}

impl EventDraft {
    /// Draft with only a payload and actor
    pub fn new(payload: EventPayload, actor: Party) -> Self {
        EventDraft {
            payload,
            actor,
            occurred_at: None,
            location: None,
            idempotency_key: None,
        }
    }

    /// Set the device-side timestamp
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    /// Set the location
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the idempotency key
    pub fn idempotent(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    /// The event type of the payload
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Turn the draft into a recorded event
    pub fn record(self, sequence: u64, recorded_at: DateTime<Utc>) -> CustodyEvent {
        CustodyEvent {
            sequence,
            payload: self.payload,
            actor: self.actor,
            recorded_at,
            occurred_at: self.occurred_at,
            location: self.location,
            idempotency_key: self.idempotency_key,
        }
    }
}

/// A recorded, immutable custody event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyEvent {
    /// Position in the unit's history, starting at 1
    pub sequence: u64,
    /// Event-specific data
    pub payload: EventPayload,
    /// Who performed the action
    pub actor: Party,
    /// When the ledger recorded the event (non-decreasing per unit)
    pub recorded_at: DateTime<Utc>,
    /// When the action happened on the submitting device, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Where the action happened, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Retry key supplied with the submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<IdempotencyKey>,
}

impl CustodyEvent {
    /// The event type of the payload
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Best-known time of the action: device time if supplied, else ledger time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.occurred_at.unwrap_or(self.recorded_at)
    }

    /// Evidence carried by this event, if any
    pub fn evidence(&self) -> Option<&Evidence> {
        match &self.payload {
            EventPayload::EvidenceAttached { evidence } => Some(evidence),
            _ => None,
        }
    }
}
