//! Custody state machine
//!
//! Lifecycle states for batches and products, and the table of allowed
//! transitions between them. The machine is pure: it maps
//! `(kind, current status, event type)` to a new status or an error and has
//! no knowledge of storage.
//!
//! ## Batch
//!
//! ```text
//! Created ──TRANSFERRED──▶ Transferred ──RECEIVED──▶ Received ──AGGREGATED──▶ Consumed
//!    │                                                  │  ▲
//!    └──────────────────RECEIVED───────────────────────▶│  │
//!                                                       └──┘ TRANSFERRED (hand on)
//! ```
//!
//! `EVIDENCE_ATTACHED` is an overlay: allowed in `Created`, `Transferred` and
//! `Received`, it leaves the status unchanged.
//!
//! ## Product
//!
//! ```text
//! Produced ──PACKAGED──▶ Packaged ──TRANSFERRED──▶ Distributed
//! ```
//!
//! `EVIDENCE_ATTACHED` is allowed in `Produced` and `Packaged`.
//!
//! `Consumed` and `Distributed` are terminal: every event is rejected with
//! [`TransitionError::Terminal`].

use crate::event::EventType;
use crate::identifier::UnitKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a traceable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitStatus {
    /// Batch recorded by its grower
    Created,
    /// Batch handed to another party, not yet accepted
    Transferred,
    /// Batch accepted by its current custodian
    Received,
    /// Batch consumed into a product (terminal)
    Consumed,
    /// Product created by aggregation
    Produced,
    /// Product packaged
    Packaged,
    /// Product handed to the distribution channel (terminal)
    Distributed,
}

impl UnitStatus {
    /// Status a unit of `kind` takes on its `CREATED` event
    pub fn initial(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Batch => UnitStatus::Created,
            UnitKind::Product => UnitStatus::Produced,
        }
    }

    /// Check if no further events are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitStatus::Consumed | UnitStatus::Distributed)
    }

    /// Check if this status belongs to units of `kind`
    pub fn applies_to(&self, kind: UnitKind) -> bool {
        match kind {
            UnitKind::Batch => matches!(
                self,
                UnitStatus::Created
                    | UnitStatus::Transferred
                    | UnitStatus::Received
                    | UnitStatus::Consumed
            ),
            UnitKind::Product => matches!(
                self,
                UnitStatus::Produced | UnitStatus::Packaged | UnitStatus::Distributed
            ),
        }
    }

    /// Apply an event to this status.
    ///
    /// `CREATED` is never a valid transition; use [`UnitStatus::initial`] for
    /// the seed event.
    pub fn apply(self, kind: UnitKind, event: EventType) -> Result<UnitStatus, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal { status: self });
        }
        let table = match kind {
            UnitKind::Batch => BATCH_TRANSITIONS,
            UnitKind::Product => PRODUCT_TRANSITIONS,
        };
        table
            .iter()
            .find(|(from, on, _)| *from == self && *on == event)
            .map(|(_, _, to)| *to)
            .ok_or(TransitionError::Invalid {
                kind,
                from: self,
                event,
            })
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Created => "Created",
            UnitStatus::Transferred => "Transferred",
            UnitStatus::Received => "Received",
            UnitStatus::Consumed => "Consumed",
            UnitStatus::Produced => "Produced",
            UnitStatus::Packaged => "Packaged",
            UnitStatus::Distributed => "Distributed",
        }
    }

    /// Parse a status name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL_STATUSES: [UnitStatus; 7] = [
    UnitStatus::Created,
    UnitStatus::Transferred,
    UnitStatus::Received,
    UnitStatus::Consumed,
    UnitStatus::Produced,
    UnitStatus::Packaged,
    UnitStatus::Distributed,
];

/// Allowed batch transitions: (from, event, to)
pub const BATCH_TRANSITIONS: &[(UnitStatus, EventType, UnitStatus)] = &[
    (UnitStatus::Created, EventType::Transferred, UnitStatus::Transferred),
    (UnitStatus::Created, EventType::Received, UnitStatus::Received),
    (UnitStatus::Created, EventType::EvidenceAttached, UnitStatus::Created),
    (UnitStatus::Transferred, EventType::Received, UnitStatus::Received),
    (UnitStatus::Transferred, EventType::EvidenceAttached, UnitStatus::Transferred),
    (UnitStatus::Received, EventType::Transferred, UnitStatus::Transferred),
    (UnitStatus::Received, EventType::EvidenceAttached, UnitStatus::Received),
    (UnitStatus::Received, EventType::Aggregated, UnitStatus::Consumed),
];

/// Allowed product transitions: (from, event, to)
pub const PRODUCT_TRANSITIONS: &[(UnitStatus, EventType, UnitStatus)] = &[
    (UnitStatus::Produced, EventType::Packaged, UnitStatus::Packaged),
    (UnitStatus::Produced, EventType::EvidenceAttached, UnitStatus::Produced),
    (UnitStatus::Packaged, EventType::Transferred, UnitStatus::Distributed),
    (UnitStatus::Packaged, EventType::EvidenceAttached, UnitStatus::Packaged),
];

/// A state-machine rule rejected an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The unit is closed to further events
    #[error("unit is {status} and accepts no further events")]
    Terminal {
        /// The terminal status
        status: UnitStatus,
    },

    /// The event is not allowed from the current status
    #[error("{event} is not allowed for a {kind} in status {from}")]
    Invalid {
        /// Unit kind
        kind: UnitKind,
        /// Current status
        from: UnitStatus,
        /// Rejected event
        event: EventType,
    },
}
