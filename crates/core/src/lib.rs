//! Core types for the Verdant custody ledger
//!
//! This crate defines the data model shared by every layer:
//! - [`UnitId`] and the public token codec ([`decode`])
//! - Custody events ([`EventDraft`], [`CustodyEvent`], [`EventPayload`])
//! - Units rebuilt from history ([`TraceableUnit`])
//! - The custody state machine ([`UnitStatus::apply`])
//! - Evidence-derived trust flags ([`TrustSummary`])
//!
//! Nothing here performs I/O or holds locks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod identifier;
pub mod lifecycle;
pub mod trust;
pub mod types;
pub mod unit;

pub use error::ValidationError;
pub use event::{CustodyEvent, EventDraft, EventPayload, EventType, Evidence, EvidenceType};
pub use identifier::{decode, decode_with, EntropyError, IdentifierError, UnitId, UnitKind};
pub use lifecycle::{TransitionError, UnitStatus};
pub use trust::TrustSummary;
pub use types::{
    CatalogueEntry, Commodity, EvidenceRef, GeoPoint, IdempotencyKey, Location, MeasureUnit,
    MediaRef, Party, PartyRole, Quantity,
};
pub use unit::{
    check_seed, replay_status, BatchInfo, Custody, EvidenceRecord, ProductInfo, ReplayError,
    TraceableUnit, UnitAttributes,
};
