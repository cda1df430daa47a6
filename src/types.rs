//! Public types for the Verdant API.
//!
//! Re-exported from the internal crates with a flat public path.

// Identifiers
pub use verdant_core::{UnitId, UnitKind};

// Parties, places and quantities
pub use verdant_core::{
    CatalogueEntry, Commodity, GeoPoint, Location, MeasureUnit, Party, PartyRole, Quantity,
};

// Events and units
pub use verdant_core::{
    BatchInfo, Custody, CustodyEvent, EventPayload, EventType, ProductInfo, TraceableUnit,
    UnitAttributes, UnitStatus,
};

// Evidence and trust
pub use verdant_core::{Evidence, EvidenceRecord, EvidenceRef, EvidenceType, MediaRef, TrustSummary};

// Retry keys
pub use verdant_core::IdempotencyKey;

// Requests
pub use verdant_engine::{NewBatch, NewProduct, Submission, UnitFilter};

// Journeys
pub use verdant_engine::{Journey, SourceBatch, Stage, StageDetail, UnitSummary};

// Aggregation refusals
pub use verdant_engine::AggregationReason;

// Configuration
pub use verdant_engine::{AggregationConfig, EngineConfig, ResolverConfig, TrackingConfig};
pub use verdant_ledger::{Durability, LedgerConfig};

// Append results
pub use verdant_ledger::AppendOutcome;
