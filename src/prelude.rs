//! Convenient imports for Verdant.
//!
//! ```ignore
//! use verdant::prelude::*;
//!
//! let db = Verdant::ephemeral();
//! ```

// Main entry point
pub use crate::database::{Verdant, VerdantBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Facades
pub use crate::primitives::{Batches, EvidenceLog, Journeys, Products};

// Data model
pub use crate::types::{
    Commodity, CustodyEvent, EventType, Evidence, EvidenceRecord, EvidenceRef, EvidenceType,
    IdempotencyKey, Location, MeasureUnit, Party, PartyRole, Quantity, TraceableUnit,
    TrustSummary, UnitId, UnitKind, UnitStatus,
};

// Configuration
pub use crate::types::{Durability, EngineConfig};

// Requests and results
pub use crate::types::{AggregationReason, Journey, NewBatch, NewProduct, Submission};
