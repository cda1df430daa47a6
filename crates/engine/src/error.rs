//! Engine error types
//!
//! Ledger failures are translated into the caller-facing taxonomy here:
//! storage contention becomes `Timeout`, a history that fails replay becomes
//! `Inconsistent`, and rule violations keep their structure.

use std::fmt;
use thiserror::Error;
use verdant_core::{
    EntropyError, EventType, IdempotencyKey, IdentifierError, UnitId, UnitKind, UnitStatus, ValidationError,
};
use verdant_ledger::LedgerError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Why an aggregation was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationReason {
    /// No source batches were given
    EmptySourceSet,
    /// A source id names no committed unit
    BatchNotFound(UnitId),
    /// A source id names a product
    NotABatch(UnitId),
    /// A source batch has not completed custody transfer
    BatchNotReceived {
        /// The batch
        batch: UnitId,
        /// Its current status
        status: UnitStatus,
    },
    /// A source batch already belongs to a product
    BatchAlreadyConsumed {
        /// The batch
        batch: UnitId,
        /// The product that consumed it
        product: Option<UnitId>,
    },
    /// Source batches kept changing underneath the aggregation
    Contention,
}

impl AggregationReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AggregationReason::EmptySourceSet => "empty_source_set",
            AggregationReason::BatchNotFound(_) => "batch_not_found",
            AggregationReason::NotABatch(_) => "not_a_batch",
            AggregationReason::BatchNotReceived { .. } => "batch_not_received",
            AggregationReason::BatchAlreadyConsumed { .. } => "batch_already_consumed",
            AggregationReason::Contention => "contention",
        }
    }

    /// The batch the reason is about, if any
    pub fn batch(&self) -> Option<UnitId> {
        match self {
            AggregationReason::BatchNotFound(id) | AggregationReason::NotABatch(id) => Some(*id),
            AggregationReason::BatchNotReceived { batch, .. }
            | AggregationReason::BatchAlreadyConsumed { batch, .. } => Some(*batch),
            AggregationReason::EmptySourceSet | AggregationReason::Contention => None,
        }
    }
}

impl fmt::Display for AggregationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationReason::EmptySourceSet => f.write_str("empty source set"),
            AggregationReason::BatchNotFound(id) => write!(f, "batch not found: {}", id),
            AggregationReason::NotABatch(id) => write!(f, "{} is not a batch", id),
            AggregationReason::BatchNotReceived { batch, status } => {
                write!(f, "batch {} is {}, not Received", batch, status)
            }
            AggregationReason::BatchAlreadyConsumed {
                batch,
                product: Some(product),
            } => write!(f, "batch {} already consumed by {}", batch, product),
            AggregationReason::BatchAlreadyConsumed { batch, product: None } => {
                write!(f, "batch {} already consumed", batch)
            }
            AggregationReason::Contention => f.write_str("source batches changed concurrently"),
        }
    }
}

/// An aggregation precondition failed; nothing was written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("aggregation rejected: {reason}")]
pub struct AggregationError {
    /// What failed
    pub reason: AggregationReason,
}

impl From<AggregationReason> for AggregationError {
    fn from(reason: AggregationReason) -> Self {
        AggregationError { reason }
    }
}

/// Errors from custody, evidence and aggregation operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input could not be decoded into an identifier
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// No unit with this identifier
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The unit is closed to further events
    #[error("unit {unit} is {status} and accepts no further events")]
    UnitTerminal {
        /// Target unit
        unit: UnitId,
        /// Its terminal status
        status: UnitStatus,
    },

    /// The state machine rejected the event
    #[error("{event} is not allowed for {kind} {unit} in status {from}")]
    InvalidTransition {
        /// Target unit
        unit: UnitId,
        /// Unit kind
        kind: UnitKind,
        /// Current status
        from: UnitStatus,
        /// Rejected event
        event: EventType,
    },

    /// The idempotency key already names a different event on this unit
    #[error("idempotency key {key} was already used for a different event on {unit}")]
    IdempotencyKeyReused {
        /// Target unit
        unit: UnitId,
        /// The reused key
        key: IdempotencyKey,
    },

    /// Aggregation precondition failure
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Malformed request data
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Stored data violates an integrity rule
    #[error("inconsistent ledger state for {unit}: {reason}")]
    Inconsistent {
        /// Unit whose data is inconsistent
        unit: UnitId,
        /// What is wrong
        reason: String,
    },

    /// The ledger could not serialize access in time
    #[error("timed out waiting for {unit}")]
    Timeout {
        /// Contended unit
        unit: UnitId,
    },

    /// Identifier entropy unavailable
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other ledger failure (journal I/O, id collision)
    #[error(transparent)]
    Ledger(LedgerError),
}

impl EngineError {
    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Timeout { .. } => true,
            EngineError::Aggregation(e) => e.reason == AggregationReason::Contention,
            _ => false,
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnitNotFound(id) => EngineError::UnitNotFound(id),
            LedgerError::UnitTerminal { unit, status } => EngineError::UnitTerminal { unit, status },
            LedgerError::InvalidTransition {
                unit,
                kind,
                from,
                event,
            } => EngineError::InvalidTransition {
                unit,
                kind,
                from,
                event,
            },
            LedgerError::IdempotencyKeyReused { unit, key } => {
                EngineError::IdempotencyKeyReused { unit, key }
            }
            LedgerError::Contention { unit } => EngineError::Timeout { unit },
            LedgerError::Corrupt { unit, source } => EngineError::Inconsistent {
                unit,
                reason: source.to_string(),
            },
            other => EngineError::Ledger(other),
        }
    }
}

/// Errors from journey resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The scan is not a token or tracking URL
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// The token is well-formed but no such unit exists
    #[error("no unit with identifier {0}")]
    NotFound(UnitId),

    /// Provenance data is broken; never answered with a partial journey
    #[error("inconsistent provenance for {unit}: {reason}")]
    Inconsistent {
        /// Unit whose provenance is broken
        unit: UnitId,
        /// What is wrong
        reason: String,
    },

    /// Resolution did not finish within the configured bound
    #[error("resolve timed out after {elapsed_ms} ms")]
    Timeout {
        /// Configured bound in milliseconds
        elapsed_ms: u64,
    },

    /// Any other ledger failure
    #[error(transparent)]
    Ledger(LedgerError),
}

impl ResolveError {
    /// Only timeouts are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Timeout { .. })
    }
}
