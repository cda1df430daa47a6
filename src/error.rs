//! Unified error type for Verdant.
//!
//! Every operation on the facade returns [`Error`]. Engine, ledger and
//! resolver errors are folded into one taxonomy so that a client can show an
//! actionable message from `code()` and the structured fields alone.

use thiserror::Error;
use verdant_core::{EventType, IdempotencyKey, IdentifierError, UnitId, UnitKind, UnitStatus, ValidationError};
use verdant_engine::{AggregationReason, EngineError, ResolveError};
use verdant_ledger::{JournalError, LedgerError};

/// All Verdant errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A scan or token could not be decoded
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// No unit with this identifier
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The unit is consumed or distributed
    #[error("unit {unit} is {status} and accepts no further events")]
    UnitTerminal {
        /// Target unit
        unit: UnitId,
        /// Its terminal status
        status: UnitStatus,
    },

    /// The custody state machine rejected the event
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

    /// The idempotency key was already used for a different event on this unit
    #[error("idempotency key {key} was already used for a different event on {unit}")]
    IdempotencyKeyReused {
        /// Target unit
        unit: UnitId,
        /// The reused key
        key: IdempotencyKey,
    },

    /// An aggregation precondition failed; nothing was written
    #[error("aggregation rejected: {reason}")]
    Aggregation {
        /// What failed
        reason: AggregationReason,
    },

    /// Stored provenance violates an integrity rule
    #[error("inconsistent ledger state for {unit}: {reason}")]
    Inconsistent {
        /// Unit whose data is broken
        unit: UnitId,
        /// What is wrong
        reason: String,
    },

    /// The operation did not finish in time; retry
    #[error("timed out: {0}")]
    Timeout(String),

    /// Malformed request data
    #[error("validation failed: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Journal or storage failure
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Verdant operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidIdentifier(_) => "invalid_identifier",
            Error::UnitNotFound(_) => "unit_not_found",
            Error::UnitTerminal { .. } => "unit_terminal",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::IdempotencyKeyReused { .. } => "idempotency_key_reused",
            Error::Aggregation { .. } => "aggregation_rejected",
            Error::Inconsistent { .. } => "inconsistent",
            Error::Timeout(_) => "timeout",
            Error::Validation(_) => "validation",
            Error::Config(_) => "config",
            Error::Storage(_) => "storage",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only timeouts are; every other rejection fails the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnitNotFound(_))
    }

    /// Check if the caller can fix the request and resubmit.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Error::InvalidIdentifier(_)
                | Error::UnitNotFound(_)
                | Error::IdempotencyKeyReused { .. }
                | Error::Validation(_)
        )
    }

    /// Check if this needs operator attention.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Inconsistent { .. } | Error::Internal(_))
    }
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidIdentifier(e) => e.into(),
            EngineError::UnitNotFound(id) => Error::UnitNotFound(id),
            EngineError::UnitTerminal { unit, status } => Error::UnitTerminal { unit, status },
            EngineError::InvalidTransition {
                unit,
                kind,
                from,
                event,
            } => Error::InvalidTransition {
                unit,
                kind,
                from,
                event,
            },
            EngineError::IdempotencyKeyReused { unit, key } => Error::IdempotencyKeyReused { unit, key },
            EngineError::Aggregation(e) if e.reason == AggregationReason::Contention => {
                Error::Timeout(e.reason.to_string())
            }
            EngineError::Aggregation(e) => Error::Aggregation { reason: e.reason },
            EngineError::Validation(e) => e.into(),
            EngineError::Inconsistent { unit, reason } => Error::Inconsistent { unit, reason },
            EngineError::Timeout { unit } => Error::Timeout(format!("waiting for {}", unit)),
            EngineError::Entropy(e) => Error::Internal(e.to_string()),
            EngineError::Config(msg) => Error::Config(msg),
            EngineError::Ledger(e) => e.into(),
        }
    }
}

impl From<ResolveError> for Error {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidIdentifier(e) => e.into(),
            ResolveError::NotFound(id) => Error::UnitNotFound(id),
            ResolveError::Inconsistent { unit, reason } => Error::Inconsistent { unit, reason },
            ResolveError::Timeout { elapsed_ms } => {
                Error::Timeout(format!("resolve exceeded {} ms", elapsed_ms))
            }
            ResolveError::Ledger(e) => e.into(),
        }
    }
}

impl From<LedgerError> for Error {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnitNotFound(id) => Error::UnitNotFound(id),
            LedgerError::UnitTerminal { unit, status } => Error::UnitTerminal { unit, status },
            LedgerError::InvalidTransition {
                unit,
                kind,
                from,
                event,
            } => Error::InvalidTransition {
                unit,
                kind,
                from,
                event,
            },
            LedgerError::IdempotencyKeyReused { unit, key } => Error::IdempotencyKeyReused { unit, key },
            LedgerError::Conflict { .. } | LedgerError::Contention { .. } => {
                Error::Timeout(e.to_string())
            }
            LedgerError::Corrupt { unit, source } => Error::Inconsistent {
                unit,
                reason: source.to_string(),
            },
            LedgerError::Journal(JournalError::Encode(e)) => e.into(),
            LedgerError::Journal(e) => Error::Storage(e.to_string()),
            LedgerError::UnitExists(_) | LedgerError::InvalidSeed { .. } => {
                Error::Internal(e.to_string())
            }
        }
    }
}

impl From<IdentifierError> for Error {
    fn from(e: IdentifierError) -> Self {
        Error::InvalidIdentifier(e.to_string())
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
