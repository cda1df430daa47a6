//! Ledger error types

use crate::journal::JournalError;
use thiserror::Error;
use verdant_core::{EventType, IdempotencyKey, ReplayError, UnitId, UnitKind, UnitStatus};

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors returned by a [`crate::LedgerStore`]
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No unit with this identifier has been committed
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The unit is in a terminal status
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

    /// A unit with this identifier already exists (identifiers are never reused)
    #[error("unit already exists: {0}")]
    UnitExists(UnitId),

    /// A create carried an invalid seed
    #[error("invalid seed for {unit}: {source}")]
    InvalidSeed {
        /// Unit being created
        unit: UnitId,
        /// What is wrong with the seed
        source: ReplayError,
    },

    /// Optimistic expectation failed: the unit changed since it was read
    #[error("conflict on {unit}: expected {expected} events, found {found}")]
    Conflict {
        /// Unit that changed
        unit: UnitId,
        /// History length the caller read
        expected: u64,
        /// History length at commit time
        found: u64,
    },

    /// The unit lock could not be acquired within the bounded attempts
    #[error("timed out waiting for lock on {unit}")]
    Contention {
        /// Contended unit
        unit: UnitId,
    },

    /// A stored history failed replay
    #[error("stored history of {unit} is invalid: {source}")]
    Corrupt {
        /// Affected unit
        unit: UnitId,
        /// Replay failure
        source: ReplayError,
    },

    /// Journal I/O or format failure
    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl LedgerError {
    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. } | LedgerError::Contention { .. })
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::UnitNotFound(_))
    }
}
