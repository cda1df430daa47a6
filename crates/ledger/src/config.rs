//! Ledger configuration

use crate::journal::Durability;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default time to wait for a unit lock on each attempt
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 250;

/// Default number of lock attempts before reporting contention
pub const DEFAULT_LOCK_ATTEMPTS: u32 = 4;

/// Configuration for a [`crate::ShardedLedger`]
///
/// Deserializes from the `[ledger]` table of the engine configuration;
/// every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Journal file; `None` keeps the ledger in memory only
    pub journal_path: Option<PathBuf>,
    /// When journal writes reach stable storage
    pub durability: Durability,
    /// Time to wait for a unit lock on each attempt
    pub lock_timeout_ms: u64,
    /// Lock attempts before giving up with `Contention`
    pub lock_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            journal_path: None,
            durability: Durability::default(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            lock_attempts: DEFAULT_LOCK_ATTEMPTS,
        }
    }
}

impl LedgerConfig {
    /// In-memory ledger with default locking
    pub fn ephemeral() -> Self {
        LedgerConfig::default()
    }

    /// Journal-backed ledger at `path`
    pub fn with_journal(path: impl Into<PathBuf>) -> Self {
        LedgerConfig {
            journal_path: Some(path.into()),
            ..LedgerConfig::default()
        }
    }

    /// Set durability mode
    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Per-attempt lock wait
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Lock attempts, never less than one
    pub fn lock_attempts(&self) -> u32 {
        self.lock_attempts.max(1)
    }
}
