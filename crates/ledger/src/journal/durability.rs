//! Durability mode for journal writes.
//!
//! Defines the durability guarantees for journal appends.

use serde::{Deserialize, Serialize};

/// Durability mode for journal writes.
///
/// Controls when committed units of work reach stable storage.
///
/// | Mode | Guarantee | Use Case |
/// |------|-----------|----------|
/// | Buffered | Survives process crash | Field deployments, CLI |
/// | Strict | Survives power loss | Central verification service |
///
/// An ephemeral ledger has no journal at all and therefore no mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Write and flush to the OS on every commit, no fsync.
    #[default]
    Buffered,

    /// fsync after every commit (slow, maximum durability).
    Strict,
}

impl Durability {
    /// Check if this mode requires fsync on every commit.
    pub fn requires_fsync(&self) -> bool {
        matches!(self, Durability::Strict)
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            Durability::Buffered => "Flushed to OS on commit (survives process crash)",
            Durability::Strict => "fsync on commit (survives power loss)",
        }
    }
}
