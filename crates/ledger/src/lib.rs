//! Unit ledger for Verdant
//!
//! This crate implements the custody store:
//! - [`LedgerStore`]: the storage contract the engine talks to
//! - [`WriteBatch`]: an all-or-nothing unit of work across units
//! - [`ShardedLedger`]: DashMap-sharded records with per-unit `RwLock`s
//! - [`Journal`]: optional append-only file, replayed on open
//!
//! Status is never stored on its own. The snapshot index is updated under
//! the same lock as the history it summarizes, and every read replays the
//! history through the state machine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod journal;
mod record;
pub mod sharded;
pub mod store;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use journal::{Durability, Journal, JournalEntry, JournalError, JournalRecord};
pub use sharded::ShardedLedger;
pub use store::{AppendOutcome, CommitReceipt, LedgerStore, UnitSnapshot, WriteBatch};
