//! Storage contract
//!
//! [`LedgerStore`] is the boundary between the custody engine and whatever
//! holds the event logs. The engine only ever talks to this trait; the
//! in-memory [`crate::ShardedLedger`] is one implementation.
//!
//! The persisted shape is one append-only event log per unit id, an index
//! from unit id to a kind/status snapshot, and an index from product id to
//! its source batch ids.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use verdant_core::{CustodyEvent, EventDraft, TraceableUnit, UnitId, UnitKind, UnitStatus};

/// Result of submitting one draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "event", rename_all = "snake_case")]
pub enum AppendOutcome {
    /// The draft was recorded as this event
    Appended(CustodyEvent),
    /// The idempotency key was already used; this is the original event
    Duplicate(CustodyEvent),
}

impl AppendOutcome {
    /// The recorded event, new or original
    pub fn event(&self) -> &CustodyEvent {
        match self {
            AppendOutcome::Appended(event) | AppendOutcome::Duplicate(event) => event,
        }
    }

    /// Consume into the recorded event
    pub fn into_event(self) -> CustodyEvent {
        match self {
            AppendOutcome::Appended(event) | AppendOutcome::Duplicate(event) => event,
        }
    }

    /// Check if nothing was written
    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppendOutcome::Duplicate(_))
    }
}

/// A unit of work spanning one or more units
///
/// Everything in a batch lands together or not at all. Units are locked in
/// identifier order, so two batches touching overlapping units never
/// deadlock.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub(crate) expectations: Vec<(UnitId, u64)>,
    pub(crate) creates: Vec<(UnitId, Vec<EventDraft>)>,
    pub(crate) appends: Vec<(UnitId, EventDraft)>,
}

impl WriteBatch {
    /// Empty batch
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Require `unit` to still have exactly `len` events at commit time
    pub fn expect_len(mut self, unit: UnitId, len: u64) -> Self {
        self.expectations.push((unit, len));
        self
    }

    /// Create `unit` from a seed draft
    pub fn create(self, unit: UnitId, seed: EventDraft) -> Self {
        self.create_with(unit, vec![seed])
    }

    /// Create `unit` from a seed draft followed by further drafts
    pub fn create_with(mut self, unit: UnitId, drafts: Vec<EventDraft>) -> Self {
        self.creates.push((unit, drafts));
        self
    }

    /// Append a draft to an existing unit
    pub fn append(mut self, unit: UnitId, draft: EventDraft) -> Self {
        self.appends.push((unit, draft));
        self
    }

    /// Check if the batch contains no writes
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.appends.is_empty()
    }

    /// Every unit the batch touches, in lock order
    pub fn unit_ids(&self) -> BTreeSet<UnitId> {
        self.expectations
            .iter()
            .map(|(id, _)| *id)
            .chain(self.creates.iter().map(|(id, _)| *id))
            .chain(self.appends.iter().map(|(id, _)| *id))
            .collect()
    }
}

/// What a committed batch did
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    /// Ledger version assigned, or `None` when every draft was a duplicate
    pub version: Option<u64>,
    /// One outcome per draft, creates first, then appends, in submission order
    pub outcomes: Vec<(UnitId, AppendOutcome)>,
}

impl CommitReceipt {
    /// Events newly written by this commit
    pub fn appended(&self) -> impl Iterator<Item = (&UnitId, &CustodyEvent)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            AppendOutcome::Appended(event) => Some((id, event)),
            AppendOutcome::Duplicate(_) => None,
        })
    }
}

/// Index entry for fast lookup without replaying history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Batch or product
    pub kind: UnitKind,
    /// Status after the last committed event
    pub status: UnitStatus,
    /// Number of events in the history
    pub len: u64,
}

/// Append-only custody store
pub trait LedgerStore: Send + Sync {
    /// Commit a unit of work atomically
    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt>;

    /// Read a unit, with status derived by replaying its history
    fn read(&self, unit: &UnitId) -> Result<TraceableUnit>;

    /// Index lookup: kind, status and history length
    fn snapshot(&self, unit: &UnitId) -> Option<UnitSnapshot>;

    /// Source batches of a product, from the aggregation index
    fn source_batches(&self, product: &UnitId) -> Option<Vec<UnitId>>;

    /// Every committed unit id, in identifier order
    fn unit_ids(&self) -> Vec<UnitId>;

    /// Highest committed version
    fn version(&self) -> u64;

    /// Append one draft to one unit
    fn append(&self, unit: &UnitId, draft: EventDraft) -> Result<AppendOutcome> {
        let receipt = self.commit(WriteBatch::new().append(*unit, draft))?;
        receipt
            .outcomes
            .into_iter()
            .next()
            .map(|(_, outcome)| outcome)
            .ok_or(LedgerError::UnitNotFound(*unit))
    }

    /// Whether the unit exists and has not been consumed into a product
    fn exists_and_unconsumed(&self, unit: &UnitId) -> bool {
        self.snapshot(unit)
            .map_or(false, |snapshot| snapshot.status != UnitStatus::Consumed)
    }

    /// Number of committed units
    fn len(&self) -> usize {
        self.unit_ids().len()
    }

    /// Check if no unit has been committed
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
