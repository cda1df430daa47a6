//! Batch operations.
//!
//! ```ignore
//! let batch = db.batches.create(NewBatch::new(commodity, quantity, origin, grower.clone()))?;
//! db.batches.transfer(&batch.id(), grower, dealer.clone())?;
//! db.batches.receive(&batch.id(), dealer)?;
//!
//! // Offline entry replayed later, safe to resubmit
//! db.batches.receive_with(&id, Submission::by(dealer).occurred_at(t).idempotent(key))?;
//! ```

use crate::error::{Error, Result};
use std::sync::Arc;
use verdant_core::{CustodyEvent, Party, TraceableUnit, UnitId, UnitKind, UnitStatus};
use verdant_engine::{Engine, NewBatch, Submission, UnitFilter};
use verdant_ledger::AppendOutcome;

/// Batch operations.
///
/// Access via `db.batches`.
pub struct Batches {
    engine: Arc<Engine>,
}

impl Batches {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Record a harvest as a new batch.
    pub fn create(&self, request: NewBatch) -> Result<TraceableUnit> {
        Ok(self.engine.create_batch(request)?)
    }

    /// Hand a batch from `from` to `to`.
    pub fn transfer(&self, id: &UnitId, from: Party, to: Party) -> Result<CustodyEvent> {
        Ok(self.transfer_with(id, to, Submission::by(from))?.into_event())
    }

    /// Hand a batch on, with full submission context.
    pub fn transfer_with(&self, id: &UnitId, to: Party, submission: Submission) -> Result<AppendOutcome> {
        self.expect_batch(id)?;
        Ok(self.engine.transfer(id, to, submission)?)
    }

    /// Accept custody of a batch.
    pub fn receive(&self, id: &UnitId, by: Party) -> Result<CustodyEvent> {
        Ok(self.receive_with(id, Submission::by(by))?.into_event())
    }

    /// Accept custody, with full submission context.
    pub fn receive_with(&self, id: &UnitId, submission: Submission) -> Result<AppendOutcome> {
        self.expect_batch(id)?;
        Ok(self.engine.receive(id, submission)?)
    }

    /// Read a batch with its full history.
    pub fn get(&self, id: &UnitId) -> Result<TraceableUnit> {
        self.expect_batch(id)?;
        Ok(self.engine.read(id)?)
    }

    /// Check if a batch exists and can still be aggregated.
    pub fn exists_and_unconsumed(&self, id: &UnitId) -> bool {
        id.kind() == UnitKind::Batch && self.engine.ledger().exists_and_unconsumed(id)
    }

    /// All batches, oldest first.
    pub fn list(&self) -> Result<Vec<TraceableUnit>> {
        Ok(self.engine.list(&UnitFilter::batches())?)
    }

    /// Batches a party created, holds, or is due to receive.
    pub fn list_by_party(&self, party_id: &str) -> Result<Vec<TraceableUnit>> {
        Ok(self.engine.list(&UnitFilter::batches().involving(party_id))?)
    }

    /// Batches in one status.
    pub fn list_by_status(&self, status: UnitStatus) -> Result<Vec<TraceableUnit>> {
        Ok(self.engine.list(&UnitFilter::batches().with_status(status))?)
    }

    // Product ids live in another namespace, so they can never name a batch
    fn expect_batch(&self, id: &UnitId) -> Result<()> {
        match id.kind() {
            UnitKind::Batch => Ok(()),
            UnitKind::Product => Err(Error::UnitNotFound(*id)),
        }
    }
}
