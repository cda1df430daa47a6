//! Product operations.
//!
//! Products only come into being by aggregation:
//!
//! ```ignore
//! let product = db.products.aggregate("Ashwagandha Powder", [b1, b2], processor.clone())?;
//! db.products.package(&product.id(), Some("LOT-7".into()), processor.clone())?;
//! db.products.distribute(&product.id(), processor, retailer)?;
//! ```

use crate::error::{Error, Result};
use std::sync::Arc;
use verdant_core::{CustodyEvent, Party, TraceableUnit, UnitId, UnitKind};
use verdant_engine::{Engine, NewProduct, Submission, UnitFilter};
use verdant_ledger::AppendOutcome;

/// Product operations.
///
/// Access via `db.products`.
pub struct Products {
    engine: Arc<Engine>,
}

impl Products {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Consume received batches into a new product.
    ///
    /// All-or-nothing: if any source fails its precondition, no batch is
    /// touched and no product exists afterwards.
    pub fn aggregate(
        &self,
        name: impl Into<String>,
        sources: impl IntoIterator<Item = UnitId>,
        producing_party: Party,
    ) -> Result<TraceableUnit> {
        self.aggregate_with(NewProduct::new(name, sources, producing_party))
    }

    /// Aggregate with dates, location or an idempotency key.
    pub fn aggregate_with(&self, request: NewProduct) -> Result<TraceableUnit> {
        Ok(self.engine.aggregate(request)?)
    }

    /// Package a product.
    pub fn package(&self, id: &UnitId, lot: Option<String>, by: Party) -> Result<CustodyEvent> {
        Ok(self.package_with(id, lot, Submission::by(by))?.into_event())
    }

    /// Package, with full submission context.
    pub fn package_with(&self, id: &UnitId, lot: Option<String>, submission: Submission) -> Result<AppendOutcome> {
        self.expect_product(id)?;
        Ok(self.engine.package(id, lot, submission)?)
    }

    /// Hand a packaged product to the retail channel.
    pub fn distribute(&self, id: &UnitId, from: Party, to: Party) -> Result<CustodyEvent> {
        Ok(self.distribute_with(id, to, Submission::by(from))?.into_event())
    }

    /// Distribute, with full submission context.
    pub fn distribute_with(&self, id: &UnitId, to: Party, submission: Submission) -> Result<AppendOutcome> {
        self.expect_product(id)?;
        Ok(self.engine.distribute(id, to, submission)?)
    }

    /// Read a product with its full history.
    pub fn get(&self, id: &UnitId) -> Result<TraceableUnit> {
        self.expect_product(id)?;
        Ok(self.engine.read(id)?)
    }

    /// Source batches of a product, in id order.
    pub fn sources(&self, id: &UnitId) -> Result<Vec<UnitId>> {
        self.expect_product(id)?;
        self.engine
            .ledger()
            .source_batches(id)
            .ok_or(Error::UnitNotFound(*id))
    }

    /// All products, oldest first.
    pub fn list(&self) -> Result<Vec<TraceableUnit>> {
        Ok(self.engine.list(&UnitFilter::products())?)
    }

    fn expect_product(&self, id: &UnitId) -> Result<()> {
        match id.kind() {
            UnitKind::Product => Ok(()),
            UnitKind::Batch => Err(Error::UnitNotFound(*id)),
        }
    }
}
