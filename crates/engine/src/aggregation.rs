//! Aggregation Engine
//!
//! Consumes received batches into a new product. The product seed, one
//! `AGGREGATED` event per batch, and the history-length expectations that
//! pin each batch to the state that was validated all go into a single
//! [`WriteBatch`], so either every event lands or none does.
//!
//! The evidence and trust of the sources are snapshotted into the product
//! seed. Later reads of the product never consult the batches' live state.

use crate::engine::Engine;
use crate::error::{AggregationError, AggregationReason, EngineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use tracing::{info, warn};
use verdant_core::{
    EventDraft, EventPayload, EvidenceRecord, IdempotencyKey, Location, Party, ProductInfo,
    TraceableUnit, TrustSummary, UnitAttributes, UnitId, UnitKind, UnitStatus, ValidationError,
};
use verdant_ledger::{LedgerError, WriteBatch};

/// A product to make from received batches
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Batches to consume; duplicates are ignored
    pub source_batch_ids: Vec<UnitId>,
    /// Processor making the product
    pub producing_party: Party,
    /// Manufacture date
    pub manufactured_on: Option<NaiveDate>,
    /// Best-before date
    pub best_before: Option<NaiveDate>,
    /// Device-side time of the aggregation
    pub occurred_at: Option<DateTime<Utc>>,
    /// Where the aggregation happened
    pub location: Option<Location>,
    /// Retry key; resubmitting returns the product already made
    pub idempotency_key: Option<IdempotencyKey>,
}

impl NewProduct {
    /// Product with the required attributes
    pub fn new(name: impl Into<String>, sources: impl IntoIterator<Item = UnitId>, producing_party: Party) -> Self {
        NewProduct {
            name: name.into(),
            source_batch_ids: sources.into_iter().collect(),
            producing_party,
            manufactured_on: None,
            best_before: None,
            occurred_at: None,
            location: None,
            idempotency_key: None,
        }
    }

    /// Set the manufacture date
    pub fn manufactured_on(mut self, date: NaiveDate) -> Self {
        self.manufactured_on = Some(date);
        self
    }

    /// Set the best-before date
    pub fn best_before(mut self, date: NaiveDate) -> Self {
        self.best_before = Some(date);
        self
    }

    /// Set the device-side timestamp
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    /// Set the location
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the idempotency key
    pub fn idempotent(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("product name"));
        }
        if let (Some(made), Some(best_before)) = (self.manufactured_on, self.best_before) {
            if best_before < made {
                return Err(ValidationError::DatesOutOfOrder);
            }
        }
        Ok(())
    }

    fn stamp(&self, mut draft: EventDraft) -> EventDraft {
        draft.occurred_at = self.occurred_at;
        draft.location = self.location.clone();
        draft
    }
}

fn reject(reason: AggregationReason) -> EngineError {
    warn!(reason = %reason, code = reason.code(), "aggregation rejected");
    AggregationError::from(reason).into()
}

impl Engine {
    /// Consume `request.source_batch_ids` into a new product.
    ///
    /// Every source must exist, be a batch, and be `Received`. If a source
    /// changes between validation and commit the whole check is repeated, up
    /// to the configured retry count.
    pub fn aggregate(&self, request: NewProduct) -> Result<TraceableUnit> {
        let sources: BTreeSet<UnitId> = request.source_batch_ids.iter().copied().collect();
        if sources.is_empty() {
            return Err(reject(AggregationReason::EmptySourceSet));
        }
        request.validate()?;

        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = self.replayed_aggregation(key, &sources)? {
                return Ok(existing);
            }
        }

        let product_id = self.authority.issue(UnitKind::Product)?;
        let retries = self.config.aggregation.max_conflict_retries;
        for attempt in 0..=retries {
            let inputs = self.check_sources(&sources)?;
            let batch = aggregation_batch(product_id, &request, &sources, &inputs);
            match self.ledger.commit(batch) {
                Ok(receipt) => {
                    info!(
                        product = %product_id,
                        sources = sources.len(),
                        version = ?receipt.version,
                        "batches aggregated"
                    );
                    return Ok(self.ledger.read(&product_id)?);
                }
                // The batch moved after it was checked; check again
                Err(LedgerError::Conflict { unit, .. })
                | Err(LedgerError::UnitTerminal { unit, .. })
                | Err(LedgerError::InvalidTransition { unit, .. }) => {
                    warn!(product = %product_id, batch = %unit, attempt, "source batch changed, retrying");
                }
                Err(LedgerError::Contention { .. }) => {
                    return Err(reject(AggregationReason::Contention));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(reject(AggregationReason::Contention))
    }

    /// Validate every source and read it for the snapshot
    fn check_sources(&self, sources: &BTreeSet<UnitId>) -> Result<Vec<TraceableUnit>> {
        let mut units = Vec::with_capacity(sources.len());
        for id in sources {
            if id.kind() != UnitKind::Batch {
                return Err(reject(AggregationReason::NotABatch(*id)));
            }
            let unit = match self.ledger.read(id) {
                Ok(unit) => unit,
                Err(LedgerError::UnitNotFound(_)) => {
                    return Err(reject(AggregationReason::BatchNotFound(*id)))
                }
                Err(LedgerError::Contention { .. }) => {
                    return Err(reject(AggregationReason::Contention))
                }
                Err(e) => return Err(e.into()),
            };
            match unit.status() {
                UnitStatus::Received => units.push(unit),
                UnitStatus::Consumed => {
                    return Err(reject(AggregationReason::BatchAlreadyConsumed {
                        batch: *id,
                        product: unit.consumed_by(),
                    }))
                }
                status => {
                    return Err(reject(AggregationReason::BatchNotReceived {
                        batch: *id,
                        status,
                    }))
                }
            }
        }
        Ok(units)
    }

    /// The product an earlier submission with the same key already made
    fn replayed_aggregation(&self, key: &IdempotencyKey, sources: &BTreeSet<UnitId>) -> Result<Option<TraceableUnit>> {
        let first = match sources.iter().next() {
            Some(first) => first,
            None => return Ok(None),
        };
        let product_id = match self.ledger.read(first).ok().and_then(|b| b.consumed_by()) {
            Some(product_id) => product_id,
            None => return Ok(None),
        };
        let product = self.ledger.read(&product_id)?;
        let same_key = product
            .history()
            .first()
            .and_then(|seed| seed.idempotency_key.as_ref())
            == Some(key);
        let same_sources = product
            .as_product()
            .map_or(false, |info| &info.source_batch_ids == sources);
        if same_key && same_sources {
            info!(product = %product_id, key = %key, "aggregation already applied");
            return Ok(Some(product));
        }
        Ok(None)
    }
}

fn aggregation_batch(
    product_id: UnitId,
    request: &NewProduct,
    sources: &BTreeSet<UnitId>,
    inputs: &[TraceableUnit],
) -> WriteBatch {
    let source_evidence: Vec<EvidenceRecord> = inputs.iter().flat_map(|unit| unit.evidence()).collect();
    let source_trust = TrustSummary::all_of(inputs.iter().map(TraceableUnit::trust));

    let info = ProductInfo {
        name: request.name.trim().to_string(),
        source_batch_ids: sources.clone(),
        producing_party: request.producing_party.clone(),
        manufactured_on: request.manufactured_on,
        best_before: request.best_before,
        source_evidence,
        source_trust,
    };
    let mut seed = request.stamp(EventDraft::new(
        EventPayload::Created {
            attributes: UnitAttributes::Product(info),
        },
        request.producing_party.clone(),
    ));
    seed.idempotency_key = request.idempotency_key.clone();

    inputs.iter().fold(WriteBatch::new().create(product_id, seed), |batch, unit| {
        let consumed = request.stamp(EventDraft::new(
            EventPayload::Aggregated { product_id },
            request.producing_party.clone(),
        ));
        batch
            .expect_len(unit.id(), unit.history().len() as u64)
            .append(unit.id(), consumed)
    })
}
