//! Journey Resolver
//!
//! Turns a scanned identifier into the full provenance of the unit it names.
//! For a product every source batch is read as well, and the stages of all
//! units are merged into one timeline.
//!
//! A journey is either complete or not returned at all: an unreadable source,
//! a stale product index or a batch that does not point back at the product
//! fails the whole resolve with `Inconsistent`.
//!
//! Resolution is a pure read. The same ledger state always yields the same
//! journey, down to the serialized bytes.

use crate::engine::Engine;
use crate::error::ResolveError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};
use verdant_core::{
    Custody, CustodyEvent, EventPayload, EventType, Evidence, EvidenceRecord, EvidenceRef,
    Location, Party, TraceableUnit, TrustSummary, UnitAttributes, UnitId, UnitKind, UnitStatus,
};
use verdant_ledger::LedgerError;

type Result<T> = std::result::Result<T, ResolveError>;

/// Presentable summary of one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Unit identifier
    pub id: UnitId,
    /// Public token
    pub token: String,
    /// Public tracking URL
    pub tracking_url: String,
    /// Batch or product
    pub kind: UnitKind,
    /// Status derived from history
    pub status: UnitStatus,
    /// When the unit was recorded
    pub created_at: DateTime<Utc>,
    /// Immutable attributes from the seed event
    pub attributes: UnitAttributes,
    /// Current custodian
    pub custody: Custody,
    /// Product a batch was consumed into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_by: Option<UnitId>,
}

/// What happened at a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageDetail {
    /// Unit recorded
    Created,
    /// Handed to another party
    Transferred {
        /// Receiving party
        to: Party,
    },
    /// Custody accepted
    Received,
    /// Evidence attached
    EvidenceAttached {
        /// The evidence
        evidence: Evidence,
    },
    /// Batch consumed into a product
    Aggregated {
        /// The product
        product_id: UnitId,
    },
    /// Product packaged
    Packaged {
        /// Lot number
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lot: Option<String>,
    },
}

impl From<&EventPayload> for StageDetail {
    fn from(payload: &EventPayload) -> Self {
        match payload {
            EventPayload::Created { .. } => StageDetail::Created,
            EventPayload::Transferred { to } => StageDetail::Transferred { to: to.clone() },
            EventPayload::Received => StageDetail::Received,
            EventPayload::EvidenceAttached { evidence } => StageDetail::EvidenceAttached {
                evidence: evidence.clone(),
            },
            EventPayload::Aggregated { product_id } => StageDetail::Aggregated {
                product_id: *product_id,
            },
            EventPayload::Packaged { lot } => StageDetail::Packaged { lot: lot.clone() },
        }
    }
}

/// One custody entry in a journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Unit the event belongs to
    pub unit_id: UnitId,
    /// Kind of that unit
    pub kind: UnitKind,
    /// Position in that unit's history
    pub sequence: u64,
    /// Event type
    pub event_type: EventType,
    /// Acting party
    pub actor: Party,
    /// Where it happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Device time if given, otherwise ledger time
    pub timestamp: DateTime<Utc>,
    /// Ledger time
    pub recorded_at: DateTime<Utc>,
    /// Event-specific data
    pub detail: StageDetail,
}

impl Stage {
    fn from_event(unit: &TraceableUnit, event: &CustodyEvent) -> Self {
        Stage {
            unit_id: unit.id(),
            kind: unit.kind(),
            sequence: event.sequence,
            event_type: event.event_type(),
            actor: event.actor.clone(),
            location: event.location.clone(),
            timestamp: event.timestamp(),
            recorded_at: event.recorded_at,
            detail: StageDetail::from(&event.payload),
        }
    }

    fn order_key(&self) -> (DateTime<Utc>, UnitId, u64) {
        (self.timestamp, self.unit_id, self.sequence)
    }
}

/// A source batch of a product with its own history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    /// Batch summary
    pub summary: UnitSummary,
    /// Batch stages in append order
    pub stages: Vec<Stage>,
}

/// Full provenance of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    /// The resolved unit
    pub unit: UnitSummary,
    /// Its own stages in append order
    pub stages: Vec<Stage>,
    /// Source batches ordered by id; empty for a batch
    pub source_batches: Vec<SourceBatch>,
    /// Every stage of the unit and its sources, chronologically
    pub timeline: Vec<Stage>,
    /// Evidence of the unit and, for a product, its sources at aggregation
    pub evidence: Vec<EvidenceRecord>,
    /// Flags derived from the evidence.
    ///
    /// For a product this is its own evidence OR the source summary captured
    /// at aggregation, and that summary ANDs each flag across all sources.
    /// A blend can therefore list one source's lab report in `evidence`
    /// while `lab_tested` is false. `evidence_present` is an OR throughout.
    pub trust: TrustSummary,
}

impl Journey {
    /// Identifier of the resolved unit
    pub fn id(&self) -> UnitId {
        self.unit.id
    }

    /// Evidence references in journey order
    pub fn evidence_refs(&self) -> impl Iterator<Item = &EvidenceRef> {
        self.evidence.iter().map(|r| &r.evidence.reference)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Engine {
    /// Resolve a scanned identifier into a journey
    pub fn resolve(&self, raw: &str) -> Result<Journey> {
        let id = self.authority.decode(raw)?;
        let unit = self.ledger.read(&id).map_err(|e| self.read_failure(id, e))?;
        let mut sources = Vec::new();
        for batch in self.source_ids(&unit)? {
            let read = self.ledger.read(&batch);
            sources.push(self.check_source(&unit, batch, read)?);
        }
        debug!(unit = %id, sources = sources.len(), "journey resolved");
        Ok(self.compose(unit, sources))
    }

    /// Resolve with the source reads fanned out over the blocking pool.
    ///
    /// Fails with a retryable `Timeout` if the reads do not finish within
    /// `resolver.timeout_ms`; outstanding reads are abandoned.
    pub async fn resolve_async(&self, raw: &str) -> Result<Journey> {
        let id = self.authority.decode(raw)?;
        let bound = self.config.resolver.timeout();
        match tokio::time::timeout(bound, self.gather(id)).await {
            Ok(gathered) => {
                let (unit, sources) = gathered?;
                debug!(unit = %id, sources = sources.len(), "journey resolved");
                Ok(self.compose(unit, sources))
            }
            Err(_) => {
                warn!(unit = %id, timeout_ms = self.config.resolver.timeout_ms, "resolve timed out");
                Err(self.timed_out())
            }
        }
    }

    async fn gather(&self, id: UnitId) -> Result<(TraceableUnit, Vec<TraceableUnit>)> {
        let ledger = Arc::clone(&self.ledger);
        let unit = tokio::task::spawn_blocking(move || ledger.read(&id))
            .await
            .map_err(|e| self.join_failure(e))?
            .map_err(|e| self.read_failure(id, e))?;

        let ids = self.source_ids(&unit)?;
        let mut reads = JoinSet::new();
        for (index, batch) in ids.iter().copied().enumerate() {
            let ledger = Arc::clone(&self.ledger);
            reads.spawn_blocking(move || (index, batch, ledger.read(&batch)));
        }

        // Dropping the set on an early return aborts the reads still queued
        let mut sources: Vec<Option<TraceableUnit>> = vec![None; ids.len()];
        while let Some(joined) = reads.join_next().await {
            let (index, batch, read) = joined.map_err(|e| self.join_failure(e))?;
            sources[index] = Some(self.check_source(&unit, batch, read)?);
        }
        Ok((unit, sources.into_iter().flatten().collect()))
    }

    /// Source batch ids of a product, checked against the ledger's index
    fn source_ids(&self, unit: &TraceableUnit) -> Result<Vec<UnitId>> {
        let info = match unit.as_product() {
            Some(info) => info,
            None => return Ok(Vec::new()),
        };
        let ids: Vec<UnitId> = info.source_batch_ids.iter().copied().collect();
        match self.ledger.source_batches(&unit.id()) {
            Some(indexed) if indexed == ids => Ok(ids),
            Some(indexed) => Err(inconsistent(
                unit.id(),
                format!("source index lists {} batches, seed lists {}", indexed.len(), ids.len()),
            )),
            None => Err(inconsistent(unit.id(), "product missing from source index".to_string())),
        }
    }

    fn check_source(
        &self,
        product: &TraceableUnit,
        batch: UnitId,
        read: std::result::Result<TraceableUnit, LedgerError>,
    ) -> Result<TraceableUnit> {
        let source = match read {
            Ok(source) => source,
            Err(LedgerError::Contention { .. }) => return Err(self.timed_out()),
            Err(e) => {
                return Err(inconsistent(
                    product.id(),
                    format!("source batch {} cannot be read: {}", batch, e),
                ))
            }
        };
        if source.kind() != UnitKind::Batch {
            return Err(inconsistent(product.id(), format!("source {} is not a batch", batch)));
        }
        if source.consumed_by() != Some(product.id()) {
            return Err(inconsistent(
                product.id(),
                format!("source batch {} was not consumed into this product", batch),
            ));
        }
        Ok(source)
    }

    fn read_failure(&self, id: UnitId, e: LedgerError) -> ResolveError {
        match e {
            LedgerError::UnitNotFound(id) => ResolveError::NotFound(id),
            LedgerError::Contention { .. } => self.timed_out(),
            LedgerError::Corrupt { source, .. } => inconsistent(id, source.to_string()),
            other => ResolveError::Ledger(other),
        }
    }

    fn join_failure(&self, e: JoinError) -> ResolveError {
        if e.is_panic() {
            std::panic::resume_unwind(e.into_panic());
        }
        self.timed_out()
    }

    fn timed_out(&self) -> ResolveError {
        ResolveError::Timeout {
            elapsed_ms: self.config.resolver.timeout_ms,
        }
    }

    fn summarize(&self, unit: &TraceableUnit) -> UnitSummary {
        UnitSummary {
            id: unit.id(),
            token: unit.id().token(),
            tracking_url: self.authority.tracking_url(&unit.id()),
            kind: unit.kind(),
            status: unit.status(),
            created_at: unit.created_at(),
            attributes: unit.attributes().clone(),
            custody: unit.custody(),
            consumed_by: unit.consumed_by(),
        }
    }

    fn compose(&self, unit: TraceableUnit, sources: Vec<TraceableUnit>) -> Journey {
        let stages: Vec<Stage> = unit.history().iter().map(|e| Stage::from_event(&unit, e)).collect();
        let source_batches: Vec<SourceBatch> = sources
            .iter()
            .map(|batch| SourceBatch {
                summary: self.summarize(batch),
                stages: batch.history().iter().map(|e| Stage::from_event(batch, e)).collect(),
            })
            .collect();

        let mut timeline: Vec<Stage> = stages
            .iter()
            .chain(source_batches.iter().flat_map(|s| s.stages.iter()))
            .cloned()
            .collect();
        timeline.sort_by_key(Stage::order_key);

        let mut evidence = unit.evidence();
        if let Some(info) = unit.as_product() {
            evidence.extend(info.source_evidence.iter().cloned());
        }
        evidence.sort_by(|a, b| {
            (a.attached_at, a.unit_id, a.sequence).cmp(&(b.attached_at, b.unit_id, b.sequence))
        });

        Journey {
            unit: self.summarize(&unit),
            trust: unit.trust(),
            stages,
            source_batches,
            timeline,
            evidence,
        }
    }
}

fn inconsistent(unit: UnitId, reason: String) -> ResolveError {
    error!(unit = %unit, reason = %reason, "inconsistent provenance");
    ResolveError::Inconsistent { unit, reason }
}
