//! Custody operations: batch creation and the transfer chain

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use tracing::info;
use verdant_core::{
    BatchInfo, Commodity, EventDraft, EventPayload, EventType, Evidence, IdempotencyKey,
    Location, MediaRef, Party, Quantity, TraceableUnit, UnitAttributes, UnitId, UnitKind,
    UnitStatus, ValidationError,
};
use verdant_ledger::{AppendOutcome, WriteBatch};

/// Who submits an event, and the optional context that comes with it
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Acting party
    pub actor: Party,
    /// Device-side time of the action
    pub occurred_at: Option<DateTime<Utc>>,
    /// Where it happened
    pub location: Option<Location>,
    /// Retry key
    pub idempotency_key: Option<IdempotencyKey>,
}

impl Submission {
    /// Submission by `actor` with no extra context
    pub fn by(actor: Party) -> Self {
        Submission {
            actor,
            occurred_at: None,
            location: None,
            idempotency_key: None,
        }
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

    pub(crate) fn draft(self, payload: EventPayload) -> EventDraft {
        EventDraft {
            payload,
            actor: self.actor,
            occurred_at: self.occurred_at,
            location: self.location,
            idempotency_key: self.idempotency_key,
        }
    }
}

/// A harvest to record as a new batch
#[derive(Debug, Clone, PartialEq)]
pub struct NewBatch {
    /// What was harvested
    pub commodity: Commodity,
    /// How much
    pub quantity: Quantity,
    /// Where
    pub origin: Location,
    /// Grower creating the batch
    pub origin_party: Party,
    /// Photo of the harvest
    pub photo_ref: Option<MediaRef>,
    /// Certifications held at harvest time
    pub certifications: Vec<Evidence>,
    /// Device-side harvest time
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewBatch {
    /// Batch with the required attributes
    pub fn new(commodity: Commodity, quantity: Quantity, origin: Location, origin_party: Party) -> Self {
        NewBatch {
            commodity,
            quantity,
            origin,
            origin_party,
            photo_ref: None,
            certifications: Vec::new(),
            occurred_at: None,
        }
    }

    /// Attach a harvest photo
    pub fn photo(mut self, photo: MediaRef) -> Self {
        self.photo_ref = Some(photo);
        self
    }

    /// Add an origin certification
    pub fn certified(mut self, evidence: Evidence) -> Self {
        self.certifications.push(evidence);
        self
    }

    /// Set the device-side harvest time
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }
}

/// Selects units for listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFilter {
    /// Only this kind
    pub kind: Option<UnitKind>,
    /// Only units currently in this status
    pub status: Option<UnitStatus>,
    /// Only units this party created, holds, or is due to receive
    pub party: Option<String>,
}

impl UnitFilter {
    /// Every batch
    pub fn batches() -> Self {
        UnitFilter {
            kind: Some(UnitKind::Batch),
            ..UnitFilter::default()
        }
    }

    /// Every product
    pub fn products() -> Self {
        UnitFilter {
            kind: Some(UnitKind::Product),
            ..UnitFilter::default()
        }
    }

    /// Restrict to a status
    pub fn with_status(mut self, status: UnitStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to units involving a party
    pub fn involving(mut self, party_id: impl Into<String>) -> Self {
        self.party = Some(party_id.into());
        self
    }

    fn matches(&self, unit: &TraceableUnit) -> bool {
        self.kind.map_or(true, |k| unit.kind() == k)
            && self.status.map_or(true, |s| unit.status() == s)
            && self.party.as_deref().map_or(true, |p| unit.involves(p))
    }
}

impl Engine {
    /// Record a harvest.
    ///
    /// The `CREATED` seed and any origin certifications land in one unit of
    /// work.
    pub fn create_batch(&self, request: NewBatch) -> Result<TraceableUnit> {
        let id = self.authority.issue(UnitKind::Batch)?;
        let actor = request.origin_party.clone();

        let mut seed = EventDraft::new(
            EventPayload::Created {
                attributes: UnitAttributes::Batch(BatchInfo {
                    commodity: request.commodity,
                    quantity: request.quantity,
                    origin: request.origin.clone(),
                    origin_party: request.origin_party,
                    photo_ref: request.photo_ref,
                }),
            },
            actor.clone(),
        )
        .at(request.origin);
        seed.occurred_at = request.occurred_at;

        let certifications = request.certifications.len();
        let mut drafts = vec![seed];
        for evidence in request.certifications {
            let mut draft = EventDraft::new(EventPayload::EvidenceAttached { evidence }, actor.clone());
            draft.occurred_at = request.occurred_at;
            drafts.push(draft);
        }

        self.ledger.commit(WriteBatch::new().create_with(id, drafts))?;
        info!(unit = %id, actor = %actor, certifications, "batch created");
        Ok(self.ledger.read(&id)?)
    }

    /// Hand custody of a unit to another party
    pub fn transfer(&self, unit: &UnitId, to: Party, submission: Submission) -> Result<AppendOutcome> {
        self.submit(unit, EventPayload::Transferred { to }, submission)
    }

    /// Accept custody of a unit
    pub fn receive(&self, unit: &UnitId, submission: Submission) -> Result<AppendOutcome> {
        self.submit(unit, EventPayload::Received, submission)
    }

    /// Package a product
    pub fn package(&self, product: &UnitId, lot: Option<String>, submission: Submission) -> Result<AppendOutcome> {
        if lot.as_deref().map_or(false, |l| l.trim().is_empty()) {
            return Err(ValidationError::EmptyField("lot").into());
        }
        self.submit(product, EventPayload::Packaged { lot }, submission)
    }

    /// Hand a packaged product to the retail channel
    pub fn distribute(&self, product: &UnitId, to: Party, submission: Submission) -> Result<AppendOutcome> {
        let snapshot = self
            .ledger
            .snapshot(product)
            .ok_or(EngineError::UnitNotFound(*product))?;
        if snapshot.kind != UnitKind::Product {
            return Err(EngineError::InvalidTransition {
                unit: *product,
                kind: snapshot.kind,
                from: snapshot.status,
                event: EventType::Transferred,
            });
        }
        self.submit(product, EventPayload::Transferred { to }, submission)
    }

    /// Read a unit with its full history
    pub fn read(&self, unit: &UnitId) -> Result<TraceableUnit> {
        Ok(self.ledger.read(unit)?)
    }

    /// Decode a scan and read the unit it names
    pub fn read_scan(&self, raw: &str) -> Result<TraceableUnit> {
        let id = self.authority.decode(raw)?;
        self.read(&id)
    }

    /// Units matching `filter`, oldest first
    pub fn list(&self, filter: &UnitFilter) -> Result<Vec<TraceableUnit>> {
        let mut units = Vec::new();
        for id in self.ledger.unit_ids() {
            if filter.kind.map_or(false, |k| id.kind() != k) {
                continue;
            }
            if let (Some(status), Some(snapshot)) = (filter.status, self.ledger.snapshot(&id)) {
                if snapshot.status != status {
                    continue;
                }
            }
            let unit = self.ledger.read(&id)?;
            if filter.matches(&unit) {
                units.push(unit);
            }
        }
        units.sort_by(|a, b| (a.created_at(), a.id()).cmp(&(b.created_at(), b.id())));
        Ok(units)
    }

    /// Append one non-seed event
    pub(crate) fn submit(&self, unit: &UnitId, payload: EventPayload, submission: Submission) -> Result<AppendOutcome> {
        Ok(self.ledger.append(unit, submission.draft(payload))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use verdant_core::{EvidenceRef, EvidenceType};

    #[test]
    fn test_create_batch() {
        let engine = Engine::ephemeral();
        let batch = engine.create_batch(ashwagandha()).unwrap();
        assert_eq!(batch.kind(), UnitKind::Batch);
        assert_eq!(batch.status(), UnitStatus::Created);
        assert_eq!(batch.history().len(), 1);
        let info = batch.as_batch().unwrap();
        assert_eq!(info.commodity.name, "Ashwagandha Root");
        assert_eq!(info.quantity.amount(), 50.0);
        assert_eq!(batch.history()[0].location.as_ref().unwrap().descriptor, "Neemuch, Madhya Pradesh");
    }

    #[test]
    fn test_create_with_certifications() {
        let engine = Engine::ephemeral();
        let request = ashwagandha().certified(Evidence::new(
            EvidenceRef::new("ORG-2024-118").unwrap(),
            EvidenceType::OrganicCertification,
        ));
        let batch = engine.create_batch(request).unwrap();
        assert_eq!(batch.history().len(), 2);
        assert_eq!(batch.status(), UnitStatus::Created);
        assert!(batch.trust().organic_certified);
        assert_eq!(engine.ledger().version(), 1);
    }

    #[test]
    fn test_transfer_chain() {
        let engine = Engine::ephemeral();
        let id = engine.create_batch(ashwagandha()).unwrap().id();
        engine.transfer(&id, dealer(), Submission::by(grower())).unwrap();
        assert_eq!(engine.read(&id).unwrap().status(), UnitStatus::Transferred);
        engine.receive(&id, Submission::by(dealer())).unwrap();
        let unit = engine.read(&id).unwrap();
        assert_eq!(unit.status(), UnitStatus::Received);
        assert_eq!(unit.custody().holder, dealer());
    }

    #[test]
    fn test_direct_receive_allowed() {
        let engine = Engine::ephemeral();
        let id = engine.create_batch(ashwagandha()).unwrap().id();
        engine.receive(&id, Submission::by(processor())).unwrap();
        assert_eq!(engine.read(&id).unwrap().status(), UnitStatus::Received);
    }

    #[test]
    fn test_idempotent_transfer() {
        let engine = Engine::ephemeral();
        let id = engine.create_batch(ashwagandha()).unwrap().id();
        let key = IdempotencyKey::new("tx-42").unwrap();
        let first = engine
            .transfer(&id, dealer(), Submission::by(grower()).idempotent(key.clone()))
            .unwrap();
        let second = engine
            .transfer(&id, dealer(), Submission::by(grower()).idempotent(key))
            .unwrap();
        assert!(second.is_duplicate());
        assert_eq!(first.event(), second.event());
        assert_eq!(engine.read(&id).unwrap().history().len(), 2);
    }

    #[test]
    fn test_distribute_rejects_batch() {
        let engine = Engine::ephemeral();
        let id = engine.create_batch(ashwagandha()).unwrap().id();
        engine.receive(&id, Submission::by(dealer())).unwrap();
        let err = engine
            .distribute(&id, Party::new("shop", verdant_core::PartyRole::Retailer).unwrap(), Submission::by(dealer()))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { kind: UnitKind::Batch, .. }));
        assert_eq!(engine.read(&id).unwrap().status(), UnitStatus::Received);
    }

    #[test]
    fn test_package_rejects_blank_lot() {
        let engine = Engine::ephemeral();
        let id = engine.create_batch(ashwagandha()).unwrap().id();
        assert!(matches!(
            engine.package(&id, Some("  ".into()), Submission::by(processor())),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_list_filters_and_orders() {
        let engine = Engine::ephemeral();
        let a = engine.create_batch(ashwagandha()).unwrap().id();
        let b = engine.create_batch(tulsi()).unwrap().id();
        engine.receive(&b, Submission::by(processor())).unwrap();

        let all = engine.list(&UnitFilter::batches()).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at() <= all[1].created_at());
        assert!(all.iter().any(|u| u.id() == a));

        let received = engine
            .list(&UnitFilter::batches().with_status(UnitStatus::Received))
            .unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id(), b);

        let by_processor = engine.list(&UnitFilter::default().involving("ayur-mfg")).unwrap();
        assert_eq!(by_processor.len(), 1);
        assert!(engine.list(&UnitFilter::products()).unwrap().is_empty());
    }

    #[test]
    fn test_read_scan() {
        let engine = Engine::ephemeral();
        let id = engine.create_batch(ashwagandha()).unwrap().id();
        let url = engine.authority().tracking_url(&id);
        assert_eq!(engine.read_scan(&url).unwrap().id(), id);
        assert!(matches!(engine.read_scan("BATCH_xyz"), Err(EngineError::InvalidIdentifier(_))));
    }
}
