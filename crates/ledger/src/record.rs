//! Per-unit records and commit staging

use crate::error::{LedgerError, Result};
use crate::store::UnitSnapshot;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use verdant_core::{
    check_seed, replay_status, CustodyEvent, EventDraft, IdempotencyKey, ReplayError,
    TransitionError, UnitAttributes, UnitId, UnitKind, UnitStatus,
};

/// Event log of one unit plus its derived index entries
///
/// `status` is `None` while a create is in flight: the id is reserved but
/// nothing has been committed, and readers treat the unit as absent.
#[derive(Debug)]
pub(crate) struct UnitRecord {
    pub(crate) kind: UnitKind,
    pub(crate) status: Option<UnitStatus>,
    pub(crate) events: Vec<CustodyEvent>,
    keys: FxHashMap<IdempotencyKey, u64>,
}

impl UnitRecord {
    pub(crate) fn reserved(kind: UnitKind) -> Self {
        UnitRecord {
            kind,
            status: None,
            events: Vec::new(),
            keys: FxHashMap::default(),
        }
    }

    /// Rebuild from a recovered history
    pub(crate) fn rebuild(id: UnitId, events: Vec<CustodyEvent>) -> std::result::Result<Self, ReplayError> {
        let first = events.first().ok_or(ReplayError::EmptyHistory)?;
        check_seed(id, &first.payload)?;
        let status = replay_status(id.kind(), &events)?;
        let keys = events
            .iter()
            .filter_map(|e| e.idempotency_key.clone().map(|k| (k, e.sequence)))
            .collect();
        Ok(UnitRecord {
            kind: id.kind(),
            status: Some(status),
            events,
            keys,
        })
    }

    pub(crate) fn is_live(&self) -> bool {
        self.status.is_some()
    }

    pub(crate) fn len(&self) -> u64 {
        self.events.len() as u64
    }

    pub(crate) fn snapshot(&self) -> Option<UnitSnapshot> {
        self.status.map(|status| UnitSnapshot {
            kind: self.kind,
            status,
            len: self.len(),
        })
    }

    fn by_key(&self, key: &IdempotencyKey) -> Option<&CustodyEvent> {
        let sequence = *self.keys.get(key)?;
        self.events.get(sequence.checked_sub(1)? as usize)
    }

    /// Apply a staged unit. Must be called with the unit's write lock held
    /// and only after the journal accepted the staged events.
    pub(crate) fn apply(&mut self, staged: StagedUnit) {
        for event in &staged.events {
            if let Some(key) = &event.idempotency_key {
                self.keys.insert(key.clone(), event.sequence);
            }
        }
        self.events.extend(staged.events);
        self.status = staged.status;
    }
}

/// Outcome of staging one draft
pub(crate) enum Staged {
    Appended(CustodyEvent),
    Duplicate(CustodyEvent),
}

/// Events staged against one unit, not yet visible to readers
#[derive(Debug)]
pub(crate) struct StagedUnit {
    pub(crate) unit: UnitId,
    pub(crate) status: Option<UnitStatus>,
    pub(crate) events: Vec<CustodyEvent>,
    base_len: u64,
    last_recorded: Option<DateTime<Utc>>,
}

impl StagedUnit {
    pub(crate) fn new(unit: UnitId, base: &UnitRecord) -> Self {
        StagedUnit {
            unit,
            status: base.status,
            events: Vec::new(),
            base_len: base.len(),
            last_recorded: base.events.last().map(|e| e.recorded_at),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Run one draft through the state machine.
    ///
    /// A reused idempotency key short-circuits before any rule check. The
    /// resubmission must carry the same payload and actor as the event
    /// originally recorded under the key, which is then returned unchanged.
    pub(crate) fn stage(&mut self, base: &UnitRecord, draft: EventDraft, now: DateTime<Utc>) -> Result<Staged> {
        if let Some(key) = &draft.idempotency_key {
            let original = base.by_key(key).or_else(|| {
                self.events
                    .iter()
                    .find(|e| e.idempotency_key.as_ref() == Some(key))
            });
            if let Some(original) = original {
                if original.payload != draft.payload || original.actor != draft.actor {
                    return Err(LedgerError::IdempotencyKeyReused {
                        unit: self.unit,
                        key: key.clone(),
                    });
                }
                return Ok(Staged::Duplicate(original.clone()));
            }
        }

        let next = match self.status {
            None => {
                check_seed(self.unit, &draft.payload).map_err(|source| LedgerError::InvalidSeed {
                    unit: self.unit,
                    source,
                })?;
                UnitStatus::initial(self.unit.kind())
            }
            Some(current) => current
                .apply(self.unit.kind(), draft.event_type())
                .map_err(|e| match e {
                    TransitionError::Terminal { status } => LedgerError::UnitTerminal {
                        unit: self.unit,
                        status,
                    },
                    TransitionError::Invalid { kind, from, event } => {
                        LedgerError::InvalidTransition {
                            unit: self.unit,
                            kind,
                            from,
                            event,
                        }
                    }
                })?,
        };

        let recorded_at = match self.last_recorded {
            Some(last) if last > now => last,
            _ => now,
        };
        let sequence = self.base_len + self.events.len() as u64 + 1;
        let event = draft.record(sequence, recorded_at);

        self.status = Some(next);
        self.last_recorded = Some(recorded_at);
        self.events.push(event.clone());
        Ok(Staged::Appended(event))
    }

    /// Source batches, if this staged unit is a product being created
    pub(crate) fn created_sources(&self) -> Option<Vec<UnitId>> {
        if self.base_len != 0 {
            return None;
        }
        match &self.events.first()?.payload {
            verdant_core::EventPayload::Created {
                attributes: UnitAttributes::Product(info),
            } => Some(info.source_batch_ids.iter().copied().collect()),
            _ => None,
        }
    }
}
