//! Sharded in-memory ledger
//!
//! Unit records live in a DashMap keyed by [`UnitId`], each behind its own
//! `RwLock`. Reads of one unit never wait on writes to another, and a commit
//! only locks the units it touches.
//!
//! # Commit protocol
//!
//! 1. Reserve ids being created (an occupied id fails with `UnitExists`)
//! 2. Write-lock every touched unit in identifier order, with bounded waits
//! 3. Check history-length expectations
//! 4. Stage every draft through the state machine
//! 5. Append one journal record (if journaled)
//! 6. Apply staged events and bump the version
//!
//! Any failure before step 6 leaves every unit exactly as it was and
//! releases the reserved ids.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::journal::{Journal, JournalEntry, JournalRecord};
use crate::record::{Staged, StagedUnit, UnitRecord};
use crate::store::{AppendOutcome, CommitReceipt, LedgerStore, UnitSnapshot, WriteBatch};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use verdant_core::{
    CustodyEvent, EventPayload, ReplayError, TraceableUnit, UnitAttributes, UnitId,
};

type UnitHandle = Arc<RwLock<UnitRecord>>;

/// In-memory [`LedgerStore`] with optional journal
///
/// # Example
///
/// ```ignore
/// use verdant_ledger::{LedgerConfig, ShardedLedger};
///
/// let ledger = ShardedLedger::open(&LedgerConfig::with_journal("custody.journal"))?;
/// println!("recovered {} units", ledger.len());
/// ```
pub struct ShardedLedger {
    units: DashMap<UnitId, UnitHandle>,
    /// Product id -> source batch ids
    product_sources: DashMap<UnitId, Vec<UnitId>>,
    version: AtomicU64,
    journal: Option<Mutex<Journal>>,
    lock_timeout: Duration,
    lock_attempts: u32,
}

impl ShardedLedger {
    /// In-memory ledger with default locking
    pub fn new() -> Self {
        Self::ephemeral(&LedgerConfig::default())
    }

    /// In-memory ledger, ignoring any journal path in `config`
    pub fn ephemeral(config: &LedgerConfig) -> Self {
        ShardedLedger {
            units: DashMap::new(),
            product_sources: DashMap::new(),
            version: AtomicU64::new(0),
            journal: None,
            lock_timeout: config.lock_timeout(),
            lock_attempts: config.lock_attempts(),
        }
    }

    /// Open a ledger from configuration, replaying the journal if one is set
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let mut ledger = Self::ephemeral(config);
        if let Some(path) = &config.journal_path {
            let (journal, records) = Journal::open(path, config.durability)?;
            ledger.recover(records)?;
            info!(
                path = %path.display(),
                units = ledger.units.len(),
                version = ledger.version(),
                durability = ?config.durability,
                "ledger recovered from journal"
            );
            ledger.journal = Some(Mutex::new(journal));
        }
        Ok(ledger)
    }

    /// Rebuild unit records from journal records.
    ///
    /// Each history is validated through the state machine; one that does not
    /// replay fails recovery rather than being repaired.
    fn recover(&mut self, records: Vec<JournalRecord>) -> Result<()> {
        let mut histories: BTreeMap<UnitId, Vec<CustodyEvent>> = BTreeMap::new();
        let mut version = 0;
        for record in records {
            version = version.max(record.version);
            for entry in record.entries {
                histories.entry(entry.unit_id).or_default().push(entry.event);
            }
        }

        for (id, events) in histories {
            if let Some(sources) = product_sources_of(&events) {
                self.product_sources.insert(id, sources);
            }
            let record = UnitRecord::rebuild(id, events).map_err(|source| {
                error!(unit = %id, error = %source, "journal history failed replay");
                LedgerError::Corrupt { unit: id, source }
            })?;
            self.units.insert(id, Arc::new(RwLock::new(record)));
        }
        self.version.store(version, Ordering::Release);
        Ok(())
    }

    /// Check if commits are journaled
    pub fn is_durable(&self) -> bool {
        self.journal.is_some()
    }

    /// Journal file, if any
    pub fn journal_path(&self) -> Option<PathBuf> {
        self.journal.as_ref().map(|j| j.lock().path().to_path_buf())
    }

    fn handle(&self, id: &UnitId) -> Option<UnitHandle> {
        self.units.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn write_lock<'a>(&self, id: &UnitId, handle: &'a RwLock<UnitRecord>) -> Result<RwLockWriteGuard<'a, UnitRecord>> {
        for attempt in 1..=self.lock_attempts {
            if let Some(guard) = handle.try_write_for(self.lock_timeout) {
                return Ok(guard);
            }
            debug!(unit = %id, attempt, "unit write lock busy");
        }
        warn!(unit = %id, attempts = self.lock_attempts, "gave up waiting for unit write lock");
        Err(LedgerError::Contention { unit: *id })
    }

    fn read_lock<'a>(&self, id: &UnitId, handle: &'a RwLock<UnitRecord>) -> Result<RwLockReadGuard<'a, UnitRecord>> {
        for _ in 0..self.lock_attempts {
            if let Some(guard) = handle.try_read_for(self.lock_timeout) {
                return Ok(guard);
            }
        }
        warn!(unit = %id, attempts = self.lock_attempts, "gave up waiting for unit read lock");
        Err(LedgerError::Contention { unit: *id })
    }

    fn release(&self, reserved: &[UnitId]) {
        for id in reserved {
            self.units.remove(id);
        }
    }

    /// Steps 2 to 6 of the commit protocol; create ids are already reserved
    fn commit_reserved(&self, batch: WriteBatch) -> Result<CommitReceipt> {
        let ids = batch.unit_ids();
        let creating: BTreeSet<UnitId> = batch.creates.iter().map(|(id, _)| *id).collect();

        let mut handles = Vec::with_capacity(ids.len());
        for id in &ids {
            let handle = self.handle(id).ok_or(LedgerError::UnitNotFound(*id))?;
            handles.push((*id, handle));
        }

        let mut guards = Vec::with_capacity(handles.len());
        for (id, handle) in &handles {
            let guard = self.write_lock(id, handle)?;
            if !guard.is_live() && !creating.contains(id) {
                return Err(LedgerError::UnitNotFound(*id));
            }
            guards.push(guard);
        }
        let position = |id: &UnitId| ids.iter().position(|x| x == id).unwrap_or(0);

        for (id, expected) in &batch.expectations {
            let found = guards[position(id)].len();
            if found != *expected {
                warn!(unit = %id, expected, found, "commit conflict");
                return Err(LedgerError::Conflict {
                    unit: *id,
                    expected: *expected,
                    found,
                });
            }
        }

        let now = Utc::now();
        let mut staged: Vec<StagedUnit> = ids
            .iter()
            .zip(guards.iter())
            .map(|(id, guard)| StagedUnit::new(*id, guard))
            .collect();
        let drafts = batch
            .creates
            .into_iter()
            .flat_map(|(id, drafts)| drafts.into_iter().map(move |d| (id, d)))
            .chain(batch.appends);

        let mut outcomes = Vec::new();
        for (id, draft) in drafts {
            let index = position(&id);
            let event_type = draft.event_type();
            match staged[index].stage(&guards[index], draft, now) {
                Ok(Staged::Appended(event)) => outcomes.push((id, AppendOutcome::Appended(event))),
                Ok(Staged::Duplicate(original)) => {
                    debug!(unit = %id, sequence = original.sequence, "duplicate idempotency key");
                    outcomes.push((id, AppendOutcome::Duplicate(original)));
                }
                Err(e) => {
                    warn!(unit = %id, event = %event_type, error = %e, "custody event rejected");
                    return Err(e);
                }
            }
        }

        if let Some(empty) = staged
            .iter()
            .find(|unit| unit.status.is_none() && creating.contains(&unit.unit))
        {
            return Err(LedgerError::InvalidSeed {
                unit: empty.unit,
                source: ReplayError::EmptyHistory,
            });
        }

        let entries: Vec<JournalEntry> = staged
            .iter()
            .flat_map(|unit| {
                unit.events.iter().map(move |event| JournalEntry {
                    unit_id: unit.unit,
                    event: event.clone(),
                })
            })
            .collect();
        if entries.is_empty() {
            return Ok(CommitReceipt {
                version: None,
                outcomes,
            });
        }

        let version = match &self.journal {
            Some(journal) => {
                let mut journal = journal.lock();
                let version = self.next_version();
                journal.append(&JournalRecord {
                    version,
                    committed_at: now,
                    entries,
                })?;
                version
            }
            None => self.next_version(),
        };

        for (unit, guard) in staged.into_iter().zip(guards.iter_mut()) {
            if unit.is_empty() {
                continue;
            }
            if let Some(sources) = unit.created_sources() {
                self.product_sources.insert(unit.unit, sources);
            }
            for event in &unit.events {
                debug!(
                    unit = %unit.unit,
                    sequence = event.sequence,
                    event = %event.event_type(),
                    version,
                    "appended custody event"
                );
            }
            guard.apply(unit);
        }

        Ok(CommitReceipt {
            version: Some(version),
            outcomes,
        })
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Path helper for journal-backed ledgers in a directory
    pub fn journal_in(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join("custody.journal")
    }
}

impl Default for ShardedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedLedger")
            .field("units", &self.units.len())
            .field("version", &self.version())
            .field("durable", &self.is_durable())
            .finish()
    }
}

impl LedgerStore for ShardedLedger {
    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt> {
        let mut reserved = Vec::with_capacity(batch.creates.len());
        for (id, _) in &batch.creates {
            match self.units.entry(*id) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(RwLock::new(UnitRecord::reserved(id.kind()))));
                    reserved.push(*id);
                }
                Entry::Occupied(_) => {
                    self.release(&reserved);
                    return Err(LedgerError::UnitExists(*id));
                }
            }
        }

        let result = self.commit_reserved(batch);
        if result.is_err() {
            self.release(&reserved);
        }
        result
    }

    fn read(&self, unit: &UnitId) -> Result<TraceableUnit> {
        let handle = self.handle(unit).ok_or(LedgerError::UnitNotFound(*unit))?;
        let events = {
            let guard = self.read_lock(unit, &handle)?;
            if !guard.is_live() {
                return Err(LedgerError::UnitNotFound(*unit));
            }
            guard.events.clone()
        };
        TraceableUnit::replay(*unit, events).map_err(|source| {
            error!(unit = %unit, error = %source, "stored history failed replay");
            LedgerError::Corrupt {
                unit: *unit,
                source,
            }
        })
    }

    fn snapshot(&self, unit: &UnitId) -> Option<UnitSnapshot> {
        let handle = self.handle(unit)?;
        let snapshot = handle.read().snapshot();
        snapshot
    }

    fn source_batches(&self, product: &UnitId) -> Option<Vec<UnitId>> {
        self.product_sources.get(product).map(|entry| entry.value().clone())
    }

    fn unit_ids(&self) -> Vec<UnitId> {
        let handles: Vec<(UnitId, UnitHandle)> = self
            .units
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        let mut ids: Vec<UnitId> = handles
            .into_iter()
            .filter(|(_, handle)| handle.read().is_live())
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

fn product_sources_of(events: &[CustodyEvent]) -> Option<Vec<UnitId>> {
    match &events.first()?.payload {
        EventPayload::Created {
            attributes: UnitAttributes::Product(info),
        } => Some(info.source_batch_ids.iter().copied().collect()),
        _ => None,
    }
}
