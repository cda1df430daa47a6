//! Main entry point for Verdant.
//!
//! This module provides the `Verdant` handle and its builder.

use crate::error::Result;
use crate::primitives::{Batches, EvidenceLog, Journeys, Products};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use verdant_engine::{Engine, EngineConfig};
use verdant_ledger::{Durability, ShardedLedger};

/// A Verdant custody ledger.
///
/// Create one with [`Verdant::open`], [`Verdant::ephemeral`] or
/// [`Verdant::builder`]. Operations are grouped by concern:
///
/// ```ignore
/// use verdant::prelude::*;
///
/// let db = Verdant::open("./custody")?;
/// let batch = db.batches.create(harvest)?;
/// db.batches.transfer(&batch.id(), grower.clone(), dealer.clone())?;
/// db.batches.receive(&batch.id(), dealer)?;
/// let product = db.products.aggregate("Ashwagandha Powder", [batch.id()], processor)?;
/// let journey = db.journeys.resolve(&product.id().token())?;
/// ```
///
/// `Verdant` is cheap to share: every facade holds the same engine.
pub struct Verdant {
    engine: Arc<Engine>,

    /// Batch creation and custody transfer
    pub batches: Batches,

    /// Aggregation, packaging and distribution of products
    pub products: Products,

    /// Evidence attachment and trust flags
    pub evidence: EvidenceLog,

    /// Public journey resolution
    pub journeys: Journeys,
}

impl Verdant {
    /// Open a journal-backed ledger in `dir`.
    ///
    /// Uses buffered durability. The journal is replayed before this returns.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(dir).open()
    }

    /// Create an in-memory ledger with no disk I/O.
    ///
    /// Everything is lost when the handle is dropped.
    pub fn ephemeral() -> Self {
        Self::from_engine(Arc::new(Engine::ephemeral()))
    }

    /// Open from a full engine configuration.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let engine = Engine::open(config)?;
        info!(
            journal = ?engine.config().ledger.journal_path,
            units = engine.ledger().len(),
            "verdant opened"
        );
        Ok(Self::from_engine(Arc::new(engine)))
    }

    /// Load a TOML configuration file and open from it.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(EngineConfig::load(path)?)
    }

    /// Create a builder.
    pub fn builder() -> VerdantBuilder {
        VerdantBuilder::new()
    }

    /// Underlying engine
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Journal file, or `None` for an ephemeral ledger
    pub fn journal_path(&self) -> Option<&Path> {
        self.engine.config().ledger.journal_path.as_deref()
    }

    /// Check if this is an ephemeral ledger.
    pub fn is_ephemeral(&self) -> bool {
        self.journal_path().is_none()
    }

    /// Number of committed units of work
    pub fn version(&self) -> u64 {
        self.engine.ledger().version()
    }

    fn from_engine(engine: Arc<Engine>) -> Self {
        Self {
            batches: Batches::new(engine.clone()),
            products: Products::new(engine.clone()),
            evidence: EvidenceLog::new(engine.clone()),
            journeys: Journeys::new(engine.clone()),
            engine,
        }
    }
}

impl std::fmt::Debug for Verdant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verdant").field("engine", &self.engine).finish()
    }
}

/// Builder for a [`Verdant`] handle.
///
/// ```ignore
/// let db = Verdant::builder()
///     .path("./custody")
///     .strict()
///     .tracking_host("trace.example.org")
///     .resolve_timeout(Duration::from_secs(1))
///     .open()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct VerdantBuilder {
    config: EngineConfig,
}

impl VerdantBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Keep the journal in `dir`.
    pub fn path(self, dir: impl AsRef<Path>) -> Self {
        self.journal(ShardedLedger::journal_in(dir))
    }

    /// Use exactly this journal file.
    pub fn journal(mut self, file: impl Into<PathBuf>) -> Self {
        self.config.ledger.journal_path = Some(file.into());
        self
    }

    /// Fsync the journal on every commit.
    pub fn strict(mut self) -> Self {
        self.config.ledger.durability = Durability::Strict;
        self
    }

    /// Leave journal syncing to the OS (default).
    pub fn buffered(mut self) -> Self {
        self.config.ledger.durability = Durability::Buffered;
        self
    }

    /// Host used in tracking URLs.
    pub fn tracking_host(mut self, host: impl Into<String>) -> Self {
        self.config.tracking.host = host.into();
        self
    }

    /// Bound on an async resolve.
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.config.resolver.timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Aggregation retries when a source batch changes mid-check.
    pub fn aggregation_retries(mut self, retries: u32) -> Self {
        self.config.aggregation.max_conflict_retries = retries;
        self
    }

    /// Configuration built so far
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open the ledger, replaying its journal if one is set.
    pub fn open(self) -> Result<Verdant> {
        Verdant::from_config(self.config)
    }

    /// Open without ever touching disk, whatever path was set.
    pub fn open_ephemeral(mut self) -> Result<Verdant> {
        self.config.ledger.journal_path = None;
        Verdant::from_config(self.config)
    }
}

impl From<EngineConfig> for VerdantBuilder {
    fn from(config: EngineConfig) -> Self {
        Self::with_config(config)
    }
}
