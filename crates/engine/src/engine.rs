//! The custody engine handle

use crate::authority::IdentifierAuthority;
use crate::config::EngineConfig;
use crate::error::Result;
use std::sync::Arc;
use verdant_ledger::{LedgerStore, ShardedLedger};

/// Custody engine over a [`LedgerStore`]
///
/// Operations are spread over several modules:
/// - custody: batch creation, transfer, receipt, packaging, distribution
/// - evidence: evidence attachment
/// - aggregation: batches into products
/// - journey: public resolution of a scanned identifier
///
/// `Engine` is `Send + Sync`; share it behind an `Arc` and call it from any
/// number of threads.
pub struct Engine {
    pub(crate) ledger: Arc<dyn LedgerStore>,
    pub(crate) authority: IdentifierAuthority,
    pub(crate) config: EngineConfig,
}

impl Engine {
    /// Engine over an existing ledger
    pub fn with_ledger(ledger: Arc<dyn LedgerStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Engine {
            ledger,
            authority: IdentifierAuthority::new(config.tracking.clone()),
            config,
        })
    }

    /// Open the ledger described by `config.ledger`, replaying its journal
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let ledger = ShardedLedger::open(&config.ledger)?;
        Self::with_ledger(Arc::new(ledger), config)
    }

    /// In-memory engine with default configuration
    pub fn ephemeral() -> Self {
        let config = EngineConfig::default();
        Engine {
            ledger: Arc::new(ShardedLedger::ephemeral(&config.ledger)),
            authority: IdentifierAuthority::new(config.tracking.clone()),
            config,
        }
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Identifier authority
    pub fn authority(&self) -> &IdentifierAuthority {
        &self.authority
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("units", &self.ledger.len())
            .field("version", &self.ledger.version())
            .field("tracking_host", &self.config.tracking.host)
            .finish()
    }
}
