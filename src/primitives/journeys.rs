//! Public journey resolution.
//!
//! This is the read path a verifier uses after scanning a code. It never
//! writes, and it never returns a partial journey.

use crate::error::Result;
use std::sync::Arc;
use verdant_core::UnitId;
use verdant_engine::{Engine, Journey};

/// Journey resolution.
///
/// Access via `db.journeys`.
pub struct Journeys {
    engine: Arc<Engine>,
}

impl Journeys {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Resolve a scanned token or tracking URL.
    pub fn resolve(&self, scan: &str) -> Result<Journey> {
        Ok(self.engine.resolve(scan)?)
    }

    /// Resolve with concurrent source reads and the configured timeout.
    pub async fn resolve_async(&self, scan: &str) -> Result<Journey> {
        Ok(self.engine.resolve_async(scan).await?)
    }

    /// Decode a scan without reading the ledger.
    pub fn decode(&self, scan: &str) -> Result<UnitId> {
        Ok(self.engine.authority().decode(scan)?)
    }

    /// Public tracking URL for a unit.
    pub fn tracking_url(&self, id: &UnitId) -> String {
        self.engine.authority().tracking_url(id)
    }
}
