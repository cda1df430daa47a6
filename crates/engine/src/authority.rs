//! Identifier Authority
//!
//! Mints unit identifiers and converts them to and from the public
//! tracking form printed into QR codes.

use crate::config::TrackingConfig;
use tracing::debug;
use verdant_core::identifier::TRACKING_PATH_SEGMENTS;
use verdant_core::{decode_with, EntropyError, IdentifierError, UnitId, UnitKind};

/// Issues and decodes identifiers
#[derive(Debug, Clone)]
pub struct IdentifierAuthority {
    tracking: TrackingConfig,
    segments: Vec<String>,
}

impl IdentifierAuthority {
    /// Authority rendering URLs under `tracking`
    pub fn new(tracking: TrackingConfig) -> Self {
        let mut segments: Vec<String> = TRACKING_PATH_SEGMENTS.iter().map(|s| s.to_string()).collect();
        if !segments.contains(&tracking.path_segment) {
            segments.push(tracking.path_segment.clone());
        }
        IdentifierAuthority { tracking, segments }
    }

    /// Mint a fresh identifier from OS entropy.
    ///
    /// Identifiers are random rather than sequential, so they cannot be
    /// enumerated. Fails only when the entropy source does.
    pub fn issue(&self, kind: UnitKind) -> Result<UnitId, EntropyError> {
        let id = UnitId::generate(kind)?;
        debug!(unit = %id, "issued identifier");
        Ok(id)
    }

    /// Parse a scanned or typed string.
    ///
    /// Accepts a bare token or a tracking URL under the configured path
    /// segment as well as the standard `track` and `product` segments.
    pub fn decode(&self, raw: &str) -> Result<UnitId, IdentifierError> {
        decode_with(raw, &self.segments)
    }

    /// Public tracking URL for `id`
    pub fn tracking_url(&self, id: &UnitId) -> String {
        format!(
            "{}://{}/{}/{}",
            self.tracking.scheme,
            self.tracking.host,
            self.tracking.path_segment,
            id.token()
        )
    }

    /// Tracking configuration in use
    pub fn tracking(&self) -> &TrackingConfig {
        &self.tracking
    }
}

impl Default for IdentifierAuthority {
    fn default() -> Self {
        IdentifierAuthority::new(TrackingConfig::default())
    }
}
