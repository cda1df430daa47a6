//! Engine configuration
//!
//! Loaded from TOML; every table and field is optional:
//!
//! ```toml
//! [tracking]
//! scheme = "https"
//! host = "verdant.example"
//! path_segment = "track"
//!
//! [ledger]
//! journal_path = "/var/lib/verdant/custody.journal"
//! durability = "strict"
//! lock_timeout_ms = 250
//! lock_attempts = 4
//!
//! [aggregation]
//! max_conflict_retries = 3
//!
//! [resolver]
//! timeout_ms = 2000
//! ```

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;
use verdant_ledger::LedgerConfig;

fn default_scheme() -> String {
    "https".to_string()
}

fn default_host() -> String {
    "verdant.example".to_string()
}

fn default_path_segment() -> String {
    "track".to_string()
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_resolve_timeout_ms() -> u64 {
    2000
}

/// Public tracking URL base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// URL scheme
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Host printed into tracking URLs
    #[serde(default = "default_host")]
    pub host: String,
    /// Path segment before the token
    #[serde(default = "default_path_segment")]
    pub path_segment: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            scheme: default_scheme(),
            host: default_host(),
            path_segment: default_path_segment(),
        }
    }
}

impl TrackingConfig {
    /// Base URL all tracking links share.
    ///
    /// The configured host and path segment must survive URL parsing
    /// unchanged, otherwise printed links would not decode back.
    pub fn base_url(&self) -> Result<Url> {
        let host = self.host.trim();
        if host.is_empty() || host != self.host {
            return Err(EngineError::Config(format!(
                "tracking.host must be a non-empty host name, got {:?}",
                self.host
            )));
        }
        let raw = format!("{}://{}/{}/", self.scheme, self.host, self.path_segment);
        let url = Url::parse(&raw)
            .map_err(|e| EngineError::Config(format!("invalid tracking base {:?}: {}", raw, e)))?;
        let authority = match (url.host_str(), url.port()) {
            (Some(h), Some(port)) => format!("{}:{}", h, port),
            (Some(h), None) => h.to_string(),
            (None, _) => String::new(),
        };
        if url.cannot_be_a_base() || !authority.eq_ignore_ascii_case(host) {
            return Err(EngineError::Config(format!(
                "tracking base {:?} does not keep host {:?}",
                raw, self.host
            )));
        }
        if url.path() != format!("/{}/", self.path_segment) {
            return Err(EngineError::Config(format!(
                "tracking base {:?} does not keep path segment {:?}",
                raw, self.path_segment
            )));
        }
        Ok(url)
    }
}

/// Aggregation tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Re-reads after a commit conflict before giving up
    #[serde(default = "default_conflict_retries")]
    pub max_conflict_retries: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        AggregationConfig {
            max_conflict_retries: default_conflict_retries(),
        }
    }
}

/// Journey resolver tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Bound on one async resolve, in milliseconds
    #[serde(default = "default_resolve_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            timeout_ms: default_resolve_timeout_ms(),
        }
    }
}

impl ResolverConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tracking URL base
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Ledger storage and locking
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Aggregation tuning
    #[serde(default)]
    pub aggregation: AggregationConfig,
    /// Resolver tuning
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl EngineConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.tracking.base_url()?;
        if self.tracking.path_segment.is_empty() || self.tracking.path_segment.contains('/') {
            return Err(EngineError::Config(
                "tracking.path_segment must be a single non-empty path segment".into(),
            ));
        }
        if self.resolver.timeout_ms == 0 {
            return Err(EngineError::Config("resolver.timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }
}
