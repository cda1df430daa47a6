//! Unit identifiers and the public tracking token codec
//!
//! Every traceable unit is named by a [`UnitId`]: a namespace ([`UnitKind`])
//! plus 128 bits of OS entropy. The public token is the namespace prefix
//! followed by the entropy in lowercase hex:
//!
//! ```text
//! BATCH_9f1c2d4e5a6b47c8a9d0e1f2a3b4c5d6
//! PROD_0a1b2c3d4e5f40718293a4b5c6d7e8f9
//! ```
//!
//! Tokens reach the system either bare (typed in by hand) or embedded in a
//! tracking URL printed into a QR code (`https://host/track/<token>`).
//! [`decode`] accepts both shapes and nothing else.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Path segments under which a token may appear in a tracking URL.
pub const TRACKING_PATH_SEGMENTS: &[&str] = &["track", "product"];

/// Which namespace a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// A harvested quantity of a single commodity
    Batch,
    /// A finished good derived from one or more batches
    Product,
}

impl UnitKind {
    /// Token prefix for this namespace (without the separator)
    pub fn prefix(&self) -> &'static str {
        match self {
            UnitKind::Batch => "BATCH",
            UnitKind::Product => "PROD",
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Batch => "Batch",
            UnitKind::Product => "Product",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        if prefix.eq_ignore_ascii_case("BATCH") {
            Some(UnitKind::Batch)
        } else if prefix.eq_ignore_ascii_case("PROD") {
            Some(UnitKind::Product)
        } else {
            None
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a scanned or typed string is not a valid identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Input was empty after trimming
    #[error("identifier is empty")]
    Empty,

    /// Token prefix is not a known namespace
    #[error("unknown identifier prefix in {token:?}")]
    UnknownPrefix {
        /// The offending token
        token: String,
    },

    /// Token body is not 32 hex digits
    #[error("malformed identifier token {token:?}")]
    MalformedToken {
        /// The offending token
        token: String,
    },

    /// Input looked like a URL but carried no tracking token
    #[error("URL {url:?} is not a tracking URL")]
    NotATrackingUrl {
        /// The offending URL
        url: String,
    },
}

/// The OS entropy source could not produce random bytes
#[derive(Debug, Error)]
#[error("entropy source unavailable: {0}")]
pub struct EntropyError(pub String);

/// Globally unique, unguessable identifier of a traceable unit
///
/// Ordering is by namespace and then by entropy bytes. The ledger relies on
/// this total order to acquire multi-unit locks without deadlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId {
    kind: UnitKind,
    uuid: Uuid,
}

impl UnitId {
    /// Mint a fresh identifier from the OS entropy source.
    ///
    /// Fails only when the entropy source itself fails.
    pub fn generate(kind: UnitKind) -> Result<Self, EntropyError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| EntropyError(e.to_string()))?;
        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        Ok(UnitId { kind, uuid })
    }

    /// Build an identifier from raw parts (used by tests and journal replay)
    pub fn from_parts(kind: UnitKind, bytes: [u8; 16]) -> Self {
        UnitId {
            kind,
            uuid: Uuid::from_bytes(bytes),
        }
    }

    /// Namespace of this identifier
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Raw entropy bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.uuid.as_bytes()
    }

    /// Public token form, e.g. `BATCH_9f1c…`
    pub fn token(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.uuid.simple())
    }

    fn parse_token(token: &str) -> Result<Self, IdentifierError> {
        let (prefix, body) = token
            .split_once('_')
            .ok_or_else(|| IdentifierError::MalformedToken {
                token: token.to_string(),
            })?;
        let kind = UnitKind::from_prefix(prefix).ok_or_else(|| IdentifierError::UnknownPrefix {
            token: token.to_string(),
        })?;
        if body.len() != 32 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdentifierError::MalformedToken {
                token: token.to_string(),
            });
        }
        let uuid = Uuid::try_parse(body).map_err(|_| IdentifierError::MalformedToken {
            token: token.to_string(),
        })?;
        Ok(UnitId { kind, uuid })
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.uuid.simple())
    }
}

impl FromStr for UnitId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl TryFrom<String> for UnitId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UnitId::parse_token(&value)
    }
}

impl From<UnitId> for String {
    fn from(id: UnitId) -> Self {
        id.token()
    }
}

/// Parse a scanned or typed string into an identifier.
///
/// Accepts a bare token or a tracking URL whose path contains
/// `/track/<token>` or `/product/<token>`. Query strings, fragments and a
/// trailing slash are ignored.
pub fn decode(raw: &str) -> Result<UnitId, IdentifierError> {
    decode_with(raw, TRACKING_PATH_SEGMENTS)
}

/// [`decode`] with a caller-supplied list of tracking path segments
pub fn decode_with<S: AsRef<str>>(raw: &str, path_segments: &[S]) -> Result<UnitId, IdentifierError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty);
    }

    if !trimmed.contains("://") {
        return UnitId::parse_token(trimmed);
    }

    let not_tracking = || IdentifierError::NotATrackingUrl {
        url: trimmed.to_string(),
    };
    let url = Url::parse(trimmed).map_err(|_| not_tracking())?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(not_tracking());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    // The token is the segment immediately after the last tracking marker
    let position = segments
        .iter()
        .rposition(|seg| path_segments.iter().any(|marker| marker.as_ref() == *seg))
        .ok_or_else(not_tracking)?;
    match segments.get(position + 1) {
        Some(token) if position + 2 == segments.len() => UnitId::parse_token(token),
        _ => Err(not_tracking()),
    }
}
