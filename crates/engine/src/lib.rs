//! Custody engine for Verdant
//!
//! The engine sits between callers and a [`verdant_ledger::LedgerStore`]:
//! - [`IdentifierAuthority`]: mints identifiers and renders tracking URLs
//! - custody operations: create, transfer, receive, package, distribute
//! - evidence attachment
//! - aggregation of received batches into products, all-or-nothing
//! - the journey resolver, sync and async with a bounded timeout
//!
//! Every operation is a method on [`Engine`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregation;
pub mod authority;
pub mod config;
pub mod custody;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod journey;

pub use aggregation::NewProduct;
pub use authority::IdentifierAuthority;
pub use config::{AggregationConfig, EngineConfig, ResolverConfig, TrackingConfig};
pub use custody::{NewBatch, Submission, UnitFilter};
pub use engine::Engine;
pub use error::{AggregationError, AggregationReason, EngineError, ResolveError, Result};
pub use journey::{Journey, SourceBatch, Stage, StageDetail, UnitSummary};
