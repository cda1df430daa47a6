//! # Verdant
//!
//! Chain-of-custody ledger for agricultural commodities.
//!
//! Batches are recorded at harvest, handed between growers, intermediaries
//! and processors, and consumed into products. Every step is an append-only
//! custody event; a unit's status is always the replay of its history.
//! Anyone holding a product's tracking code can resolve its full journey,
//! including the histories of the batches it was made from.
//!
//! ## Quick Start
//!
//! ```ignore
//! use verdant::prelude::*;
//!
//! let db = Verdant::open("./custody")?;
//!
//! let grower = Party::grower("suresh")?;
//! let dealer = Party::intermediary("collective")?;
//! let batch = db.batches.create(NewBatch::new(
//!     Commodity::from_label("Ashwagandha Root")?,
//!     Quantity::new(50.0, MeasureUnit::Kilograms)?,
//!     Location::named("Neemuch, Madhya Pradesh")?,
//!     grower.clone(),
//! ))?;
//! db.batches.transfer(&batch.id(), grower, dealer.clone())?;
//! db.batches.receive(&batch.id(), dealer)?;
//!
//! let product = db.products.aggregate("Ashwagandha Powder", [batch.id()], Party::processor("ayur-mfg")?)?;
//! let journey = db.journeys.resolve(&db.journeys.tracking_url(&product.id()))?;
//! ```
//!
//! ## Facades
//!
//! - [`Batches`] - harvest records and custody transfer
//! - [`Products`] - aggregation, packaging, distribution
//! - [`EvidenceLog`] - lab reports and certifications
//! - [`Journeys`] - public provenance resolution

#![warn(missing_docs)]

mod database;
mod error;
mod primitives;
mod types;

pub mod prelude;

// Re-export main entry points
pub use database::{Verdant, VerdantBuilder};
pub use error::{Error, Result};

// Re-export facades
pub use primitives::{Batches, EvidenceLog, Journeys, Products};

// Re-export types
pub use types::*;
