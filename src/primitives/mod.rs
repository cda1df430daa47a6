//! Per-concern facades over the custody engine.
//!
//! Each facade offers a simple form that takes the acting party directly and
//! a `_with` form taking a full [`verdant_engine::Submission`] for callers
//! that carry device time, location or an idempotency key.

mod batches;
mod evidence;
mod journeys;
mod products;

pub use batches::Batches;
pub use evidence::EvidenceLog;
pub use journeys::Journeys;
pub use products::Products;
