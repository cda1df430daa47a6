//! Validation errors for core value types
//!
//! Identifier, lifecycle and replay errors live next to the code that
//! produces them ([`crate::identifier`], [`crate::lifecycle`], [`crate::unit`]).

use thiserror::Error;

/// A value object was constructed from invalid input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required text field was blank
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Quantity amount was zero, negative or not finite
    #[error("quantity must be a positive number, got {0}")]
    NonPositiveQuantity(f64),

    /// Unit of measure symbol not recognised
    #[error("unknown unit of measure: {0}")]
    UnknownUnit(String),

    /// Coordinates out of range
    #[error("invalid coordinates: lat {lat}, lon {lon}")]
    InvalidCoordinates {
        /// Latitude supplied
        lat: f64,
        /// Longitude supplied
        lon: f64,
    },

    /// Best-before date precedes manufacture date
    #[error("best-before date precedes manufacture date")]
    DatesOutOfOrder,
}
