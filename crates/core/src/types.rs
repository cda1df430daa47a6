//! Core value types for the custody model
//!
//! This module defines the small value objects shared by every layer:
//! - [`Party`]: who performed a custody action
//! - [`Location`]: where it happened
//! - [`Quantity`] and [`MeasureUnit`]: how much was harvested
//! - [`Commodity`]: what was harvested
//! - Opaque handles: [`EvidenceRef`], [`MediaRef`], [`IdempotencyKey`]

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a party plays in the supply chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// Farmer or wild collector who creates batches
    Grower,
    /// Dealer, aggregator or collective between grower and processor
    Intermediary,
    /// Manufacturer that receives batches and produces products
    Processor,
    /// Testing laboratory issuing reports
    Laboratory,
    /// Shop or distributor handing products to consumers
    Retailer,
    /// End consumer
    Consumer,
}

impl PartyRole {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Grower => "grower",
            PartyRole::Intermediary => "intermediary",
            PartyRole::Processor => "processor",
            PartyRole::Laboratory => "laboratory",
            PartyRole::Retailer => "retailer",
            PartyRole::Consumer => "consumer",
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an actor in the supply chain
///
/// Identity is asserted by the caller; authentication happens outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Party {
    /// Stable party identifier (registration number, account id, ...)
    pub id: String,
    /// Role the party acts in
    pub role: PartyRole,
}

impl Party {
    /// Create a party, rejecting blank identifiers
    pub fn new(id: impl Into<String>, role: PartyRole) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyField("party id"));
        }
        Ok(Party { id, role })
    }

    /// Shorthand for a grower
    pub fn grower(id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(id, PartyRole::Grower)
    }

    /// Shorthand for an intermediary
    pub fn intermediary(id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(id, PartyRole::Intermediary)
    }

    /// Shorthand for a processor
    pub fn processor(id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(id, PartyRole::Processor)
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude, -90..=90
    pub lat: f64,
    /// Longitude, -180..=180
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point, rejecting out-of-range or non-finite coordinates
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(ValidationError::InvalidCoordinates { lat, lon });
        }
        Ok(GeoPoint { lat, lon })
    }
}

/// Where a custody action took place
///
/// The core stores the descriptor verbatim and never geocodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Human-readable place descriptor, e.g. "Neemuch, Madhya Pradesh"
    pub descriptor: String,
    /// Optional coordinates captured by the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<GeoPoint>,
}

impl Location {
    /// Location without coordinates
    pub fn named(descriptor: impl Into<String>) -> Result<Self, ValidationError> {
        let descriptor = descriptor.into();
        if descriptor.trim().is_empty() {
            return Err(ValidationError::EmptyField("location"));
        }
        Ok(Location {
            descriptor,
            point: None,
        })
    }

    /// Attach coordinates
    pub fn with_point(mut self, point: GeoPoint) -> Self {
        self.point = Some(point);
        self
    }
}

/// Unit of measure for batch quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureUnit {
    /// Kilograms
    #[serde(rename = "kg")]
    Kilograms,
    /// Grams
    #[serde(rename = "g")]
    Grams,
    /// Metric tonnes
    #[serde(rename = "tonnes")]
    Tonnes,
}

impl MeasureUnit {
    /// Get the unit symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureUnit::Kilograms => "kg",
            MeasureUnit::Grams => "g",
            MeasureUnit::Tonnes => "tonnes",
        }
    }

    /// Parse a unit symbol
    pub fn parse(symbol: &str) -> Result<Self, ValidationError> {
        match symbol.trim().to_ascii_lowercase().as_str() {
            "kg" | "kilogram" | "kilograms" => Ok(MeasureUnit::Kilograms),
            "g" | "gram" | "grams" => Ok(MeasureUnit::Grams),
            "t" | "tonne" | "tonnes" => Ok(MeasureUnit::Tonnes),
            _ => Err(ValidationError::UnknownUnit(symbol.to_string())),
        }
    }
}

impl fmt::Display for MeasureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positive amount with its unit of measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    amount: f64,
    unit: MeasureUnit,
}

impl Quantity {
    /// Create a quantity; the amount must be finite and strictly positive
    pub fn new(amount: f64, unit: MeasureUnit) -> Result<Self, ValidationError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::NonPositiveQuantity(amount));
        }
        Ok(Quantity { amount, unit })
    }

    /// Amount in `unit`
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Unit of measure
    pub fn unit(&self) -> MeasureUnit {
        self.unit
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

/// A harvested commodity, free-text or taken from the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commodity {
    /// Common name, e.g. "Ashwagandha Root"
    pub name: String,
    /// Botanical name, e.g. "Withania somnifera"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub botanical_name: Option<String>,
}

/// A catalogue entry for a commonly traded herb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueEntry {
    /// Common name
    pub name: &'static str,
    /// Botanical name
    pub botanical_name: &'static str,
    /// Harvested plant part
    pub plant_part: &'static str,
}

const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        name: "Ashwagandha Root",
        botanical_name: "Withania somnifera",
        plant_part: "Root",
    },
    CatalogueEntry {
        name: "Tulsi Leaves",
        botanical_name: "Ocimum sanctum",
        plant_part: "Leaves",
    },
    CatalogueEntry {
        name: "Giloy Stem",
        botanical_name: "Tinospora cordifolia",
        plant_part: "Stem",
    },
    CatalogueEntry {
        name: "Turmeric Rhizome",
        botanical_name: "Curcuma longa",
        plant_part: "Rhizome",
    },
    CatalogueEntry {
        name: "Brahmi Whole Plant",
        botanical_name: "Bacopa monnieri",
        plant_part: "Whole Plant",
    },
    CatalogueEntry {
        name: "Neem Leaves",
        botanical_name: "Azadirachta indica",
        plant_part: "Leaves",
    },
];

impl Commodity {
    /// Free-text commodity
    pub fn named(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField("commodity"));
        }
        Ok(Commodity {
            name: name.trim().to_string(),
            botanical_name: None,
        })
    }

    /// Parse a `"Name (Botanical name)"` label.
    ///
    /// A plain name is looked up in the catalogue to fill in the botanical
    /// name; unknown names are kept as free text.
    pub fn from_label(label: &str) -> Result<Self, ValidationError> {
        let label = label.trim();
        if let Some((name, rest)) = label.split_once('(') {
            if let Some(botanical) = rest.strip_suffix(')') {
                let mut commodity = Commodity::named(name)?;
                let botanical = botanical.trim();
                if !botanical.is_empty() {
                    commodity.botanical_name = Some(botanical.to_string());
                }
                return Ok(commodity);
            }
        }
        match Self::lookup(label) {
            Some(entry) => Ok(entry.into()),
            None => Commodity::named(label),
        }
    }

    /// The built-in herb catalogue
    pub fn catalogue() -> &'static [CatalogueEntry] {
        CATALOGUE
    }

    /// Case-insensitive catalogue lookup by common name
    pub fn lookup(name: &str) -> Option<&'static CatalogueEntry> {
        CATALOGUE
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
    }
}

impl From<&CatalogueEntry> for Commodity {
    fn from(entry: &CatalogueEntry) -> Self {
        Commodity {
            name: entry.name.to_string(),
            botanical_name: Some(entry.botanical_name.to_string()),
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.botanical_name {
            Some(botanical) => write!(f, "{} ({})", self.name, botanical),
            None => f.write_str(&self.name),
        }
    }
}

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a handle, rejecting blank strings
            pub fn new(handle: impl Into<String>) -> Result<Self, ValidationError> {
                let handle = handle.into();
                if handle.trim().is_empty() {
                    return Err(ValidationError::EmptyField($field));
                }
                Ok($name(handle))
            }

            /// The raw handle
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_handle!(
    /// Handle to a lab report or certificate held by the document store
    EvidenceRef,
    "evidence reference"
);

opaque_handle!(
    /// Handle to a photo held by the media store
    MediaRef,
    "media reference"
);

opaque_handle!(
    /// Client-chosen key that makes a submission safe to retry
    IdempotencyKey,
    "idempotency key"
);
