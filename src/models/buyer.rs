//! Buyer profile types.
//!
//! A buyer profile describes one purchase: where it is, what it costs and
//! the facts about the buyer that decide which duty schedule and concession
//! apply.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Jurisdiction;

/// Whether the purchase is a home or vacant land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// A dwelling, established or new.
    Home,
    /// Vacant land intended for building a home.
    Land,
}

impl PropertyType {
    /// Returns the snake_case name used in configuration and audit output.
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::Home => "home",
            PropertyType::Land => "land",
        }
    }
}

/// The buyer facts that steer mode selection and concessions.
///
/// # Example
///
/// ```
/// use stamp_duty_engine::models::{BuyerFlags, PropertyType};
///
/// let flags = BuyerFlags {
///     is_first_home_buyer: true,
///     is_owner_occupier: true,
///     ..BuyerFlags::default()
/// };
/// assert_eq!(flags.property_type(), PropertyType::Home);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerFlags {
    /// The purchase is vacant land.
    #[serde(default)]
    pub is_vacant_land: bool,
    /// The buyer will live in the property.
    #[serde(default)]
    pub is_owner_occupier: bool,
    /// The buyer has never owned a home.
    #[serde(default)]
    pub is_first_home_buyer: bool,
    /// Region within the jurisdiction (e.g. "metro" or "regional").
    /// Defaults to the jurisdiction's primary region.
    #[serde(default)]
    pub region: Option<String>,
}

impl BuyerFlags {
    /// Returns the property type implied by the vacant land flag.
    pub fn property_type(&self) -> PropertyType {
        if self.is_vacant_land {
            PropertyType::Land
        } else {
            PropertyType::Home
        }
    }
}

/// One duty query: jurisdiction, price and buyer facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerProfile {
    /// Where the property is.
    pub jurisdiction: Jurisdiction,
    /// The dutiable value (purchase price).
    pub price: Decimal,
    /// The buyer facts.
    #[serde(flatten)]
    pub flags: BuyerFlags,
}

impl BuyerProfile {
    /// Creates a profile for the given jurisdiction, price and flags.
    pub fn new(jurisdiction: Jurisdiction, price: Decimal, flags: BuyerFlags) -> Self {
        Self {
            jurisdiction,
            price,
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags_describe_an_established_home() {
        let flags = BuyerFlags::default();
        assert_eq!(flags.property_type(), PropertyType::Home);
        assert!(!flags.is_first_home_buyer);
        assert!(flags.region.is_none());
    }

    #[test]
    fn test_vacant_land_flag_maps_to_land() {
        let flags = BuyerFlags {
            is_vacant_land: true,
            ..BuyerFlags::default()
        };
        assert_eq!(flags.property_type(), PropertyType::Land);
        assert_eq!(flags.property_type().as_str(), "land");
    }

    #[test]
    fn test_profile_deserializes_with_flat_flags() {
        let json = r#"{
            "jurisdiction": "NSW",
            "price": "750000",
            "is_first_home_buyer": true,
            "region": "regional"
        }"#;
        let profile: BuyerProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.jurisdiction, Jurisdiction::Nsw);
        assert_eq!(profile.price, Decimal::from(750_000));
        assert!(profile.flags.is_first_home_buyer);
        assert!(!profile.flags.is_vacant_land);
        assert_eq!(profile.flags.region.as_deref(), Some("regional"));
    }
}
