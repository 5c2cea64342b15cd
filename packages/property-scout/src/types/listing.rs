//! Listing Record: one normalized property advertisement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::location::Location;
use crate::sites::Site;

/// Buy or rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    Buy,
    Rent,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("buy"),
            Self::Rent => f.write_str("rent"),
        }
    }
}

/// Property category. Anything unrecognized is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Flat,
    Office,
    Land,
    Other,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::House => "house",
            Self::Flat => "flat",
            Self::Office => "office",
            Self::Land => "land",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Language the listing text is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Bengali,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Bdt,
    Usd,
}

/// Area units seen on Bangladeshi listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    Sqft,
    Sqm,
    Katha,
    Decimal,
    Bigha,
    Acre,
}

impl AreaUnit {
    /// Square feet in one unit.
    pub fn sqft_factor(&self) -> f64 {
        match self {
            AreaUnit::Sqft => 1.0,
            AreaUnit::Sqm => 10.763_910_4,
            AreaUnit::Katha => 720.0,
            AreaUnit::Decimal => 435.6,
            AreaUnit::Bigha => 14_400.0,
            AreaUnit::Acre => 43_560.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AreaUnit::Sqft => "sqft",
            AreaUnit::Sqm => "sqm",
            AreaUnit::Katha => "katha",
            AreaUnit::Decimal => "decimal",
            AreaUnit::Bigha => "bigha",
            AreaUnit::Acre => "acre",
        }
    }
}

/// A non-negative quantity of floor or land area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AreaFields")]
pub struct Area {
    value: f64,
    unit: AreaUnit,
}

#[derive(Deserialize)]
struct AreaFields {
    value: f64,
    unit: AreaUnit,
}

impl TryFrom<AreaFields> for Area {
    type Error = String;

    fn try_from(fields: AreaFields) -> Result<Self, Self::Error> {
        Area::new(fields.value, fields.unit)
            .ok_or_else(|| format!("invalid area value: {}", fields.value))
    }
}

impl Area {
    /// Returns `None` for negative or non-finite values.
    pub fn new(value: f64, unit: AreaUnit) -> Option<Self> {
        (value.is_finite() && value >= 0.0).then_some(Self { value, unit })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> AreaUnit {
        self.unit
    }

    pub fn sqft(&self) -> f64 {
        self.value * self.unit.sqft_factor()
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.label())
    }
}

/// Whether a price covers the whole property or one unit of area.
///
/// Rent listings are `Total` per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "basis", content = "area_unit")]
pub enum PriceUnit {
    Total,
    PerArea(AreaUnit),
}

/// A non-negative asking price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PriceFields")]
pub struct Price {
    amount: f64,
    currency: Currency,
    unit: PriceUnit,
}

#[derive(Deserialize)]
struct PriceFields {
    amount: f64,
    currency: Currency,
    unit: PriceUnit,
}

impl TryFrom<PriceFields> for Price {
    type Error = String;

    fn try_from(fields: PriceFields) -> Result<Self, Self::Error> {
        Price::new(fields.amount, fields.currency, fields.unit)
            .ok_or_else(|| format!("invalid price amount: {}", fields.amount))
    }
}

impl Price {
    /// Returns `None` for negative or non-finite amounts.
    pub fn new(amount: f64, currency: Currency, unit: PriceUnit) -> Option<Self> {
        (amount.is_finite() && amount >= 0.0).then_some(Self {
            amount,
            currency,
            unit,
        })
    }

    /// Total price in BDT.
    pub fn bdt(amount: f64) -> Option<Self> {
        Self::new(amount, Currency::Bdt, PriceUnit::Total)
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn unit(&self) -> PriceUnit {
        self.unit
    }

    /// Whole-property price, converting a per-area price when the area is known.
    pub fn total(&self, area: Option<&Area>) -> Option<f64> {
        match self.unit {
            PriceUnit::Total => Some(self.amount),
            PriceUnit::PerArea(unit) => {
                area.map(|a| self.amount * a.sqft() / unit.sqft_factor())
            }
        }
    }

    /// Price per square foot, when computable.
    pub fn per_sqft(&self, area: Option<&Area>) -> Option<f64> {
        match self.unit {
            PriceUnit::PerArea(unit) => Some(self.amount / unit.sqft_factor()),
            PriceUnit::Total => area
                .map(Area::sqft)
                .filter(|sqft| *sqft > 0.0)
                .map(|sqft| self.amount / sqft),
        }
    }
}

/// One normalized property advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub site: Site,
    pub title: String,
    pub price: Option<Price>,

    /// Price text exactly as the site showed it
    pub price_text: Option<String>,

    pub location: Location,
    pub property_type: PropertyType,
    pub mode: TransactionMode,
    pub area: Option<Area>,

    /// Listing link as scraped (resolved to absolute if it was relative)
    pub url: String,

    pub description: String,
    pub language: Language,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<u8>,
    pub negotiable: Option<bool>,

    #[serde(default)]
    pub features: Vec<String>,

    pub contact: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ListingRecord {
    /// Whole-property price in BDT, if known.
    pub fn total_price_bdt(&self) -> Option<f64> {
        self.price
            .filter(|p| p.currency() == Currency::Bdt)
            .and_then(|p| p.total(self.area.as_ref()))
    }

    /// BDT per square foot, if known.
    pub fn price_per_sqft_bdt(&self) -> Option<f64> {
        self.price
            .filter(|p| p.currency() == Currency::Bdt)
            .and_then(|p| p.per_sqft(self.area.as_ref()))
    }

    pub fn area_sqft(&self) -> Option<f64> {
        self.area.as_ref().map(Area::sqft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_values_rejected() {
        assert!(Price::bdt(-1.0).is_none());
        assert!(Price::bdt(f64::NAN).is_none());
        assert!(Area::new(-5.0, AreaUnit::Katha).is_none());
        assert!(Area::new(0.0, AreaUnit::Sqft).is_some());
    }

    #[test]
    fn test_deserialize_rejects_negative_price() {
        let json = r#"{"amount": -10.0, "currency": "bdt", "unit": {"basis": "total"}}"#;
        assert!(serde_json::from_str::<Price>(json).is_err());
    }

    #[test]
    fn test_per_area_price_conversion() {
        let price = Price::new(9_000.0, Currency::Bdt, PriceUnit::PerArea(AreaUnit::Sqft)).unwrap();
        let area = Area::new(1_200.0, AreaUnit::Sqft).unwrap();
        assert_eq!(price.per_sqft(Some(&area)), Some(9_000.0));
        assert_eq!(price.total(Some(&area)), Some(10_800_000.0));
        assert_eq!(price.total(None), None);
    }

    #[test]
    fn test_total_price_per_sqft_needs_area() {
        let price = Price::bdt(7_200_000.0).unwrap();
        let land = Area::new(5.0, AreaUnit::Katha).unwrap();
        assert_eq!(price.per_sqft(Some(&land)), Some(2_000.0));
        assert_eq!(price.per_sqft(None), None);

        let zero = Area::new(0.0, AreaUnit::Sqft).unwrap();
        assert_eq!(price.per_sqft(Some(&zero)), None);
    }
}
