//! Valuation Result for a single listing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::listing::Price;
use crate::types::report::Narrative;

/// Fewer comparables than this is `Low` confidence.
pub const MEDIUM_CONFIDENCE_MIN_COMPARABLES: usize = 3;

/// At least this many comparables is `High` confidence.
pub const HIGH_CONFIDENCE_MIN_COMPARABLES: usize = 10;

/// How much a valuation can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// 0–2 ⇒ Low, 3–9 ⇒ Medium, 10+ ⇒ High.
    pub fn from_comparable_count(count: usize) -> Self {
        if count >= HIGH_CONFIDENCE_MIN_COMPARABLES {
            Self::High
        } else if count >= MEDIUM_CONFIDENCE_MIN_COMPARABLES {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("Low"),
            Self::Medium => f.write_str("Medium"),
            Self::High => f.write_str("High"),
        }
    }
}

/// Suggested action for a buyer or tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Buy,
    Negotiate,
    Avoid,
}

impl Recommendation {
    /// Lenient parse of a model's free-text recommendation.
    pub fn parse(text: &str) -> Option<Self> {
        let lowered = text.trim().to_lowercase();
        if lowered.starts_with("buy") || lowered.starts_with("rent") || lowered == "proceed" {
            Some(Self::Buy)
        } else if lowered.starts_with("negotiat") {
            Some(Self::Negotiate)
        } else if lowered.starts_with("avoid") || lowered.starts_with("skip") {
            Some(Self::Avoid)
        } else {
            None
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("Buy"),
            Self::Negotiate => f.write_str("Negotiate"),
            Self::Avoid => f.write_str("Avoid"),
        }
    }
}

/// Fair-price estimate for one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// URL of the listing this result belongs to
    pub listing_url: String,

    /// Listed price, carried through unchanged
    pub listed_price: Option<Price>,
    pub listed_price_text: Option<String>,

    /// Median-of-comparables estimate in BDT
    pub baseline: Option<f64>,

    /// Final estimate in BDT
    pub estimated_price: Option<f64>,

    pub confidence: Confidence,
    pub comparable_count: usize,
    pub recommendation: Option<Recommendation>,
    pub narrative: Narrative,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(Confidence::from_comparable_count(0), Confidence::Low);
        assert_eq!(Confidence::from_comparable_count(2), Confidence::Low);
        assert_eq!(Confidence::from_comparable_count(3), Confidence::Medium);
        assert_eq!(Confidence::from_comparable_count(9), Confidence::Medium);
        assert_eq!(Confidence::from_comparable_count(10), Confidence::High);
        assert_eq!(Confidence::from_comparable_count(250), Confidence::High);
    }

    #[test]
    fn test_recommendation_parse() {
        assert_eq!(Recommendation::parse("Buy now"), Some(Recommendation::Buy));
        assert_eq!(Recommendation::parse("negotiate"), Some(Recommendation::Negotiate));
        assert_eq!(Recommendation::parse(" AVOID "), Some(Recommendation::Avoid));
        assert_eq!(Recommendation::parse("maybe"), None);
    }
}
