//! Market Report and the composite run Report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::SourceError;
use crate::sites::Site;
use crate::types::listing::{ListingRecord, PropertyType};
use crate::types::query::SearchQuery;
use crate::types::valuation::ValuationResult;

/// Minimum sample size for a statistic to be reported as a number.
pub const MIN_GROUP_SIZE: usize = 3;

/// Narrative text from the inference collaborator, or why there is none.
///
/// Only narrative fields ever take the `Unavailable` form; numbers are never
/// replaced by placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Narrative {
    Text(String),
    NoData,
    Unavailable,
}

impl Narrative {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Narrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::NoData => f.write_str("No listing data was available for this query."),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Min / median / max over a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub sample_size: usize,
}

/// A statistic that is either computed or withheld for lack of data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupStats {
    Computed(PriceStats),
    InsufficientData { sample_size: usize },
}

impl GroupStats {
    pub fn computed(&self) -> Option<&PriceStats> {
        match self {
            Self::Computed(stats) => Some(stats),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn sample_size(&self) -> usize {
        match self {
            Self::Computed(stats) => stats.sample_size,
            Self::InsufficientData { sample_size } => *sample_size,
        }
    }
}

/// Price statistics for one slice of listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    /// Whole-property price in BDT
    pub total_price: GroupStats,

    /// BDT per square foot
    pub per_sqft: GroupStats,
}

/// Listings sharing a property type and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub property_type: PropertyType,
    pub location: String,
    pub listing_count: usize,
    pub prices: PriceSummary,
}

/// Why a site contributed nothing to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SiteFailureReason {
    Timeout,
    Quota(String),
    NoResults,
    Parse(String),
    Unavailable(String),
}

impl fmt::Display for SiteFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out"),
            Self::Quota(detail) => write!(f, "quota exceeded: {}", detail),
            Self::NoResults => f.write_str("no matching listings"),
            Self::Parse(detail) => write!(f, "unreadable response: {}", detail),
            Self::Unavailable(detail) => write!(f, "unavailable: {}", detail),
        }
    }
}

impl From<&SourceError> for SiteFailureReason {
    fn from(err: &SourceError) -> Self {
        match err {
            SourceError::Timeout { .. } => Self::Timeout,
            SourceError::Quota(detail) => Self::Quota(detail.clone()),
            SourceError::Parse(detail) | SourceError::Extraction(detail) => {
                Self::Parse(detail.clone())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// A site that failed during collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailure {
    pub site: Site,
    pub reason: SiteFailureReason,
}

impl SiteFailure {
    pub fn new(site: Site, reason: SiteFailureReason) -> Self {
        Self { site, reason }
    }
}

impl fmt::Display for SiteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.site, self.reason)
    }
}

/// Aggregates and trend narrative for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub query: SearchQuery,
    pub overall: PriceSummary,
    pub groups: Vec<GroupSummary>,
    pub narrative: Narrative,
    pub listings_considered: usize,
    pub failed_sources: Vec<SiteFailure>,
}

impl MarketReport {
    pub fn failed_source_count(&self) -> usize {
        self.failed_sources.len()
    }
}

/// Everything a completed run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,

    /// Deduplicated listings in collection order
    pub listings: Vec<ListingRecord>,

    pub market: MarketReport,

    /// One per listing, same order as `listings`
    pub valuations: Vec<ValuationResult>,
}
