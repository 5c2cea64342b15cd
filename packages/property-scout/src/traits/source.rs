//! ListingSource trait: the scraping collaborator.
//!
//! One call per site per run. Implementations translate the query into
//! whatever the backing service needs (a search URL plus an extraction
//! instruction for Firecrawl) and hand back loosely-typed records; turning
//! those into [`ListingRecord`](crate::types::listing::ListingRecord)s is the
//! collector's job.
//!
//! # Usage
//!
//! ```rust,ignore
//! use property_scout::{ListingSource, Site};
//!
//! let raw = source.fetch(Site::Bproperty, &query).await?;
//! ```

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::error::SourceResult;
use crate::sites::Site;
use crate::types::query::SearchQuery;

/// One property as the extract service returned it.
///
/// Every field is optional free text; sites disagree on formats and the
/// model doing the extraction fills what it can.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawListing {
    /// Listing headline
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,

    /// Full property address in Bangladesh
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,

    /// Property price in BDT as displayed, e.g. '৫০ লক্ষ টাকা' or 'Tk 8,500 per sqft'
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,

    /// Number of bedrooms
    #[serde(default, deserialize_with = "lenient_string")]
    pub bedrooms: Option<String>,

    /// Number of bathrooms
    #[serde(default, deserialize_with = "lenient_string")]
    pub bathrooms: Option<String>,

    /// Property area in katha/sft, e.g. '1200 sft' or '5 katha'
    #[serde(default, deserialize_with = "lenient_string")]
    pub area: Option<String>,

    /// Type of property, e.g. 'flat', 'ফ্ল্যাট', 'জমি', 'বাড়ি'
    #[serde(default, deserialize_with = "lenient_string")]
    pub property_type: Option<String>,

    /// Property description in Bengali/English
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,

    /// Property features and amenities
    #[serde(default, deserialize_with = "lenient_list")]
    pub features: Option<Vec<String>>,

    /// Seller/agent contact information
    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_info: Option<String>,

    /// Original listing URL
    #[serde(default, deserialize_with = "lenient_string")]
    pub listing_url: Option<String>,

    /// Whether the price is negotiable
    #[serde(default, deserialize_with = "lenient_bool")]
    pub negotiable: Option<bool>,
}

impl RawListing {
    /// Create a raw listing with only a URL.
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: Some(listing_url.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_property_type(mut self, property_type: impl Into<String>) -> Self {
        self.property_type = Some(property_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Envelope the extract service fills for one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedListings {
    /// List of properties found on the page
    #[serde(default)]
    pub properties: Vec<RawListing>,

    /// Total number of properties found
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_count: Option<u32>,

    /// Website the properties were found on
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_website: Option<String>,
}

/// Accept strings, numbers and booleans; map null and blanks to `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept booleans and the yes/no words models write instead.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|n| n != 0.0),
        Some(serde_json::Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" | "negotiable" | "হ্যাঁ" | "আলোচনা সাপেক্ষে" => Some(true),
            "no" | "n" | "false" | "fixed" | "না" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Accept a list of scalars, or one comma-separated string.
fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let items: Vec<String> = match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_json::Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => return Ok(None),
    };
    Ok((!items.is_empty()).then_some(items))
}

/// Accept a non-negative integer or its decimal text; anything else is `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// The scraping collaborator.
///
/// Implementations:
/// - `FirecrawlSource` - Firecrawl extract API (requires `firecrawl` feature)
/// - `MockListingSource` - canned responses for tests
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch raw listings for one site, constrained to that site's domain.
    ///
    /// An empty vector is a valid answer; the collector decides what it
    /// means.
    async fn fetch(&self, site: Site, query: &SearchQuery) -> SourceResult<Vec<RawListing>>;

    /// Source name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: ListingSource + ?Sized> ListingSource for Arc<T> {
    async fn fetch(&self, site: Site, query: &SearchQuery) -> SourceResult<Vec<RawListing>> {
        (**self).fetch(site, query).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: ListingSource + ?Sized> ListingSource for Box<T> {
    async fn fetch(&self, site: Site, query: &SearchQuery) -> SourceResult<Vec<RawListing>> {
        (**self).fetch(site, query).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
