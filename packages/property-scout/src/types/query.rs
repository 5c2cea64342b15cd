//! Search Query submitted to the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::types::listing::{ListingRecord, PropertyType, TransactionMode};

/// What the caller is looking for.
///
/// Built through [`SearchQuery::builder`], which validates the bounds. There
/// are no setters: once built, a query is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QueryFields")]
pub struct SearchQuery {
    mode: TransactionMode,
    property_type: PropertyType,
    location: String,
    neighbourhood: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    min_area_sqft: Option<f64>,
    max_area_sqft: Option<f64>,
    bedrooms: Option<u8>,
}

/// Wire form of a query; deserializing goes through the builder checks.
#[derive(Deserialize)]
struct QueryFields {
    mode: TransactionMode,
    property_type: PropertyType,
    location: String,
    #[serde(default)]
    neighbourhood: Option<String>,
    #[serde(default)]
    min_price: Option<f64>,
    #[serde(default)]
    max_price: Option<f64>,
    #[serde(default)]
    min_area_sqft: Option<f64>,
    #[serde(default)]
    max_area_sqft: Option<f64>,
    #[serde(default)]
    bedrooms: Option<u8>,
}

impl TryFrom<QueryFields> for SearchQuery {
    type Error = QueryError;

    fn try_from(fields: QueryFields) -> Result<Self, Self::Error> {
        SearchQueryBuilder {
            query: SearchQuery {
                mode: fields.mode,
                property_type: fields.property_type,
                location: fields.location,
                neighbourhood: fields.neighbourhood,
                min_price: fields.min_price,
                max_price: fields.max_price,
                min_area_sqft: fields.min_area_sqft,
                max_area_sqft: fields.max_area_sqft,
                bedrooms: fields.bedrooms,
            },
        }
        .build()
    }
}

impl SearchQuery {
    /// Start a query for a mode, property type and city.
    pub fn builder(
        mode: TransactionMode,
        property_type: PropertyType,
        location: impl Into<String>,
    ) -> SearchQueryBuilder {
        SearchQueryBuilder {
            query: SearchQuery {
                mode,
                property_type,
                location: location.into(),
                neighbourhood: None,
                min_price: None,
                max_price: None,
                min_area_sqft: None,
                max_area_sqft: None,
                bedrooms: None,
            },
        }
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// City or district.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Area within the city (e.g. "Gulshan").
    pub fn neighbourhood(&self) -> Option<&str> {
        self.neighbourhood.as_deref()
    }

    /// Total price bounds in BDT.
    pub fn price_range(&self) -> (Option<f64>, Option<f64>) {
        (self.min_price, self.max_price)
    }

    /// Area bounds in square feet.
    pub fn area_range(&self) -> (Option<f64>, Option<f64>) {
        (self.min_area_sqft, self.max_area_sqft)
    }

    pub fn bedrooms(&self) -> Option<u8> {
        self.bedrooms
    }

    /// Whether a listing's known price and area fall inside the bounds.
    ///
    /// Unknown values always pass; bounds only exclude what they can judge.
    pub fn admits(&self, listing: &ListingRecord) -> bool {
        within(listing.total_price_bdt(), self.min_price, self.max_price)
            && within(listing.area_sqft(), self.min_area_sqft, self.max_area_sqft)
    }

    /// Short human label, e.g. "buy flat in Gulshan, Dhaka".
    pub fn describe(&self) -> String {
        let place = match &self.neighbourhood {
            Some(area) => format!("{}, {}", area, self.location),
            None => self.location.clone(),
        };
        format!("{} {} in {}", self.mode, self.property_type, place)
    }
}

fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    match value {
        None => true,
        Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
    }
}

/// Builder for [`SearchQuery`].
#[derive(Debug, Clone)]
pub struct SearchQueryBuilder {
    query: SearchQuery,
}

impl SearchQueryBuilder {
    pub fn neighbourhood(mut self, area: impl Into<String>) -> Self {
        self.query.neighbourhood = Some(area.into());
        self
    }

    pub fn min_price(mut self, bdt: f64) -> Self {
        self.query.min_price = Some(bdt);
        self
    }

    pub fn max_price(mut self, bdt: f64) -> Self {
        self.query.max_price = Some(bdt);
        self
    }

    pub fn min_area_sqft(mut self, sqft: f64) -> Self {
        self.query.min_area_sqft = Some(sqft);
        self
    }

    pub fn max_area_sqft(mut self, sqft: f64) -> Self {
        self.query.max_area_sqft = Some(sqft);
        self
    }

    pub fn bedrooms(mut self, bedrooms: u8) -> Self {
        self.query.bedrooms = Some(bedrooms);
        self
    }

    /// Validate and produce the query.
    pub fn build(self) -> Result<SearchQuery, QueryError> {
        let q = self.query;
        if q.location.trim().is_empty() {
            return Err(QueryError::EmptyLocation);
        }
        check_range("price", q.min_price, q.max_price)?;
        check_range("area", q.min_area_sqft, q.max_area_sqft)?;
        Ok(q)
    }
}

fn check_range(field: &'static str, min: Option<f64>, max: Option<f64>) -> Result<(), QueryError> {
    for bound in [min, max].into_iter().flatten() {
        if !bound.is_finite() || bound < 0.0 {
            return Err(QueryError::InvalidBound { field });
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(QueryError::InvertedRange { field, min, max });
        }
    }
    Ok(())
}
