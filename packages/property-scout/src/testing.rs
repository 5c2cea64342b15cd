//! Testing utilities including mock implementations.
//!
//! Deterministic stand-ins for the listing source and the inference
//! provider, so pipelines can be exercised without network or model calls.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{InferenceError, InferenceResult, SourceError, SourceResult};
use crate::location::Location;
use crate::sites::Site;
use crate::traits::inference::{GroundingContext, Inference};
use crate::traits::source::{ListingSource, RawListing};
use crate::types::listing::{Language, ListingRecord, Price, PropertyType, TransactionMode};
use crate::types::query::SearchQuery;

/// A failure the mock source should raise for a site.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Timeout,
    Quota(String),
    Unavailable(u16),
    Parse(String),
}

impl MockFailure {
    fn to_error(&self, site: Site) -> SourceError {
        match self {
            Self::Timeout => SourceError::Timeout { site },
            Self::Quota(detail) => SourceError::Quota(detail.clone()),
            Self::Unavailable(status) => SourceError::Api {
                status: *status,
                message: "mock site unavailable".into(),
            },
            Self::Parse(detail) => SourceError::Parse(detail.clone()),
        }
    }
}

/// Record of a fetch made against the mock source.
#[derive(Debug, Clone)]
pub struct MockFetchCall {
    pub site: Site,
    pub query: SearchQuery,
}

/// A mock listing source with canned per-site answers.
///
/// Sites without a canned answer return no listings.
#[derive(Default, Clone)]
pub struct MockListingSource {
    listings: Arc<RwLock<HashMap<Site, Vec<RawListing>>>>,
    failures: Arc<RwLock<HashMap<Site, MockFailure>>>,
    delays: Arc<RwLock<HashMap<Site, Duration>>>,
    calls: Arc<RwLock<Vec<MockFetchCall>>>,
}

impl MockListingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these raw listings for a site.
    pub fn with_listings(self, site: Site, listings: Vec<RawListing>) -> Self {
        self.listings.write().unwrap().insert(site, listings);
        self
    }

    /// Fail every fetch for a site.
    pub fn with_failure(self, site: Site, failure: MockFailure) -> Self {
        self.failures.write().unwrap().insert(site, failure);
        self
    }

    /// Wait before answering for a site.
    pub fn with_delay(self, site: Site, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(site, delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockFetchCall> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl ListingSource for MockListingSource {
    async fn fetch(&self, site: Site, query: &SearchQuery) -> SourceResult<Vec<RawListing>> {
        self.calls.write().unwrap().push(MockFetchCall {
            site,
            query: query.clone(),
        });

        let delay = self.delays.read().unwrap().get(&site).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.failures.read().unwrap().get(&site) {
            return Err(failure.to_error(site));
        }

        Ok(self
            .listings
            .read()
            .unwrap()
            .get(&site)
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Record of a call made to the mock inference provider.
#[derive(Debug, Clone)]
pub struct MockInferenceCall {
    pub prompt: String,
    pub context: GroundingContext,
}

/// A mock inference provider.
///
/// Answers with the first canned response whose key appears in the prompt,
/// then with the default response. Prompts containing a failure key fail.
#[derive(Clone)]
pub struct MockInference {
    responses: Arc<RwLock<Vec<(String, String)>>>,
    failure_keys: Arc<RwLock<Vec<String>>>,
    default_response: String,
    failing: bool,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<MockInferenceCall>>>,
}

impl Default for MockInference {
    fn default() -> Self {
        Self {
            responses: Arc::default(),
            failure_keys: Arc::default(),
            default_response: "Mock narrative.".to_string(),
            failing: false,
            delay: None,
            calls: Arc::default(),
        }
    }
}

impl MockInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `key` with `response`.
    pub fn with_response(self, key: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push((key.into(), response.into()));
        self
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Fail every call with a provider error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Fail only the calls whose prompt contains `key`.
    pub fn failing_on(self, key: impl Into<String>) -> Self {
        self.failure_keys.write().unwrap().push(key.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockInferenceCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Inference for MockInference {
    async fn infer(&self, prompt: &str, context: &GroundingContext) -> InferenceResult<String> {
        self.calls.write().unwrap().push(MockInferenceCall {
            prompt: prompt.to_string(),
            context: context.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let keyed_failure = self
            .failure_keys
            .read()
            .unwrap()
            .iter()
            .any(|key| prompt.contains(key.as_str()));
        if self.failing || keyed_failure {
            return Err(InferenceError::Api {
                status: 503,
                message: "mock inference unavailable".into(),
            });
        }

        let canned = self
            .responses
            .read()
            .unwrap()
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, response)| response.clone());
        Ok(canned.unwrap_or_else(|| self.default_response.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A parsed Dhaka-style listing for tests: a buy listing on Bikroy with a
/// total BDT price and no area.
pub fn listing(
    url: &str,
    property_type: PropertyType,
    location: &str,
    price_bdt: f64,
) -> ListingRecord {
    ListingRecord {
        site: Site::Bikroy,
        title: format!("{} in {}", property_type, location),
        price: Price::bdt(price_bdt),
        price_text: Some(format!("Tk {}", price_bdt)),
        location: Location::resolve(location, ""),
        property_type,
        mode: TransactionMode::Buy,
        area: None,
        url: url.to_string(),
        description: String::new(),
        language: Language::English,
        bedrooms: None,
        bathrooms: None,
        negotiable: None,
        features: Vec::new(),
        contact: None,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> SearchQuery {
        SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_mock_source_answers_and_records() {
        let source = MockListingSource::new()
            .with_listings(Site::Bikroy, vec![RawListing::new("https://www.bikroy.com/ad/1")])
            .with_failure(Site::Bproperty, MockFailure::Quota("credits".into()));

        assert_eq!(source.fetch(Site::Bikroy, &query()).await.unwrap().len(), 1);
        assert!(matches!(
            source.fetch(Site::Bproperty, &query()).await,
            Err(SourceError::Quota(_))
        ));
        assert!(source.fetch(Site::AmarBari, &query()).await.unwrap().is_empty());
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_inference_matches_prompt() {
        let ai = MockInference::new()
            .with_response("market", "Steady demand.")
            .with_default_response("Fair price.");

        let ctx = GroundingContext::new();
        assert_eq!(ai.infer("Write a market analysis", &ctx).await.unwrap(), "Steady demand.");
        assert_eq!(ai.infer("Assess this listing", &ctx).await.unwrap(), "Fair price.");
        assert_eq!(ai.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_inference_keyed_failure() {
        let ai = MockInference::new().failing_on("Listing: B");
        let ctx = GroundingContext::new();
        assert!(ai.infer("Listing: A", &ctx).await.is_ok());
        assert!(matches!(
            ai.infer("Listing: B", &ctx).await,
            Err(InferenceError::Api { status: 503, .. })
        ));
    }
}
