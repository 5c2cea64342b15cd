//! Configuration for a pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::sites::Site;

/// Settings shared by every run of a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sites to search, in order. Default: all supported sites.
    pub sites: Vec<Site>,

    /// Bound on each scrape call. `None` leaves it to the client's own
    /// timeout.
    pub fetch_timeout: Option<Duration>,

    /// Bound on each inference call. `None` leaves it to the client.
    pub inference_timeout: Option<Duration>,

    /// Listings valued at once. Output order does not depend on it.
    ///
    /// Default: 4.
    pub valuation_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sites: Site::ALL.to_vec(),
            fetch_timeout: None,
            inference_timeout: None,
            valuation_concurrency: 4,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the search to these sites.
    pub fn with_sites(mut self, sites: impl IntoIterator<Item = Site>) -> Self {
        self.sites = sites.into_iter().collect();
        self
    }

    /// Set the per-call scrape timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Set the per-call inference timeout.
    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = Some(timeout);
        self
    }

    /// Set valuation concurrency (clamped to at least 1).
    pub fn with_valuation_concurrency(mut self, concurrency: usize) -> Self {
        self.valuation_concurrency = concurrency.max(1);
        self
    }
}
