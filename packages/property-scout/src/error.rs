//! Typed errors for the property scout library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! fatal run failure apart from the per-site and per-record failures that the
//! pipeline absorbs on its own.

use thiserror::Error;

use crate::sites::Site;
use crate::types::report::SiteFailure;

/// Errors from the scraping collaborator (one site, one call).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The call did not finish within the configured bound
    #[error("timeout fetching listings from {site}")]
    Timeout { site: Site },

    /// Quota or rate limit exhausted on the extract service
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-2xx response from the extract service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The extract job ran but reported failure
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing credentials or invalid settings
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from the inference collaborator.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The call did not finish within the configured bound
    #[error("inference call timed out")]
    Timeout,

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-2xx response from the provider
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Provider answered without any text
    #[error("empty response from provider")]
    EmptyResponse,

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing credentials or invalid settings
    #[error("config error: {0}")]
    Config(String),
}

/// Errors raised while building a search query.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    /// Location must name at least a city
    #[error("location must not be empty")]
    EmptyLocation,

    /// A bound was negative or not a finite number
    #[error("{field} must be a non-negative number")]
    InvalidBound { field: &'static str },

    /// Lower bound above upper bound
    #[error("{field}: minimum {min} exceeds maximum {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

/// Fatal failure of a pipeline run.
///
/// Analysis and valuation degrade instead of failing, so collection is the
/// only stage that can end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every site failed or no site produced a matching listing
    #[error("no listings found ({} site failures)", failures.len())]
    NoListingsFound { failures: Vec<SiteFailure> },
}

impl PipelineError {
    /// Per-site failures recorded before the run gave up.
    pub fn site_failures(&self) -> &[SiteFailure] {
        match self {
            Self::NoListingsFound { failures } => failures,
        }
    }
}

/// Result type alias for scraping operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for inference operations.
pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

/// Result type alias for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;
