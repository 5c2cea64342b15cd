//! Property Scout
//!
//! Searches Bangladeshi real-estate listing sites, aggregates what it finds
//! and values each listing against its comparables.
//!
//! Scraping and language-model inference are external collaborators behind
//! the [`ListingSource`] and [`Inference`] traits. Everything numeric is
//! computed locally; the model only writes narrative, grounded in those
//! numbers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use property_scout::{Pipeline, PropertyType, SearchQuery, TransactionMode};
//! use property_scout::ai::Gemini;
//! use property_scout::sources::FirecrawlSource;
//!
//! let query = SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
//!     .neighbourhood("Mirpur")
//!     .max_price(8_000_000.0)
//!     .build()?;
//!
//! let pipeline = Pipeline::new(FirecrawlSource::from_env()?, Gemini::from_env()?);
//! let report = pipeline.run(&query).await?;
//! println!("{}", property_scout::format::render_markdown(&report));
//! ```
//!
//! # Modules
//!
//! - [`types`] - Listings, queries, reports and configuration
//! - [`traits`] - The listing source and inference seams
//! - [`pipeline`] - Collection, analysis, valuation and the orchestrator
//! - [`sources`] - Firecrawl listing source
//! - [`ai`] - Gemini and OpenAI inference providers
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod error;
pub mod format;
pub mod location;
pub mod pipeline;
pub mod security;
pub mod sites;
pub mod sources;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{InferenceError, PipelineError, QueryError, SourceError};
pub use location::{Division, Location};
pub use pipeline::{CollectOutcome, Pipeline, PipelineState, ProgressObserver};
pub use sites::{Site, UnknownSite};
pub use traits::{
    inference::{GroundingContext, Inference},
    source::{ExtractedListings, ListingSource, RawListing},
};
pub use types::{
    config::PipelineConfig,
    listing::{
        Area, AreaUnit, Currency, Language, ListingRecord, Price, PriceUnit, PropertyType,
        TransactionMode,
    },
    query::{SearchQuery, SearchQueryBuilder},
    report::{
        GroupStats, GroupSummary, MarketReport, Narrative, PriceStats, PriceSummary, Report,
        SiteFailure, SiteFailureReason, MIN_GROUP_SIZE,
    },
    valuation::{Confidence, Recommendation, ValuationResult},
};

// Re-export testing utilities
pub use testing::{MockInference, MockListingSource};
