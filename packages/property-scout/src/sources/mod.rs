//! Listing source implementations.

#[cfg(feature = "firecrawl")]
pub mod firecrawl;

#[cfg(feature = "firecrawl")]
pub use firecrawl::FirecrawlSource;
