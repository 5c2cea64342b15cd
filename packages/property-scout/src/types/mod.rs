//! Data types for listings, queries, reports and configuration.

pub mod config;
pub mod listing;
pub mod query;
pub mod report;
pub mod valuation;
