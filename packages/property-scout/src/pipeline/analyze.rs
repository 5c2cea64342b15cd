//! Market analysis: local aggregates plus a grounded narrative.

use indexmap::IndexMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::pipeline::prompts::format_market_analysis_prompt;
use crate::pipeline::stats::summarize;
use crate::traits::inference::{infer_bounded, GroundingContext, Inference};
use crate::types::listing::{ListingRecord, PropertyType};
use crate::types::query::SearchQuery;
use crate::types::report::{GroupSummary, MarketReport, Narrative, PriceSummary, SiteFailure};

/// Aggregates per (property type, location), in first-seen order.
pub fn group_listings(listings: &[ListingRecord]) -> Vec<GroupSummary> {
    let mut groups: IndexMap<(PropertyType, String), Vec<&ListingRecord>> = IndexMap::new();
    for listing in listings {
        groups
            .entry((listing.property_type, listing.location.group_key()))
            .or_default()
            .push(listing);
    }

    groups
        .into_iter()
        .map(|((property_type, location), members)| GroupSummary {
            property_type,
            location,
            listing_count: members.len(),
            prices: summarize(members.iter().copied()),
        })
        .collect()
}

/// Grounding facts for the market narrative.
pub fn market_context(
    query: &SearchQuery,
    overall: &PriceSummary,
    groups: &[GroupSummary],
    listing_count: usize,
    failed_sources: usize,
) -> GroundingContext {
    GroundingContext::new()
        .fact("query", query.describe())
        .fact("listings_considered", listing_count)
        .fact("failed_sources", failed_sources)
        .fact("overall", overall)
        .fact("groups", groups)
}

/// Build the market report for a set of listings.
///
/// The numbers are always computed. An empty set skips inference and
/// reports [`Narrative::NoData`]; an inference failure leaves the narrative
/// [`Narrative::Unavailable`].
pub async fn analyze<I: Inference + ?Sized>(
    inference: &I,
    query: &SearchQuery,
    listings: &[ListingRecord],
    failed_sources: Vec<SiteFailure>,
    inference_timeout: Option<Duration>,
) -> MarketReport {
    let overall = summarize(listings);
    let groups = group_listings(listings);

    let narrative = if listings.is_empty() {
        Narrative::NoData
    } else {
        let context = market_context(
            query,
            &overall,
            &groups,
            listings.len(),
            failed_sources.len(),
        );
        let prompt = format_market_analysis_prompt(query, listings.len());
        match infer_bounded(inference, &prompt, &context, inference_timeout).await {
            Ok(text) => Narrative::Text(text),
            Err(e) => {
                warn!(provider = inference.name(), error = %e, "Market narrative unavailable");
                Narrative::Unavailable
            }
        }
    };

    info!(
        listings = listings.len(),
        groups = groups.len(),
        narrative = narrative.is_available(),
        "Market analysis complete"
    );

    MarketReport {
        query: query.clone(),
        overall,
        groups,
        narrative,
        listings_considered: listings.len(),
        failed_sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{listing, MockInference};
    use crate::types::listing::TransactionMode;
    use crate::types::report::GroupStats;

    fn query() -> SearchQuery {
        SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
            .build()
            .unwrap()
    }

    #[test]
    fn test_small_groups_are_insufficient() {
        let listings = vec![
            listing("https://a/1", PropertyType::Flat, "Banani, Dhaka", 6_000_000.0),
            listing("https://a/2", PropertyType::Flat, "Uttara, Dhaka", 7_000_000.0),
            listing("https://a/3", PropertyType::Flat, "Mirpur, Dhaka", 8_000_000.0),
            listing("https://a/4", PropertyType::Land, "Agrabad, Chittagong", 9_000_000.0),
        ];
        let groups = group_listings(&listings);
        assert_eq!(groups.len(), 2);

        let flats = &groups[0];
        assert_eq!((flats.property_type, flats.location.as_str()), (PropertyType::Flat, "dhaka"));
        assert_eq!(flats.prices.total_price.computed().unwrap().median, 7_000_000.0);

        let land = &groups[1];
        assert_eq!(land.listing_count, 1);
        assert_eq!(land.prices.total_price, GroupStats::InsufficientData { sample_size: 1 });
    }

    #[tokio::test]
    async fn test_empty_input_skips_inference() {
        let ai = MockInference::new().with_default_response("should not be used");
        let report = analyze(&ai, &query(), &[], vec![], None).await;

        assert_eq!(report.narrative, Narrative::NoData);
        assert_eq!(report.listings_considered, 0);
        assert!(ai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_inference_failure_keeps_numbers() {
        let ai = MockInference::new().failing();
        let listings = vec![
            listing("https://a/1", PropertyType::Flat, "Dhaka", 6_000_000.0),
            listing("https://a/2", PropertyType::Flat, "Dhaka", 7_000_000.0),
            listing("https://a/3", PropertyType::Flat, "Dhaka", 8_000_000.0),
        ];
        let report = analyze(&ai, &query(), &listings, vec![], None).await;

        assert_eq!(report.narrative, Narrative::Unavailable);
        assert_eq!(report.overall.total_price.computed().unwrap().median, 7_000_000.0);
    }

    #[tokio::test]
    async fn test_narrative_grounded_in_aggregates() {
        let ai = MockInference::new().with_default_response("Prices are steady.");
        let listings = vec![listing("https://a/1", PropertyType::Flat, "Dhaka", 6_000_000.0)];
        let report = analyze(&ai, &query(), &listings, vec![], None).await;

        assert_eq!(report.narrative, Narrative::Text("Prices are steady.".into()));
        let calls = ai.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].context.get("listings_considered"), Some(&serde_json::json!(1)));
    }
}
