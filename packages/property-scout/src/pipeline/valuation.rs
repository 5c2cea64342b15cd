//! Valuation: comparables, a local baseline and an inference refinement.

use futures::future;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::pipeline::parse::parse_price;
use crate::pipeline::prompts::format_valuation_prompt;
use crate::pipeline::stats::median;
use crate::traits::inference::{infer_bounded, GroundingContext, Inference};
use crate::types::listing::ListingRecord;
use crate::types::report::{MarketReport, Narrative};
use crate::types::valuation::{Confidence, Recommendation, ValuationResult};

/// Largest accepted deviation of a refined estimate from the baseline.
pub const MAX_REFINEMENT_DEVIATION: f64 = 0.5;

/// Listings similar enough to ground a valuation of `listings[subject]`.
///
/// Same property type and transaction mode, same or adjacent location, and
/// a known BDT price. The subject itself is never included.
pub fn find_comparables(listings: &[ListingRecord], subject: usize) -> Vec<&ListingRecord> {
    let Some(target) = listings.get(subject) else {
        return Vec::new();
    };

    listings
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != subject)
        .map(|(_, candidate)| candidate)
        .filter(|c| c.property_type == target.property_type && c.mode == target.mode)
        .filter(|c| c.location.is_near(&target.location))
        .filter(|c| c.total_price_bdt().is_some() || c.price_per_sqft_bdt().is_some())
        .collect()
}

/// Median-of-comparables estimate for a listing.
///
/// Scales the median per-sqft price by the subject's area when both are
/// known, otherwise falls back to the median total price.
pub fn baseline(subject: &ListingRecord, comparables: &[&ListingRecord]) -> Option<f64> {
    let per_sqft: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.price_per_sqft_bdt())
        .collect();

    if let Some(area) = subject.area_sqft().filter(|a| *a > 0.0) {
        if let Some(rate) = median(&per_sqft) {
            return Some(rate * area);
        }
    }

    let totals: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.total_price_bdt())
        .collect();
    median(&totals)
}

/// Keep a refined estimate only when it stays near the baseline.
fn accept_refinement(baseline: Option<f64>, refined: Option<f64>) -> Option<f64> {
    let refined = refined.filter(|r| r.is_finite() && *r >= 0.0);
    match (baseline, refined) {
        (Some(base), Some(r)) if (r - base).abs() <= base * MAX_REFINEMENT_DEVIATION => Some(r),
        (Some(base), _) => Some(base),
        (None, r) => r,
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValuationReply {
    #[serde(default)]
    estimated_price: Option<Value>,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    narrative: Option<String>,
}

/// Read the model's reply. Anything that is not the requested JSON becomes
/// the narrative as-is.
fn parse_reply(text: &str) -> (Option<f64>, Option<Recommendation>, String) {
    let body = strip_code_fence(text);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return (None, None, text.trim().to_string()),
    };

    match serde_json::from_str::<ValuationReply>(json) {
        Ok(reply) => {
            let estimate = reply.estimated_price.as_ref().and_then(amount_of);
            let recommendation = reply.recommendation.as_deref().and_then(Recommendation::parse);
            let narrative = reply
                .narrative
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| text.trim().to_string());
            (estimate, recommendation, narrative)
        }
        Err(_) => (None, None, text.trim().to_string()),
    }
}

fn amount_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s).map(|p| p.amount()),
        _ => None,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Value `listings[subject]`, or `None` when `subject` is out of range.
///
/// Inference problems never fail a valuation: without inference the result
/// carries the baseline, `Low` confidence and an `Unavailable` narrative.
pub async fn estimate<I: Inference + ?Sized>(
    inference: &I,
    listings: &[ListingRecord],
    subject: usize,
    market: &MarketReport,
    inference_timeout: Option<Duration>,
) -> Option<ValuationResult> {
    let target = listings.get(subject)?;
    let comparables = find_comparables(listings, subject);
    let baseline = baseline(target, &comparables);
    let confidence = Confidence::from_comparable_count(comparables.len());

    let context = GroundingContext::new()
        .fact("listed_price_bdt", target.total_price_bdt())
        .fact("listed_price_text", &target.price_text)
        .fact("area_sqft", target.area_sqft())
        .fact("property_type", target.property_type)
        .fact("location", &target.location)
        .fact("baseline_bdt", baseline)
        .fact("comparable_count", comparables.len())
        .fact(
            "comparable_prices_bdt",
            comparables
                .iter()
                .filter_map(|c| c.total_price_bdt())
                .collect::<Vec<_>>(),
        )
        .fact("confidence", confidence)
        .fact("market_overall", &market.overall);

    let prompt = format_valuation_prompt(target, comparables.len());

    let mut result = ValuationResult {
        listing_url: target.url.clone(),
        listed_price: target.price,
        listed_price_text: target.price_text.clone(),
        baseline,
        estimated_price: baseline,
        confidence,
        comparable_count: comparables.len(),
        recommendation: None,
        narrative: Narrative::Unavailable,
    };

    match infer_bounded(inference, &prompt, &context, inference_timeout).await {
        Ok(text) => {
            let (refined, recommendation, narrative) = parse_reply(&text);
            result.estimated_price = accept_refinement(baseline, refined);
            result.recommendation = recommendation;
            result.narrative = Narrative::Text(narrative);
        }
        Err(e) => {
            warn!(url = %target.url, error = %e, "Valuation narrative unavailable");
            result.confidence = Confidence::Low;
        }
    }

    debug!(
        url = %target.url,
        comparables = result.comparable_count,
        confidence = %result.confidence,
        "Listing valued"
    );

    Some(result)
}

/// Value every listing, at most `concurrency` at a time, in input order.
pub async fn estimate_all<I: Inference + ?Sized>(
    inference: &I,
    listings: &[ListingRecord],
    market: &MarketReport,
    inference_timeout: Option<Duration>,
    concurrency: usize,
) -> Vec<ValuationResult> {
    stream::iter(0..listings.len())
        .map(|i| estimate(inference, listings, i, market, inference_timeout))
        .buffered(concurrency.max(1))
        .filter_map(future::ready)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze::analyze;
    use crate::testing::{listing, MockInference};
    use crate::types::listing::{Area, AreaUnit, PropertyType, TransactionMode};
    use crate::types::query::SearchQuery;

    fn flats(count: usize) -> Vec<ListingRecord> {
        (0..count)
            .map(|i| {
                listing(
                    &format!("https://www.bikroy.com/ad/{}", i),
                    PropertyType::Flat,
                    "Mirpur, Dhaka",
                    5_000_000.0 + i as f64 * 100_000.0,
                )
            })
            .collect()
    }

    async fn market(listings: &[ListingRecord]) -> MarketReport {
        let query = SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
            .build()
            .unwrap();
        analyze(&MockInference::new().failing(), &query, listings, vec![], None).await
    }

    #[test]
    fn test_comparables_exclude_subject_and_other_regions() {
        let mut listings = flats(4);
        listings.push(listing("https://x/ctg", PropertyType::Flat, "Chittagong", 4_000_000.0));
        listings.push(listing("https://x/land", PropertyType::Land, "Dhaka", 4_000_000.0));
        listings.push(listing("https://x/gazipur", PropertyType::Flat, "Gazipur", 4_000_000.0));

        let comps = find_comparables(&listings, 0);
        let urls: Vec<&str> = comps.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.bikroy.com/ad/1",
                "https://www.bikroy.com/ad/2",
                "https://www.bikroy.com/ad/3",
                "https://x/gazipur",
            ]
        );
    }

    #[test]
    fn test_baseline_prefers_per_sqft() {
        let mut subject = listing("https://x/s", PropertyType::Flat, "Dhaka", 0.0);
        subject.area = Area::new(1_000.0, AreaUnit::Sqft);

        let mut comps = flats(3);
        for c in &mut comps {
            c.area = Area::new(1_000.0, AreaUnit::Sqft);
        }
        let refs: Vec<&ListingRecord> = comps.iter().collect();
        assert_eq!(baseline(&subject, &refs), Some(5_100_000.0));

        subject.area = None;
        assert_eq!(baseline(&subject, &refs), Some(5_100_000.0));
        assert_eq!(baseline(&subject, &[]), None);
    }

    #[test]
    fn test_refinement_bounds() {
        assert_eq!(accept_refinement(Some(100.0), Some(140.0)), Some(140.0));
        assert_eq!(accept_refinement(Some(100.0), Some(151.0)), Some(100.0));
        assert_eq!(accept_refinement(Some(100.0), None), Some(100.0));
        assert_eq!(accept_refinement(None, Some(42.0)), Some(42.0));
        assert_eq!(accept_refinement(None, Some(-1.0)), None);
    }

    #[test]
    fn test_parse_reply_variants() {
        let fenced = "```json\n{\"estimated_price\": 7200000, \"recommendation\": \"negotiate\", \"narrative\": \"Slightly high.\"}\n```";
        assert_eq!(
            parse_reply(fenced),
            (Some(7_200_000.0), Some(Recommendation::Negotiate), "Slightly high.".to_string())
        );

        let worded = r#"{"estimated_price": "72 lakh", "narrative": "Fair."}"#;
        assert_eq!(parse_reply(worded).0, Some(7_200_000.0));

        let prose = "Looks fairly priced for Mirpur.";
        assert_eq!(parse_reply(prose), (None, None, prose.to_string()));
    }

    #[tokio::test]
    async fn test_inference_failure_forces_low_confidence() {
        let listings = flats(12);
        let market = market(&listings).await;
        let result = estimate(&MockInference::new().failing(), &listings, 0, &market, None)
            .await
            .unwrap();

        assert_eq!(result.comparable_count, 11);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.narrative, Narrative::Unavailable);
        assert_eq!(result.estimated_price, result.baseline);
        assert!(result.baseline.is_some());
    }

    #[tokio::test]
    async fn test_subject_out_of_range() {
        let listings = flats(2);
        let market = market(&listings).await;
        let ai = MockInference::new();

        assert!(estimate(&ai, &listings, 2, &market, None).await.is_none());
        assert!(estimate(&ai, &[], 0, &market, None).await.is_none());
        assert!(ai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_estimate_all_preserves_order() {
        let listings = flats(6);
        let market = market(&listings).await;
        let ai = MockInference::new().with_default_response(
            r#"{"estimated_price": 5200000, "recommendation": "buy", "narrative": "Fair."}"#,
        );

        let results = estimate_all(&ai, &listings, &market, None, 3).await;
        let urls: Vec<&str> = results.iter().map(|r| r.listing_url.as_str()).collect();
        let expected: Vec<&str> = listings.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, expected);
        assert!(results.iter().all(|r| r.confidence == Confidence::Medium));
        assert!(results.iter().all(|r| r.recommendation == Some(Recommendation::Buy)));
    }
}
