//! LLM prompts for extraction, market analysis and valuation.
//!
//! Templates use `{placeholder}` markers filled by the `format_*` helpers.

use crate::sites::Site;
use crate::traits::inference::GroundingContext;
use crate::types::listing::ListingRecord;
use crate::types::query::SearchQuery;

/// System instruction shared by the inference adapters.
pub const SYSTEM_PROMPT: &str = r#"You are a Bangladeshi real-estate analyst.
You understand prices written in lakh (100,000) and crore (10,000,000) taka,
land measured in katha, decimal and bigha, and listings written in Bengali,
English or a mix of both.

You are always given a block of grounding facts computed from scraped
listings. Treat those numbers as authoritative: never contradict them and
never invent statistics that are not in them. When the facts are thin, say so."#;

/// Instruction sent to the extract service for one search results page.
pub const EXTRACT_PROMPT: &str = r#"You are extracting property listings from a Bangladeshi real-estate website ({site}).
Extract every property listing visible on the page, typically 15-25 per page.

The user is searching for: {query}
{bounds}

For each property extract:
- title: the listing headline
- address: full address including area and city (required)
- price: the price exactly as shown, including lakh/crore/টাকা wording (required)
- bedrooms and bathrooms
- area: as shown, e.g. '1200 sft' or '5 katha'
- property_type: flat, house, land, office and so on
- description, features, contact_info
- listing_url: the link to the listing's detail page
- negotiable: true if the price is marked negotiable

Keep listings even when some fields are missing. Leave missing fields empty
rather than guessing. Keep Bengali text as written.
Set total_count to the number of listings extracted and source_website to {site}."#;

/// Request for market trend commentary.
pub const MARKET_ANALYSIS_PROMPT: &str = r#"Write a short market analysis for {count} listings matching "{query}".

Cover, in bullet points and under 150 words in total:
- market condition (buyer's or seller's market) as far as the numbers show
- an overview of the areas the listings are in
- up to three investment observations

Base every figure you mention on the grounding facts."#;

/// Request for a single listing's valuation.
pub const VALUATION_PROMPT: &str = r#"Assess whether this listing is fairly priced.

Listing: {title}
Location: {location}
Listed price: {price}
Area: {area}

The grounding facts include a baseline estimate computed from {comparables} comparable listings.
Refine the baseline only if the listing details justify it.

Respond with JSON only:
{
    "estimated_price": number in BDT,
    "recommendation": "buy" | "negotiate" | "avoid",
    "narrative": "under 60 words, citing the baseline"
}"#;

/// Fill the extraction instruction for a site and query.
pub fn format_extract_prompt(site: Site, query: &SearchQuery) -> String {
    EXTRACT_PROMPT
        .replace("{site}", site.display_name())
        .replace("{query}", &query.describe())
        .replace("{bounds}", &describe_bounds(query))
}

/// Fill the market analysis request.
pub fn format_market_analysis_prompt(query: &SearchQuery, count: usize) -> String {
    MARKET_ANALYSIS_PROMPT
        .replace("{count}", &count.to_string())
        .replace("{query}", &query.describe())
}

/// Fill the valuation request for one listing.
pub fn format_valuation_prompt(listing: &ListingRecord, comparables: usize) -> String {
    VALUATION_PROMPT
        .replace("{title}", &listing.title)
        .replace("{location}", &listing.location.text)
        .replace("{price}", listing.price_text.as_deref().unwrap_or("not listed"))
        .replace(
            "{area}",
            &listing
                .area
                .map(|a| a.to_string())
                .unwrap_or_else(|| "not listed".to_string()),
        )
        .replace("{comparables}", &comparables.to_string())
}

/// Prompt followed by the grounding facts, as one user message.
pub fn with_grounding(prompt: &str, context: &GroundingContext) -> String {
    if context.is_empty() {
        return prompt.to_string();
    }
    format!(
        "{}\n\nGrounding facts (JSON):\n{}",
        prompt,
        context.to_prompt_json()
    )
}

fn describe_bounds(query: &SearchQuery) -> String {
    let mut lines = Vec::new();
    match query.price_range() {
        (Some(min), Some(max)) => lines.push(format!("Budget: {:.0} to {:.0} BDT", min, max)),
        (Some(min), None) => lines.push(format!("Budget: at least {:.0} BDT", min)),
        (None, Some(max)) => lines.push(format!("Budget: up to {:.0} BDT", max)),
        (None, None) => {}
    }
    match query.area_range() {
        (Some(min), Some(max)) => lines.push(format!("Area: {:.0} to {:.0} sqft", min, max)),
        (Some(min), None) => lines.push(format!("Area: at least {:.0} sqft", min)),
        (None, Some(max)) => lines.push(format!("Area: up to {:.0} sqft", max)),
        (None, None) => {}
    }
    if let Some(bedrooms) = query.bedrooms() {
        lines.push(format!("Bedrooms: {}", bedrooms));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::{PropertyType, TransactionMode};

    #[test]
    fn test_extract_prompt_carries_bounds() {
        let query = SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
            .neighbourhood("Gulshan")
            .max_price(15_000_000.0)
            .bedrooms(3)
            .build()
            .unwrap();
        let prompt = format_extract_prompt(Site::Bproperty, &query);
        assert!(prompt.contains("Bproperty.com"));
        assert!(prompt.contains("buy flat in Gulshan, Dhaka"));
        assert!(prompt.contains("Budget: up to 15000000 BDT"));
        assert!(prompt.contains("Bedrooms: 3"));
        assert!(!prompt.contains("{bounds}"));
    }

    #[test]
    fn test_with_grounding() {
        let context = GroundingContext::new().fact("baseline", 7_000_000.0);
        let message = with_grounding("Assess", &context);
        assert!(message.starts_with("Assess"));
        assert!(message.contains("\"baseline\""));
        assert_eq!(with_grounding("Assess", &GroundingContext::new()), "Assess");
    }
}
