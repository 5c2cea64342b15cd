//! Markdown rendering of a completed report.
//!
//! Listing URLs and price text are printed exactly as scraped.

use std::fmt::Write;

use crate::types::listing::{Currency, Price, PriceUnit};
use crate::types::report::{GroupStats, MarketReport, Report};
use crate::types::valuation::ValuationResult;

const CRORE: f64 = 10_000_000.0;
const LAKH: f64 = 100_000.0;

/// Taka amount in the lakh/crore notation buyers use.
pub fn format_bdt(amount: f64) -> String {
    if amount >= CRORE {
        format!("Tk {:.2} crore", amount / CRORE)
    } else if amount >= LAKH {
        format!("Tk {:.2} lakh", amount / LAKH)
    } else {
        format!("Tk {}", group_thousands(amount.round() as u64))
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_price(price: &Price) -> String {
    let amount = match price.currency() {
        Currency::Bdt => format_bdt(price.amount()),
        Currency::Usd => format!("${}", group_thousands(price.amount().round() as u64)),
    };
    match price.unit() {
        PriceUnit::Total => amount,
        PriceUnit::PerArea(unit) => format!("{} per {}", amount, unit.label()),
    }
}

fn format_stats(stats: &GroupStats, per_sqft: bool) -> String {
    let money = |v: f64| {
        if per_sqft {
            format!("Tk {}/sqft", group_thousands(v.round() as u64))
        } else {
            format_bdt(v)
        }
    };
    match stats {
        GroupStats::Computed(s) => format!(
            "{} (min {}, max {}, n={})",
            money(s.median),
            money(s.min),
            money(s.max),
            s.sample_size
        ),
        GroupStats::InsufficientData { sample_size } => {
            format!("insufficient data (n={})", sample_size)
        }
    }
}

fn render_market(out: &mut String, market: &MarketReport) {
    let _ = writeln!(out, "## Market overview\n");
    let _ = writeln!(out, "- Listings considered: {}", market.listings_considered);
    let _ = writeln!(out, "- Sources that failed: {}", market.failed_source_count());
    for failure in &market.failed_sources {
        let _ = writeln!(out, "  - {}", failure);
    }
    let _ = writeln!(
        out,
        "- Median price: {}",
        format_stats(&market.overall.total_price, false)
    );
    let _ = writeln!(
        out,
        "- Median price per sqft: {}\n",
        format_stats(&market.overall.per_sqft, true)
    );

    if !market.groups.is_empty() {
        let _ = writeln!(out, "| Type | Location | Listings | Price | Per sqft |");
        let _ = writeln!(out, "|---|---|---|---|---|");
        for group in &market.groups {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                group.property_type,
                group.location,
                group.listing_count,
                format_stats(&group.prices.total_price, false),
                format_stats(&group.prices.per_sqft, true)
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "### Trends\n\n{}\n", market.narrative);
}

fn render_valuation(out: &mut String, valuation: &ValuationResult) {
    let estimate = valuation
        .estimated_price
        .map(format_bdt)
        .unwrap_or_else(|| "no estimate".to_string());
    let _ = writeln!(
        out,
        "- Estimated fair price: {} ({} confidence, {} comparables)",
        estimate, valuation.confidence, valuation.comparable_count
    );
    if let Some(recommendation) = valuation.recommendation {
        let _ = writeln!(out, "- Recommendation: {}", recommendation);
    }
    let _ = writeln!(out, "- Assessment: {}", valuation.narrative);
}

/// Render the whole report as Markdown.
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Property report: {}\n",
        report.market.query.describe()
    );
    let _ = writeln!(
        out,
        "_Run {} generated {}_\n",
        report.run_id,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    render_market(&mut out, &report.market);

    let _ = writeln!(out, "## Listings\n");
    for (i, listing) in report.listings.iter().enumerate() {
        let _ = writeln!(out, "### {}. {}\n", i + 1, listing.title);

        let price = match (&listing.price_text, &listing.price) {
            (Some(text), _) => text.clone(),
            (None, Some(price)) => format_price(price),
            (None, None) => "not listed".to_string(),
        };
        let _ = writeln!(out, "- Price: {}", price);
        let _ = writeln!(out, "- Location: {}", listing.location.text);
        let _ = writeln!(out, "- Type: {} ({})", listing.property_type, listing.mode);
        if let Some(area) = &listing.area {
            let _ = writeln!(out, "- Area: {}", area);
        }
        if let Some(bedrooms) = listing.bedrooms {
            let _ = writeln!(out, "- Bedrooms: {}", bedrooms);
        }
        let _ = writeln!(out, "- Source: {} <{}>", listing.site, listing.url);

        if let Some(valuation) = report
            .valuations
            .iter()
            .find(|v| v.listing_url == listing.url)
        {
            render_valuation(&mut out, valuation);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bdt() {
        assert_eq!(format_bdt(12_000_000.0), "Tk 1.20 crore");
        assert_eq!(format_bdt(5_000_000.0), "Tk 50.00 lakh");
        assert_eq!(format_bdt(25_000.0), "Tk 25,000");
        assert_eq!(format_bdt(999.0), "Tk 999");
    }

    #[test]
    fn test_per_area_price() {
        let price = Price::new(
            8_500.0,
            Currency::Bdt,
            PriceUnit::PerArea(crate::types::listing::AreaUnit::Sqft),
        )
        .unwrap();
        assert_eq!(format_price(&price), "Tk 8,500 per sqft");
    }
}
