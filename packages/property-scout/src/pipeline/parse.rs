//! Turning raw extract records into [`ListingRecord`]s.
//!
//! Sites print prices and areas as free text in English, Bengali, or both:
//! `৫০ লক্ষ টাকা`, `Tk 1.2 Crore`, `8,500 per sqft`, `৫ কাঠা`. Everything here
//! is pure so it can be tested without a source.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::location::Location;
use crate::sites::Site;
use crate::traits::source::RawListing;
use crate::types::listing::{
    Area, AreaUnit, Currency, Language, ListingRecord, Price, PriceUnit, PropertyType,
};
use crate::types::query::SearchQuery;

/// Values the extractor writes when a field is absent.
const PLACEHOLDERS: &[&str] = &[
    "উল্লেখ নেই",
    "n/a",
    "na",
    "none",
    "null",
    "-",
    "not mentioned",
    "not specified",
    "not available",
];

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<num>\d[\d,]*(?:\.\d+)?)(?:\s*(?P<mult>crores?|cr|কোটি|lakhs?|lacs?|লক্ষ|লাখ|million|mn|thousand|হাজার|k)\b)?",
    )
    .expect("amount regex is valid")
});

static PER_AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:per|/|প্রতি)\s*(?P<unit>[a-z\p{Bengali}][a-z.\s\p{Bengali}]*)")
        .expect("per-area regex is valid")
});

static AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<num>\d[\d,]*(?:\.\d+)?)\s*(?P<unit>[a-z\p{Bengali}][a-z.\s\p{Bengali}]*)?")
        .expect("area regex is valid")
});

static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("count regex is valid"));

static PROPERTY_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:apartments?|flats?|condos?|houses?|homes?|villas?|duplex|buildings?|offices?|commercial|land|plots?|shops?|warehouses?|garages?)\b|ফ্ল্যাট|অ্যাপার্টমেন্ট|এপার্টমেন্ট|বা\x{09A1}\x{09BC}[িী]|ভবন|অফিস|জমি|প্লট|দোকান",
    )
    .expect("property keyword regex is valid")
});

/// Map Bengali digits to ASCII.
pub fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{09E6}'..='\u{09EF}' => {
                char::from_digit(c as u32 - 0x09E6, 10).unwrap_or(c)
            }
            other => other,
        })
        .collect()
}

/// Whether a field holds nothing but a "not mentioned" marker.
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim().to_lowercase();
    trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed.as_str())
}

fn clean(field: Option<&String>) -> Option<&str> {
    field.map(|s| s.trim()).filter(|s| !is_placeholder(s))
}

fn parse_number(text: &str) -> Option<f64> {
    text.replace(',', "").parse::<f64>().ok()
}

fn multiplier(word: &str) -> f64 {
    match word {
        "crore" | "crores" | "cr" | "কোটি" => 10_000_000.0,
        "lakh" | "lakhs" | "lac" | "lacs" | "লক্ষ" | "লাখ" => 100_000.0,
        "million" | "mn" => 1_000_000.0,
        "thousand" | "হাজার" | "k" => 1_000.0,
        _ => 1.0,
    }
}

/// Recognize an area unit at the start of `text`.
pub fn area_unit(text: &str) -> Option<AreaUnit> {
    let unit = text.trim_start();
    let starts = |prefixes: &[&str]| prefixes.iter().any(|p| unit.starts_with(p));

    if starts(&["sq ft", "sq.ft", "sqft", "sft", "sq. ft", "square f", "বর্গফুট", "স্কয়ার ফিট", "স্কয়ার ফুট"]) {
        Some(AreaUnit::Sqft)
    } else if starts(&["sq m", "sq.m", "sqm", "square met", "বর্গমিটার"]) {
        Some(AreaUnit::Sqm)
    } else if starts(&["katha", "kattha", "kata", "কাঠা"]) {
        Some(AreaUnit::Katha)
    } else if starts(&["decimal", "shotangsho", "শতাংশ", "শতক", "ডেসিমেল"]) {
        Some(AreaUnit::Decimal)
    } else if starts(&["bigha", "বিঘা"]) {
        Some(AreaUnit::Bigha)
    } else if starts(&["acre", "একর"]) {
        Some(AreaUnit::Acre)
    } else {
        None
    }
}

/// Parse a listed price.
///
/// Currency is BDT unless the text says dollars. A trailing "per sqft",
/// "/katha" and the like makes it a per-area price.
pub fn parse_price(text: &str) -> Option<Price> {
    if is_placeholder(text) {
        return None;
    }
    let normalized = to_ascii_digits(text).to_lowercase();

    // "১ কোটি ২০ লক্ষ" is one amount written in descending parts.
    let mut parts = AMOUNT_RE.captures_iter(&normalized).filter_map(|caps| {
        let value = parse_number(caps.name("num")?.as_str())?;
        let scale = caps.name("mult").map_or(1.0, |m| multiplier(m.as_str()));
        Some((value, scale))
    });
    let (value, mut scale) = parts.next()?;
    let mut amount = value * scale;
    if scale > 1.0 {
        for (value, next_scale) in parts {
            if next_scale <= 1.0 || next_scale >= scale {
                break;
            }
            amount += value * next_scale;
            scale = next_scale;
        }
    }

    let currency = if normalized.contains('$') || normalized.contains("usd") {
        Currency::Usd
    } else {
        Currency::Bdt
    };

    let unit = PER_AREA_RE
        .captures_iter(&normalized)
        .find_map(|c| c.name("unit").and_then(|u| area_unit(u.as_str())))
        .map_or(PriceUnit::Total, PriceUnit::PerArea);

    Price::new(amount, currency, unit)
}

/// Parse a listed area. A bare number is square feet.
pub fn parse_area(text: &str) -> Option<Area> {
    if is_placeholder(text) {
        return None;
    }
    let normalized = to_ascii_digits(text).to_lowercase();

    let caps = AREA_RE.captures(&normalized)?;
    let value = parse_number(caps.name("num")?.as_str())?;
    let unit = caps
        .name("unit")
        .and_then(|u| area_unit(u.as_str()))
        .unwrap_or(AreaUnit::Sqft);

    Area::new(value, unit)
}

/// First integer in the text, e.g. "৩ বেডরুম" or "3 Beds".
pub fn parse_count(text: &str) -> Option<u8> {
    if is_placeholder(text) {
        return None;
    }
    let normalized = to_ascii_digits(text);
    COUNT_RE.find(&normalized)?.as_str().parse().ok()
}

/// Language of a piece of listing text, judged by its letters.
///
/// Text with no letters at all counts as English.
pub fn detect_language(text: &str) -> Language {
    let mut bengali = 0usize;
    let mut latin = 0usize;
    for c in text.chars() {
        if ('\u{0980}'..='\u{09FF}').contains(&c) && !('\u{09E6}'..='\u{09EF}').contains(&c) {
            bengali += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    let letters = bengali + latin;
    if letters == 0 {
        return Language::English;
    }
    let share = bengali as f64 / letters as f64;
    if share >= 0.9 {
        Language::Bengali
    } else if share <= 0.1 {
        Language::English
    } else {
        Language::Mixed
    }
}

/// Spell precomposed nukta letters (ড়, ঢ়, য়) as base letter plus nukta, so
/// both encodings of a word match the same keyword.
pub fn decompose_nukta(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{09DC}' => out.push_str("\u{09A1}\u{09BC}"),
            '\u{09DD}' => out.push_str("\u{09A2}\u{09BC}"),
            '\u{09DF}' => out.push_str("\u{09AF}\u{09BC}"),
            _ => out.push(c),
        }
    }
    out
}

/// Classify free text by its earliest property keyword.
pub fn classify_property_type(text: &str) -> Option<PropertyType> {
    let lowered = decompose_nukta(&text.to_lowercase());
    let keyword = PROPERTY_KEYWORD_RE.find(&lowered)?.as_str();

    let kind = match keyword {
        k if k.starts_with("apartment") || k.starts_with("flat") || k.starts_with("condo") => {
            PropertyType::Flat
        }
        "ফ্ল্যাট" | "অ্যাপার্টমেন্ট" | "এপার্টমেন্ট" => PropertyType::Flat,
        k if k.starts_with("house")
            || k.starts_with("home")
            || k.starts_with("villa")
            || k.starts_with("building")
            || k == "duplex" =>
        {
            PropertyType::House
        }
        k if k.starts_with("বা\u{09A1}\u{09BC}") => PropertyType::House,
        "ভবন" => PropertyType::House,
        k if k.starts_with("office") || k == "commercial" => PropertyType::Office,
        "অফিস" => PropertyType::Office,
        k if k == "land" || k.starts_with("plot") => PropertyType::Land,
        "জমি" | "প্লট" => PropertyType::Land,
        _ => PropertyType::Other,
    };
    Some(kind)
}

/// Absolute URL for a scraped link, resolving relative links against the
/// site.
pub fn resolve_url(site: Site, link: &str) -> Option<String> {
    let link = link.trim();
    if is_placeholder(link) {
        return None;
    }

    if let Ok(url) = Url::parse(link) {
        return matches!(url.scheme(), "http" | "https").then(|| link.to_string());
    }

    let lowered = link.to_lowercase();
    if lowered.starts_with("www.") || lowered.starts_with(site.domain()) {
        return Url::parse(&format!("https://{}", link))
            .ok()
            .map(|url| url.to_string());
    }

    Url::parse(site.base_url())
        .and_then(|base| base.join(link))
        .ok()
        .map(|url| url.to_string())
}

/// Identity used to spot the same listing twice.
///
/// Ignores the fragment, a trailing slash and host case.
pub fn url_identity(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let path = parsed.path().trim_end_matches('/').to_string();
            parsed.set_path(&path);
            parsed.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => trimmed
            .split('#')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    }
}

/// Build a listing record from one raw record.
///
/// Returns `None` when the record has no usable URL. Missing property-type
/// text inherits the query's type; unrecognized text becomes `Other`.
pub fn parse_listing(
    site: Site,
    query: &SearchQuery,
    raw: &RawListing,
    fetched_at: DateTime<Utc>,
) -> Option<ListingRecord> {
    let url = resolve_url(site, clean(raw.listing_url.as_ref())?)?;

    let address = clean(raw.address.as_ref());
    let description = clean(raw.description.as_ref()).unwrap_or_default();
    let price_text = clean(raw.price.as_ref()).map(str::to_string);

    let location_text = match address {
        Some(address) => address.to_string(),
        None => match query.neighbourhood() {
            Some(area) => format!("{}, {}", area, query.location()),
            None => query.location().to_string(),
        },
    };

    let title = clean(raw.title.as_ref())
        .or(address)
        .map(str::to_string)
        .unwrap_or_else(|| query.describe());

    let property_type = match clean(raw.property_type.as_ref()) {
        Some(text) => classify_property_type(text).unwrap_or(PropertyType::Other),
        None => query.property_type(),
    };

    let negotiable = raw.negotiable.or_else(|| {
        price_text.as_deref().and_then(|text| {
            let lowered = text.to_lowercase();
            (lowered.contains("negotiable") || text.contains("আলোচনা সাপেক্ষে")).then_some(true)
        })
    });

    let language = detect_language(&format!("{} {} {}", title, location_text, description));

    Some(ListingRecord {
        site,
        price: price_text.as_deref().and_then(parse_price),
        price_text,
        title,
        location: Location::resolve(location_text, query.location()),
        property_type,
        mode: query.mode(),
        area: clean(raw.area.as_ref()).and_then(parse_area),
        url,
        description: description.to_string(),
        language,
        bedrooms: clean(raw.bedrooms.as_ref()).and_then(parse_count),
        bathrooms: clean(raw.bathrooms.as_ref()).and_then(parse_count),
        negotiable,
        features: raw
            .features
            .iter()
            .flatten()
            .map(|f| f.trim())
            .filter(|f| !is_placeholder(f))
            .map(str::to_string)
            .collect(),
        contact: clean(raw.contact_info.as_ref()).map(str::to_string),
        fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::TransactionMode;

    fn query() -> SearchQuery {
        SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
            .build()
            .unwrap()
    }

    #[test]
    fn test_bengali_digits() {
        assert_eq!(to_ascii_digits("৫০ লক্ষ"), "50 লক্ষ");
        assert_eq!(to_ascii_digits("১২০০ sft"), "1200 sft");
    }

    #[test]
    fn test_parse_price_multipliers() {
        let lakh = parse_price("৫০ লক্ষ টাকা").unwrap();
        assert_eq!(lakh.amount(), 5_000_000.0);
        assert_eq!(lakh.currency(), Currency::Bdt);
        assert_eq!(lakh.unit(), PriceUnit::Total);

        assert_eq!(parse_price("Tk 1.2 Crore").unwrap().amount(), 12_000_000.0);
        assert_eq!(parse_price("৳ 1,20,00,000").unwrap().amount(), 12_000_000.0);
        assert_eq!(parse_price("25k/month").unwrap().amount(), 25_000.0);
        assert_eq!(parse_price("২ কোটি").unwrap().amount(), 20_000_000.0);
    }

    #[test]
    fn test_parse_price_per_area_and_currency() {
        let per_sqft = parse_price("Tk 8,500 per sqft").unwrap();
        assert_eq!(per_sqft.amount(), 8_500.0);
        assert_eq!(per_sqft.unit(), PriceUnit::PerArea(AreaUnit::Sqft));

        let per_katha = parse_price("35 lakh/katha").unwrap();
        assert_eq!(per_katha.unit(), PriceUnit::PerArea(AreaUnit::Katha));

        assert_eq!(parse_price("$120,000").unwrap().currency(), Currency::Usd);
        assert_eq!(parse_price("25,000 / month").unwrap().unit(), PriceUnit::Total);
    }

    #[test]
    fn test_parse_price_missing() {
        assert!(parse_price("উল্লেখ নেই").is_none());
        assert!(parse_price("Price on request").is_none());
        assert!(parse_price("").is_none());
    }

    #[test]
    fn test_parse_area_units() {
        let flat = parse_area("1,200 sft").unwrap();
        assert_eq!(flat.unit(), AreaUnit::Sqft);
        assert_eq!(flat.sqft(), 1_200.0);

        let land = parse_area("৫ কাঠা").unwrap();
        assert_eq!(land.unit(), AreaUnit::Katha);
        assert_eq!(land.sqft(), 3_600.0);

        assert_eq!(parse_area("10 decimal").unwrap().unit(), AreaUnit::Decimal);
        assert_eq!(parse_area("1450").unwrap().unit(), AreaUnit::Sqft);
        assert!(parse_area("N/A").is_none());
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("3 bed flat in Banani"), Language::English);
        assert_eq!(detect_language("বনানীতে ফ্ল্যাট বিক্রি"), Language::Bengali);
        assert_eq!(detect_language("Banani তে সুন্দর ফ্ল্যাট for sale"), Language::Mixed);
        assert_eq!(detect_language("1200"), Language::English);
    }

    #[test]
    fn test_classify_earliest_keyword_wins() {
        assert_eq!(classify_property_type("Apartment"), Some(PropertyType::Flat));
        assert_eq!(classify_property_type("জমি"), Some(PropertyType::Land));
        assert_eq!(
            classify_property_type("Office space in a residential building"),
            Some(PropertyType::Office)
        );
        assert_eq!(classify_property_type("Duplex house"), Some(PropertyType::House));
        assert_eq!(classify_property_type("Shop"), Some(PropertyType::Other));
        assert_eq!(classify_property_type("Island view"), None);
    }

    #[test]
    fn test_classify_house_in_either_encoding() {
        let precomposed = "\u{09AC}\u{09BE}\u{09DC}\u{09BF} বিক্রয়";
        let decomposed = "\u{09AC}\u{09BE}\u{09A1}\u{09BC}\u{09BF} বিক্রয়";
        assert_eq!(classify_property_type(precomposed), Some(PropertyType::House));
        assert_eq!(classify_property_type(decomposed), Some(PropertyType::House));
        assert_eq!(
            classify_property_type("\u{09AC}\u{09BE}\u{09DC}\u{09C0}"),
            Some(PropertyType::House)
        );
        assert_eq!(decompose_nukta(precomposed), decomposed);
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url(Site::Bikroy, "/en/ad/flat-for-sale-123").as_deref(),
            Some("https://www.bikroy.com/en/ad/flat-for-sale-123")
        );
        assert_eq!(
            resolve_url(Site::Bproperty, "https://www.bproperty.com/en/property/details-1.html")
                .as_deref(),
            Some("https://www.bproperty.com/en/property/details-1.html")
        );
        assert!(resolve_url(Site::Bikroy, "উল্লেখ নেই").is_none());
        assert!(resolve_url(Site::Bikroy, "mailto:agent@example.com").is_none());
    }

    #[test]
    fn test_url_identity_ignores_cosmetic_differences() {
        let a = url_identity("https://WWW.Bikroy.com/en/ad/123/");
        let b = url_identity("https://www.bikroy.com/en/ad/123#gallery");
        assert_eq!(a, b);
        assert_ne!(a, url_identity("https://www.bikroy.com/en/ad/124"));
    }

    #[test]
    fn test_parse_listing_fills_fields() {
        let raw = RawListing::new("/en/ad/banani-flat-1")
            .with_title("Banani 3 bed flat")
            .with_address("Road 11, Banani, Dhaka")
            .with_price("১ কোটি ২০ লক্ষ টাকা")
            .with_area("1,600 sft")
            .with_property_type("Apartment");
        let record = parse_listing(Site::Bikroy, &query(), &raw, Utc::now()).unwrap();

        assert_eq!(record.url, "https://www.bikroy.com/en/ad/banani-flat-1");
        assert_eq!(record.price_text.as_deref(), Some("১ কোটি ২০ লক্ষ টাকা"));
        assert_eq!(record.total_price_bdt(), Some(12_000_000.0));
        assert_eq!(record.property_type, PropertyType::Flat);
        assert_eq!(record.location.district.as_deref(), Some("dhaka"));
        assert_eq!(record.area_sqft(), Some(1_600.0));
        assert_eq!(record.mode, TransactionMode::Buy);
    }

    #[test]
    fn test_parse_listing_defaults() {
        let raw = RawListing::new("https://www.bproperty.com/en/property/7");
        let record = parse_listing(Site::Bproperty, &query(), &raw, Utc::now()).unwrap();
        assert_eq!(record.property_type, PropertyType::Flat);
        assert_eq!(record.title, "buy flat in Dhaka");
        assert!(record.price.is_none());

        let unknown = RawListing::new("https://www.bproperty.com/en/property/8")
            .with_property_type("Resort");
        let record = parse_listing(Site::Bproperty, &query(), &unknown, Utc::now()).unwrap();
        assert_eq!(record.property_type, PropertyType::Other);

        assert!(parse_listing(Site::Bikroy, &query(), &RawListing::default(), Utc::now()).is_none());
    }
}
