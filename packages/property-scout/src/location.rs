//! Bangladeshi place-name normalization.
//!
//! Listing sites and users spell the same place several ways ("Chattogram",
//! "Chittagong", "চট্টগ্রাম"). Everything downstream groups on a canonical
//! lowercase district key, and comparables may come from any district in
//! the same division.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::pipeline::parse::decompose_nukta;

/// Administrative divisions of Bangladesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    Dhaka,
    Chattogram,
    Khulna,
    Rajshahi,
    Sylhet,
    Barishal,
    Rangpur,
    Mymensingh,
}

/// Canonical district keys and the division each belongs to.
const DISTRICTS: &[(&str, Division)] = &[
    ("dhaka", Division::Dhaka),
    ("gazipur", Division::Dhaka),
    ("narayanganj", Division::Dhaka),
    ("tangail", Division::Dhaka),
    ("manikganj", Division::Dhaka),
    ("chittagong", Division::Chattogram),
    ("coxsbazar", Division::Chattogram),
    ("cumilla", Division::Chattogram),
    ("feni", Division::Chattogram),
    ("khulna", Division::Khulna),
    ("bagerhat", Division::Khulna),
    ("jessore", Division::Khulna),
    ("kushtia", Division::Khulna),
    ("rajshahi", Division::Rajshahi),
    ("natore", Division::Rajshahi),
    ("pabna", Division::Rajshahi),
    ("bogura", Division::Rajshahi),
    ("sylhet", Division::Sylhet),
    ("moulvibazar", Division::Sylhet),
    ("sunamganj", Division::Sylhet),
    ("barisal", Division::Barishal),
    ("bhola", Division::Barishal),
    ("patuakhali", Division::Barishal),
    ("rangpur", Division::Rangpur),
    ("dinajpur", Division::Rangpur),
    ("thakurgaon", Division::Rangpur),
    ("mymensingh", Division::Mymensingh),
    ("jamalpur", Division::Mymensingh),
    ("netrokona", Division::Mymensingh),
];

/// Alternate spellings (English and Bengali) mapped to canonical keys.
const ALIASES: &[(&str, &str)] = &[
    ("daka", "dhaka"),
    ("ঢাকা", "dhaka"),
    ("chattogram", "chittagong"),
    ("চট্টগ্রাম", "chittagong"),
    ("cox's bazar", "coxsbazar"),
    ("cox’s bazar", "coxsbazar"),
    ("coxs bazar", "coxsbazar"),
    ("comilla", "cumilla"),
    ("কুমিল্লা", "cumilla"),
    ("jashore", "jessore"),
    ("bogra", "bogura"),
    ("খুলনা", "khulna"),
    ("রাজশাহী", "rajshahi"),
    ("সিলেট", "sylhet"),
    ("barishal", "barisal"),
    ("বরিশাল", "barisal"),
    ("রংপুর", "rangpur"),
    ("ময়মনসিংহ", "mymensingh"),
    ("গাজীপুর", "gazipur"),
    ("নারায়ণগঞ্জ", "narayanganj"),
];

/// Lowercase, trim, and map a known alias to its canonical spelling.
///
/// Unknown names come back lowercased and trimmed, so the result is always
/// usable as a URL path segment seed or a grouping key.
pub fn normalize_place(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lowered)
}

/// Every spelling a district can appear as, paired with its canonical key.
fn district_spellings() -> impl Iterator<Item = (&'static str, &'static str)> {
    let canonical = DISTRICTS.iter().map(|(key, _)| (*key, *key));
    let aliases = ALIASES
        .iter()
        .filter_map(|(alias, target)| canonical_key(target).map(|key| (*alias, key)));
    canonical.chain(aliases)
}

/// Whole-word match of any district spelling, longest spellings first.
static DISTRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let mut needles: Vec<String> = district_spellings()
        .map(|(needle, _)| regex::escape(&decompose_nukta(needle)))
        .collect();
    needles.sort_by_key(|n| std::cmp::Reverse(n.len()));
    Regex::new(&format!(r"\b(?:{})\b", needles.join("|")))
        .expect("district regex is valid")
});

/// Find the district a free-text address names.
///
/// Only whole words count, so "Fenix Tower" is not Feni. Addresses run from
/// street to district, so the last mention wins: "Chittagong Road, Dhaka"
/// is in Dhaka.
pub fn district_in(text: &str) -> Option<&'static str> {
    let lowered = decompose_nukta(&text.to_lowercase());
    let found = DISTRICT_RE.find_iter(&lowered).last()?.as_str();
    district_spellings()
        .find(|(needle, _)| decompose_nukta(needle) == found)
        .map(|(_, key)| key)
}

/// Division for a canonical district key.
pub fn division_of(district: &str) -> Option<Division> {
    DISTRICTS
        .iter()
        .find(|(key, _)| *key == district)
        .map(|(_, division)| *division)
}

/// Whether two district keys are the same or share a division.
pub fn same_or_adjacent(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (division_of(a), division_of(b)) {
        (Some(da), Some(db)) => da == db,
        _ => false,
    }
}

fn canonical_key(name: &str) -> Option<&'static str> {
    DISTRICTS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(key, _)| *key)
}

/// Free-text location plus the district it resolved to, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Address or area text exactly as scraped
    pub text: String,

    /// Canonical district key when one could be recognized
    pub district: Option<String>,
}

impl Location {
    /// Build a location from scraped text, resolving the district from the
    /// text first and from `fallback` (usually the query city) second.
    pub fn resolve(text: impl Into<String>, fallback: &str) -> Self {
        let text = text.into();
        let district = district_in(&text)
            .or_else(|| district_in(fallback))
            .map(str::to_string);
        Self { text, district }
    }

    /// Key used when grouping listings by location.
    pub fn group_key(&self) -> String {
        self.district
            .clone()
            .unwrap_or_else(|| normalize_place(&self.text))
    }

    /// Same district, or both districts in one division.
    pub fn is_near(&self, other: &Location) -> bool {
        match (&self.district, &other.district) {
            (Some(a), Some(b)) => same_or_adjacent(a, b),
            _ => self.group_key() == other.group_key(),
        }
    }
}
