//! Supported listing sites and per-site search URL construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::location::normalize_place;
use crate::types::listing::{PropertyType, TransactionMode};
use crate::types::query::SearchQuery;

/// A Bangladeshi property listing site the collector knows how to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Bikroy,
    Bproperty,
    AmarBari,
    BdProperty,
    ChaldalProperty,
    ShareBazar,
}

impl Site {
    /// Every supported site, in default search order.
    pub const ALL: [Site; 6] = [
        Site::Bikroy,
        Site::Bproperty,
        Site::AmarBari,
        Site::BdProperty,
        Site::ChaldalProperty,
        Site::ShareBazar,
    ];

    /// Human-facing name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Site::Bikroy => "Bikroy.com",
            Site::Bproperty => "Bproperty.com",
            Site::AmarBari => "AmarBari.com",
            Site::BdProperty => "Bdproperty.com",
            Site::ChaldalProperty => "Chaldal Property",
            Site::ShareBazar => "ShareBazar",
        }
    }

    /// Stable identifier used in configuration and serialized output.
    pub fn id(&self) -> &'static str {
        match self {
            Site::Bikroy => "bikroy",
            Site::Bproperty => "bproperty",
            Site::AmarBari => "amar_bari",
            Site::BdProperty => "bd_property",
            Site::ChaldalProperty => "chaldal_property",
            Site::ShareBazar => "share_bazar",
        }
    }

    /// Domain that extraction requests are constrained to.
    pub fn domain(&self) -> &'static str {
        match self {
            Site::Bikroy => "bikroy.com",
            Site::Bproperty => "bproperty.com",
            Site::AmarBari => "amarbari.com",
            Site::BdProperty => "bdproperty.com",
            Site::ChaldalProperty => "property.chaldal.com",
            Site::ShareBazar => "sharebazar.com.bd",
        }
    }

    /// Scheme and host, used to resolve relative listing links.
    pub fn base_url(&self) -> &'static str {
        match self {
            Site::Bikroy => "https://www.bikroy.com",
            Site::Bproperty => "https://www.bproperty.com",
            Site::AmarBari => "https://www.amarbari.com",
            Site::BdProperty => "https://www.bdproperty.com",
            Site::ChaldalProperty => "https://property.chaldal.com",
            Site::ShareBazar => "https://www.sharebazar.com.bd",
        }
    }

    /// Search results page for a query on this site.
    ///
    /// Only location, transaction mode and property type go into the URL;
    /// price and area bounds travel in the extraction instruction instead.
    pub fn search_url(&self, query: &SearchQuery) -> String {
        let location = location_path(query);
        let base = self.base_url();
        match self {
            Site::Bikroy => format!(
                "{}/bn/ads/{}/{}",
                base,
                location,
                bikroy_category(query.mode(), query.property_type())
            ),
            Site::Bproperty => {
                let purpose = match query.mode() {
                    TransactionMode::Buy => "properties-for-sale",
                    TransactionMode::Rent => "properties-for-rent",
                };
                format!("{}/en/{}/{}/", base, location, purpose)
            }
            Site::AmarBari => format!("{}/{}/", base, location),
            Site::BdProperty => format!("{}/{}/properties/", base, location),
            Site::ChaldalProperty => format!("{}/{}", base, location),
            Site::ShareBazar => format!("{}/{}/properties", base, location),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error for an unrecognized site name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown site: {0}")]
pub struct UnknownSite(pub String);

impl FromStr for Site {
    type Err = UnknownSite;

    /// Accepts the id, the display name, or the domain, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Site::ALL
            .into_iter()
            .find(|site| {
                site.id() == wanted
                    || site.display_name().to_lowercase() == wanted
                    || site.domain() == wanted
                    || site.id().replace('_', "") == wanted
            })
            .ok_or_else(|| UnknownSite(s.to_string()))
    }
}

/// `city` or `city/area`, with spaces turned into dashes.
fn location_path(query: &SearchQuery) -> String {
    let city = slug(&normalize_place(query.location()));
    match query.neighbourhood() {
        Some(area) if !area.trim().is_empty() => {
            format!("{}/{}", city, slug(&normalize_place(area)))
        }
        _ => city,
    }
}

fn slug(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("-")
}

fn bikroy_category(mode: TransactionMode, property_type: PropertyType) -> &'static str {
    match (mode, property_type) {
        (TransactionMode::Buy, PropertyType::Flat) => "apartments-for-sale",
        (TransactionMode::Buy, PropertyType::House) => "houses-for-sale",
        (TransactionMode::Buy, PropertyType::Land) => "land-for-sale",
        (TransactionMode::Buy, PropertyType::Office) => "commercial-properties-for-sale",
        (TransactionMode::Rent, PropertyType::Flat) => "apartment-rentals",
        (TransactionMode::Rent, PropertyType::House) => "house-rentals",
        (TransactionMode::Rent, PropertyType::Land) => "land-rentals",
        (TransactionMode::Rent, PropertyType::Office) => "commercial-property-rentals",
        (_, PropertyType::Other) => "property",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(mode: TransactionMode, area: Option<&str>) -> SearchQuery {
        let mut builder = SearchQuery::builder(mode, PropertyType::Flat, "Dhaka");
        if let Some(area) = area {
            builder = builder.neighbourhood(area);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_parse_site_names() {
        assert_eq!("bikroy".parse::<Site>().unwrap(), Site::Bikroy);
        assert_eq!("Bproperty.com".parse::<Site>().unwrap(), Site::Bproperty);
        assert_eq!("property.chaldal.com".parse::<Site>().unwrap(), Site::ChaldalProperty);
        assert_eq!("bdproperty".parse::<Site>().unwrap(), Site::BdProperty);
        assert!("zillow".parse::<Site>().is_err());
    }

    #[test]
    fn test_search_url_reflects_mode() {
        let buy = Site::Bproperty.search_url(&query(TransactionMode::Buy, None));
        let rent = Site::Bproperty.search_url(&query(TransactionMode::Rent, None));
        assert_eq!(buy, "https://www.bproperty.com/en/dhaka/properties-for-sale/");
        assert_eq!(rent, "https://www.bproperty.com/en/dhaka/properties-for-rent/");
    }

    #[test]
    fn test_search_url_includes_area() {
        let url = Site::Bikroy.search_url(&query(TransactionMode::Buy, Some("Mirpur DOHS")));
        assert_eq!(
            url,
            "https://www.bikroy.com/bn/ads/dhaka/mirpur-dohs/apartments-for-sale"
        );
    }

    #[test]
    fn test_every_url_stays_on_site_domain() {
        let q = query(TransactionMode::Buy, Some("Gulshan"));
        for site in Site::ALL {
            assert!(site.search_url(&q).contains(site.domain()), "{site}");
        }
    }
}
