//! Search collection: one fetch per site, joined in site order.

use chrono::Utc;
use futures::future::join_all;
use indexmap::IndexSet;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result, SourceError, SourceResult};
use crate::pipeline::parse::{parse_listing, url_identity};
use crate::sites::Site;
use crate::traits::source::{ListingSource, RawListing};
use crate::types::listing::ListingRecord;
use crate::types::query::SearchQuery;
use crate::types::report::{SiteFailure, SiteFailureReason};

/// What collection produced: listings plus the sites that contributed none.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectOutcome {
    /// Deduplicated, in site order then source order
    pub listings: Vec<ListingRecord>,
    pub failures: Vec<SiteFailure>,
}

/// Fetch from every site and merge the results.
///
/// A failing site is recorded and skipped. So is a site whose answer holds
/// no record with a URL inside the query bounds. Fails with
/// [`PipelineError::NoListingsFound`] only when nothing is left.
pub async fn collect<S: ListingSource + ?Sized>(
    source: &S,
    query: &SearchQuery,
    sites: &[Site],
    fetch_timeout: Option<Duration>,
) -> Result<CollectOutcome> {
    let sites: IndexSet<Site> = sites.iter().copied().collect();

    info!(
        source = source.name(),
        sites = sites.len(),
        query = %query.describe(),
        "Collecting listings"
    );

    let responses = join_all(
        sites
            .iter()
            .map(|&site| fetch_site(source, site, query, fetch_timeout)),
    )
    .await;

    let mut listings = Vec::new();
    let mut failures = Vec::new();
    let mut seen = HashSet::new();

    for (site, response) in sites.iter().copied().zip(responses) {
        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                warn!(site = %site, error = %e, "Site failed");
                failures.push(SiteFailure::new(site, SiteFailureReason::from(&e)));
                continue;
            }
        };

        let fetched_at = Utc::now();
        let records: Vec<ListingRecord> = raw
            .iter()
            .filter_map(|r| parse_listing(site, query, r, fetched_at))
            .filter(|record| query.admits(record))
            .collect();

        debug!(
            site = %site,
            raw = raw.len(),
            usable = records.len(),
            "Parsed site results"
        );

        if records.is_empty() {
            failures.push(SiteFailure::new(site, SiteFailureReason::NoResults));
            continue;
        }

        for record in records {
            if seen.insert(url_identity(&record.url)) {
                listings.push(record);
            }
        }
    }

    if listings.is_empty() {
        warn!(failed = failures.len(), "No listings from any site");
        return Err(PipelineError::NoListingsFound { failures });
    }

    info!(
        listings = listings.len(),
        failed = failures.len(),
        "Collection complete"
    );

    Ok(CollectOutcome { listings, failures })
}

async fn fetch_site<S: ListingSource + ?Sized>(
    source: &S,
    site: Site,
    query: &SearchQuery,
    fetch_timeout: Option<Duration>,
) -> SourceResult<Vec<RawListing>> {
    let call = source.fetch(site, query);
    match fetch_timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| SourceError::Timeout { site })?,
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockListingSource;
    use crate::types::listing::{PropertyType, TransactionMode};
    use proptest::prelude::*;

    fn query() -> SearchQuery {
        SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
            .build()
            .unwrap()
    }

    fn raw(url: &str) -> RawListing {
        RawListing::new(url)
            .with_address("Mirpur, Dhaka")
            .with_price("60 lakh")
    }

    #[tokio::test]
    async fn test_keeps_site_order_and_first_occurrence() {
        let source = MockListingSource::new()
            .with_listings(
                Site::Bikroy,
                vec![raw("https://www.bikroy.com/ad/1"), raw("https://www.bikroy.com/ad/2")],
            )
            .with_listings(
                Site::Bproperty,
                vec![raw("https://www.bproperty.com/p/1"), raw("https://www.bikroy.com/ad/1/")],
            );

        let outcome = collect(&source, &query(), &[Site::Bikroy, Site::Bproperty], None)
            .await
            .unwrap();

        let urls: Vec<&str> = outcome.listings.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.bikroy.com/ad/1",
                "https://www.bikroy.com/ad/2",
                "https://www.bproperty.com/p/1",
            ]
        );
        assert_eq!(outcome.listings[2].site, Site::Bproperty);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_empty_site_is_a_failure() {
        let source = MockListingSource::new()
            .with_listings(Site::Bikroy, vec![raw("https://www.bikroy.com/ad/1")])
            .with_listings(Site::AmarBari, vec![]);

        let outcome = collect(&source, &query(), &[Site::Bikroy, Site::AmarBari], None)
            .await
            .unwrap();
        assert_eq!(
            outcome.failures,
            vec![SiteFailure::new(Site::AmarBari, SiteFailureReason::NoResults)]
        );
    }

    #[tokio::test]
    async fn test_bounds_filter_out_of_range() {
        let query = SearchQuery::builder(TransactionMode::Buy, PropertyType::Flat, "Dhaka")
            .max_price(8_000_000.0)
            .build()
            .unwrap();
        let source = MockListingSource::new().with_listings(
            Site::Bikroy,
            vec![
                raw("https://www.bikroy.com/ad/1"),
                RawListing::new("https://www.bikroy.com/ad/2").with_price("2 crore"),
                RawListing::new("https://www.bikroy.com/ad/3"),
            ],
        );

        let outcome = collect(&source, &query, &[Site::Bikroy], None).await.unwrap();
        let urls: Vec<&str> = outcome.listings.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://www.bikroy.com/ad/1", "https://www.bikroy.com/ad/3"]);
    }

    #[tokio::test]
    async fn test_repeated_site_fetched_once() {
        let source = MockListingSource::new()
            .with_listings(Site::Bikroy, vec![raw("https://www.bikroy.com/ad/1")]);

        collect(&source, &query(), &[Site::Bikroy, Site::Bikroy], None)
            .await
            .unwrap();
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_no_sites_is_no_listings() {
        let source = MockListingSource::new();
        let err = collect(&source, &query(), &[], None).await.unwrap_err();
        assert!(err.site_failures().is_empty());
    }

    proptest! {
        #[test]
        fn collected_urls_are_unique(ids in prop::collection::vec(0u8..8, 1..30)) {
            let per_site: Vec<RawListing> = ids
                .iter()
                .map(|id| raw(&format!("https://www.bikroy.com/ad/{}", id)))
                .collect();
            let source = MockListingSource::new()
                .with_listings(Site::Bikroy, per_site.clone())
                .with_listings(Site::Bproperty, per_site);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let outcome = runtime
                .block_on(collect(&source, &query(), &[Site::Bikroy, Site::Bproperty], None))
                .unwrap();

            let identities: HashSet<String> =
                outcome.listings.iter().map(|l| url_identity(&l.url)).collect();
            prop_assert_eq!(identities.len(), outcome.listings.len());

            let distinct: HashSet<u8> = ids.iter().copied().collect();
            prop_assert_eq!(outcome.listings.len(), distinct.len());
        }
    }
}
