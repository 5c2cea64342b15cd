//! Deterministic price statistics.

use crate::types::listing::ListingRecord;
use crate::types::report::{GroupStats, PriceStats, PriceSummary, MIN_GROUP_SIZE};

/// Median of a sample. Even samples average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Min, median and max of the finite values, if there are any.
pub fn price_stats(values: &[f64]) -> Option<PriceStats> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let median = median(&finite)?;
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(PriceStats {
        min,
        median,
        max,
        sample_size: finite.len(),
    })
}

/// Stats for a sample, withheld below [`MIN_GROUP_SIZE`] values.
pub fn group_stats(values: &[f64]) -> GroupStats {
    match price_stats(values) {
        Some(stats) if stats.sample_size >= MIN_GROUP_SIZE => GroupStats::Computed(stats),
        Some(stats) => GroupStats::InsufficientData {
            sample_size: stats.sample_size,
        },
        None => GroupStats::InsufficientData { sample_size: 0 },
    }
}

/// Total and per-sqft statistics over a set of listings.
pub fn summarize<'a>(listings: impl IntoIterator<Item = &'a ListingRecord>) -> PriceSummary {
    let mut totals = Vec::new();
    let mut per_sqft = Vec::new();
    for listing in listings {
        totals.extend(listing.total_price_bdt());
        per_sqft.extend(listing.price_per_sqft_bdt());
    }

    PriceSummary {
        total_price: group_stats(&totals),
        per_sqft: group_stats(&per_sqft),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[f64::NAN]), None);
    }

    #[test]
    fn test_group_threshold() {
        assert_eq!(
            group_stats(&[1.0, 2.0]),
            GroupStats::InsufficientData { sample_size: 2 }
        );

        let computed = group_stats(&[5.0, 1.0, 3.0]);
        let stats = computed.computed().unwrap();
        assert_eq!((stats.min, stats.median, stats.max), (1.0, 3.0, 5.0));
        assert_eq!(stats.sample_size, 3);
    }

    proptest! {
        #[test]
        fn median_lies_between_min_and_max(values in prop::collection::vec(0.0f64..1e9, 1..50)) {
            let stats = price_stats(&values).unwrap();
            prop_assert!(stats.min <= stats.median);
            prop_assert!(stats.median <= stats.max);
            prop_assert_eq!(stats.sample_size, values.len());
        }
    }
}
