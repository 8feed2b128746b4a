use super::{block_label, compare_block_keys, mean, AggregationResult};
use crate::models::{MarketplaceRecord, Region};
use crate::normalize::parse_price;
use std::collections::HashMap;

/// Number of equal-width buckets in the price histogram.
pub const PRICE_BUCKETS: usize = 10;

/// Histogram of positive prices over `[min, max]` in ten equal buckets.
///
/// A zero-width range uses a bucket width of 1. The maximum price would
/// index an eleventh bucket, so indices are clamped to the last one.
pub fn price_distribution(records: &[MarketplaceRecord]) -> AggregationResult {
    let prices: Vec<f64> = records.iter().map(parse_price).filter(|p| *p > 0.0).collect();
    if prices.is_empty() {
        return AggregationResult::default();
    }

    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let bucket_size = if range > 0.0 {
        range / PRICE_BUCKETS as f64
    } else {
        1.0
    };

    let mut buckets = [0usize; PRICE_BUCKETS];
    for price in &prices {
        let index = ((price - min) / bucket_size).floor() as usize;
        buckets[index.min(PRICE_BUCKETS - 1)] += 1;
    }

    let labels = (0..PRICE_BUCKETS)
        .map(|i| {
            let lower = min + i as f64 * bucket_size;
            let upper = min + (i + 1) as f64 * bucket_size;
            format!("${:.0}-{:.0}", lower.round(), upper.round())
        })
        .collect();

    AggregationResult::new(labels, buckets.iter().map(|&c| c as f64).collect())
}

/// Mean positive price per block size, ordered like `by_block_size`.
pub fn avg_price_by_block_size(records: &[MarketplaceRecord]) -> AggregationResult {
    let mut groups: HashMap<Option<u32>, Vec<f64>> = HashMap::new();
    for record in records {
        let price = parse_price(record);
        if price > 0.0 {
            groups.entry(record.block()).or_default().push(price);
        }
    }

    let mut keys: Vec<Option<u32>> = groups.keys().copied().collect();
    keys.sort_by(compare_block_keys);

    AggregationResult::new(
        keys.iter().map(|&k| block_label(k)).collect(),
        keys.iter().map(|k| mean(&groups[k])).collect(),
    )
}

/// Mean positive price per registry in `Region::ALL` order; 0 where a region
/// has no priced records.
pub fn avg_price_by_region(records: &[MarketplaceRecord]) -> AggregationResult {
    let mut groups: [Vec<f64>; Region::ALL.len()] = Default::default();
    for record in records {
        let Some(region) = record.region() else {
            continue;
        };
        let price = parse_price(record);
        if price > 0.0 {
            groups[region.index()].push(price);
        }
    }

    AggregationResult::new(
        Region::ALL.iter().map(|r| r.label().to_string()).collect(),
        groups.iter().map(|prices| mean(prices)).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn priced(prices: &[f64]) -> Vec<MarketplaceRecord> {
        prices
            .iter()
            .map(|p| MarketplaceRecord::new(json!({"block": 24, "pricePerAddress": format!("${}", p)})))
            .collect()
    }

    #[test]
    fn distribution_of_empty_or_unpriced_input_is_empty() {
        assert_eq!(price_distribution(&[]), AggregationResult::default());
        let unpriced = vec![MarketplaceRecord::new(json!({"block": 24, "region": "arin"}))];
        assert!(price_distribution(&unpriced).is_empty());
    }

    #[test]
    fn distribution_clamps_max_into_last_bucket() {
        let records = priced(&[20.0, 25.0, 29.0, 30.0]);
        let result = price_distribution(&records);
        assert_eq!(result.labels.len(), 10);
        assert_eq!(result.data.iter().sum::<f64>(), 4.0);
        assert_eq!(result.data[0], 1.0);
        assert_eq!(result.data[5], 1.0);
        // 29 sits at (29-20)/1 = 9 and 30 would be index 10
        assert_eq!(result.data[9], 2.0);
        assert_eq!(result.labels[0], "$20-21");
        assert_eq!(result.labels[9], "$29-30");
    }

    #[test]
    fn distribution_with_single_price_uses_unit_buckets() {
        let records = priced(&[32.5, 32.5]);
        let result = price_distribution(&records);
        assert_eq!(result.data[0], 2.0);
        assert_eq!(result.labels[0], "$33-34");
        assert_eq!(result.labels[9], "$42-43");
    }

    #[test]
    fn distribution_ignores_non_positive_prices() {
        let mut records = priced(&[10.0, 20.0]);
        records.push(MarketplaceRecord::new(json!({"price": "-5"})));
        records.push(MarketplaceRecord::new(json!({"price": "n/a"})));
        let result = price_distribution(&records);
        assert_eq!(result.data.iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn avg_by_block_sorted_descending() {
        let records: Vec<MarketplaceRecord> = vec![
            json!({"block": 24, "region": "arin", "pricePerAddress": "$32.50"}),
            json!({"block": 24, "region": "ripe", "pricePerAddress": "$30"}),
            json!({"block": 22, "region": "arin", "price": "$40"}),
            json!({"block": 20, "region": "arin"}),
            json!({"region": "arin", "price": "$50"}),
        ]
        .into_iter()
        .map(MarketplaceRecord::new)
        .collect();

        let result = avg_price_by_block_size(&records);
        assert_eq!(result.labels, vec!["/24", "/22", "/Unknown"]);
        assert_eq!(result.data, vec![31.25, 40.0, 50.0]);
    }

    #[test]
    fn avg_by_block_of_empty_input_is_empty() {
        assert_eq!(avg_price_by_block_size(&[]), AggregationResult::default());
    }

    #[test]
    fn avg_by_region_zero_for_missing_regions() {
        let records: Vec<MarketplaceRecord> = vec![
            json!({"region": "ripe", "askingPrice": "$30"}),
            json!({"region": "RIPE", "askingPrice": "$34"}),
            json!({"region": "lacnic", "askingPrice": "$33.5"}),
            json!({"region": "lacnic"}),
            json!({"region": "mars", "askingPrice": "$99"}),
        ]
        .into_iter()
        .map(MarketplaceRecord::new)
        .collect();

        let result = avg_price_by_region(&records);
        assert_eq!(result.labels, vec!["ARIN", "RIPE", "APNIC", "LACNIC", "AFRINIC"]);
        assert_eq!(result.data, vec![0.0, 32.0, 0.0, 33.5, 0.0]);
    }
}
