use super::{block_label, compare_block_keys, AggregationResult};
use crate::models::{MarketplaceRecord, Region};
use std::collections::HashMap;

/// Record count per registry, in `Region::ALL` order, with the region palette.
/// Records with an unrecognized region are left out of the counts.
pub fn by_region(records: &[MarketplaceRecord]) -> AggregationResult {
    let mut counts = [0usize; Region::ALL.len()];
    for region in records.iter().filter_map(MarketplaceRecord::region) {
        counts[region.index()] += 1;
    }

    AggregationResult::new(
        Region::ALL.iter().map(|r| r.label().to_string()).collect(),
        counts.iter().map(|&c| c as f64).collect(),
    )
    .with_colors(Region::ALL.iter().map(|r| r.color().to_string()).collect())
}

/// Record count per block size, largest prefix first, `/Unknown` last.
pub fn by_block_size(records: &[MarketplaceRecord]) -> AggregationResult {
    let mut counts: HashMap<Option<u32>, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.block()).or_insert(0) += 1;
    }

    let mut keys: Vec<Option<u32>> = counts.keys().copied().collect();
    keys.sort_by(compare_block_keys);

    AggregationResult::new(
        keys.iter().map(|&k| block_label(k)).collect(),
        keys.iter().map(|k| counts[k] as f64).collect(),
    )
}
