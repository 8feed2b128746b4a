//! Chart-ready aggregations over marketplace records.
//!
//! - `counts`: record counts per region and per block size
//! - `prices`: price histogram and per-group average prices
//! - `trend`: daily average price, overall and per block-size band
//!
//! Every function here is pure and total: empty or malformed input yields an
//! empty (or zero-filled) result, never an error.

pub mod counts;
pub mod prices;
pub mod trend;

pub use counts::{by_block_size, by_region};
pub use prices::{avg_price_by_block_size, avg_price_by_region, price_distribution};
pub use trend::{price_trend, price_trend_by_block_category};

use serde::Serialize;
use std::cmp::Ordering;

/// Single-series chart input. `labels[i]` describes `data[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
}

impl AggregationResult {
    pub fn new(labels: Vec<String>, data: Vec<f64>) -> Self {
        debug_assert_eq!(labels.len(), data.len());
        Self {
            labels,
            data,
            colors: None,
        }
    }

    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Several series sharing one label axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultiSeries {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl MultiSeries {
    /// True when no series has a single observation.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.data.iter().all(Option::is_none))
    }
}

/// One line of a multi-series chart. `None` marks "no observation", which
/// renders as a gap rather than a zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<Option<f64>>,
    pub color: String,
}

/// Arithmetic mean, 0 for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Larger prefix numbers first; unknown blocks always last.
pub(crate) fn compare_block_keys(a: &Option<u32>, b: &Option<u32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn block_label(key: Option<u32>) -> String {
    match key {
        Some(block) => format!("/{}", block),
        None => "/Unknown".to_string(),
    }
}
