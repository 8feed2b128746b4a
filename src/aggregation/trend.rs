use super::{mean, AggregationResult, MultiSeries, Series};
use crate::models::MarketplaceRecord;
use crate::normalize::parse_price;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// A named range of prefix lengths, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockBand {
    pub name: &'static str,
    pub min: u32,
    pub max: u32,
    pub color: &'static str,
}

impl BlockBand {
    pub fn contains(&self, block: u32) -> bool {
        (self.min..=self.max).contains(&block)
    }
}

/// Disjoint bands, scanned in this order.
pub const BLOCK_BANDS: [BlockBand; 4] = [
    BlockBand { name: "/25–/22", min: 22, max: 25, color: "#005398" },
    BlockBand { name: "/21–/20", min: 20, max: 21, color: "#36A2EB" },
    BlockBand { name: "/19–/17", min: 17, max: 19, color: "#FFCE56" },
    BlockBand { name: "/16 and larger", min: 1, max: 16, color: "#FF6384" },
];

/// Index of the first band containing `block`.
pub fn classify_block(block: u32) -> Option<usize> {
    BLOCK_BANDS.iter().position(|band| band.contains(block))
}

/// Calendar-day part of an ISO timestamp.
fn day_of(date: &str) -> &str {
    date.split('T').next().unwrap_or(date)
}

/// `2024-03-05` becomes `3/5`. Unparsable days keep their text.
pub fn format_day_label(day: &str) -> String {
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => format!("{}/{}", date.month(), date.day()),
        Err(_) => day.to_string(),
    }
}

/// Mean positive price per day, oldest first. Days whose records are all
/// unpriced still appear, with a value of 0.
pub fn price_trend(records: &[MarketplaceRecord]) -> AggregationResult {
    let mut days: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        let Some(date) = record.date() else {
            continue;
        };
        let prices = days.entry(day_of(date)).or_default();
        let price = parse_price(record);
        if price > 0.0 {
            prices.push(price);
        }
    }

    AggregationResult::new(
        days.keys().map(|day| format_day_label(day)).collect(),
        days.values().map(|prices| mean(prices)).collect(),
    )
}

/// Daily mean price per block band on a shared date axis.
///
/// Each record lands in at most one band. Records without a known block,
/// a positive price, or a date are dropped. Dates on which a band has no
/// records are `None` in that band's series.
pub fn price_trend_by_block_category(records: &[MarketplaceRecord]) -> MultiSeries {
    let mut per_band: Vec<BTreeMap<&str, Vec<f64>>> = vec![BTreeMap::new(); BLOCK_BANDS.len()];
    let mut all_days: BTreeSet<&str> = BTreeSet::new();

    for record in records {
        let Some(band) = record.block().and_then(classify_block) else {
            continue;
        };
        let price = parse_price(record);
        if price <= 0.0 {
            continue;
        }
        let Some(date) = record.date() else {
            continue;
        };
        let day = day_of(date);
        all_days.insert(day);
        per_band[band].entry(day).or_default().push(price);
    }

    let series = BLOCK_BANDS
        .iter()
        .zip(&per_band)
        .map(|(band, by_day)| Series {
            name: band.name.to_string(),
            data: all_days
                .iter()
                .map(|day| by_day.get(day).map(|prices| mean(prices)))
                .collect(),
            color: band.color.to_string(),
        })
        .collect();

    MultiSeries {
        labels: all_days.iter().map(|day| format_day_label(day)).collect(),
        series,
    }
}
