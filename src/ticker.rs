use crate::models::{MarketplaceRecord, ViewMode};
use crate::normalize::display_price;
use crate::state::{DataOrigin, Dataset};
use serde::Serialize;

/// Price fields tried, in order, when showing a listing on the ticker.
pub const LISTING_DISPLAY_FIELDS: [&str; 11] = [
    "askingPrice",
    "price",
    "pricePerAddress",
    "listPrice",
    "listingPrice",
    "perAddress",
    "asking",
    "list",
    "price.perAddress",
    "pricing.perAddress",
    "pricing.asking",
];

const UNKNOWN_PRICE: &str = "$??";

/// One frame of scrolling text for the overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSnapshot {
    pub view_mode: ViewMode,
    pub title: &'static str,
    pub entries: Vec<String>,
    pub origin: DataOrigin,
}

impl TickerSnapshot {
    pub fn build(view: ViewMode, dataset: &Dataset) -> Self {
        let entries: Vec<String> = dataset
            .records
            .iter()
            .filter_map(|record| format_entry(view, record))
            .collect();

        let entries = if entries.is_empty() {
            vec![format!("No {} Data Available", view.display_name())]
        } else {
            entries
        };

        Self {
            view_mode: view,
            title: view.title(),
            entries,
            origin: dataset.origin,
        }
    }

    /// Entries joined into a single marquee line.
    pub fn line(&self) -> String {
        self.entries.join("    ")
    }
}

/// `/24 ARIN $32.50`. Non-object items are skipped.
pub fn format_entry(view: ViewMode, record: &MarketplaceRecord) -> Option<String> {
    if !record.is_object() {
        return None;
    }

    let block = match (record.block(), record.field("block")) {
        (Some(block), _) => block.to_string(),
        (None, Some(serde_json::Value::String(s))) => s.trim().to_string(),
        (None, Some(serde_json::Value::Number(n))) => n.to_string(),
        (None, _) => String::new(),
    };
    let region = record.region_text().map(str::to_uppercase).unwrap_or_default();

    let price = match view {
        ViewMode::PriorSales => display_price(record, "pricePerAddress").unwrap_or_default(),
        ViewMode::NewListings => LISTING_DISPLAY_FIELDS
            .iter()
            .find_map(|field| display_price(record, field))
            .unwrap_or_else(|| UNKNOWN_PRICE.to_string()),
    };

    Some(format!("/{} {} {}", block, region, price))
}
