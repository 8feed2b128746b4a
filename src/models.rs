//! Marketplace data model.
//!
//! Records from the upstream API are kept as opaque JSON: the API mixes field
//! names between endpoints and revisions, so typed access goes through the
//! accessor methods here and the strategy lists in `normalize`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Smallest and largest tradable prefix lengths offered by the marketplace.
pub const MIN_BLOCK: u8 = 8;
pub const MAX_BLOCK: u8 = 24;

/// One sale or listing as returned by the API.
///
/// Wraps the raw JSON value so unknown fields survive a round trip to the
/// overlay feed. Items that are not JSON objects are tolerated; every accessor
/// simply returns `None` for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketplaceRecord(Value);

impl MarketplaceRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// Field lookup that treats JSON `null` the same as absence.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// CIDR prefix length. Zero, empty, and non-integer values count as unknown.
    pub fn block(&self) -> Option<u32> {
        let block = match self.field("block")? {
            Value::Number(n) => match n.as_u64() {
                Some(v) => u32::try_from(v).ok(),
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f > 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u32),
            },
            Value::String(s) => s.trim().parse::<u32>().ok(),
            _ => None,
        }?;
        (block > 0).then_some(block)
    }

    /// Raw region text as sent by the API.
    pub fn region_text(&self) -> Option<&str> {
        self.field("region").and_then(Value::as_str)
    }

    pub fn region(&self) -> Option<Region> {
        self.region_text().and_then(Region::parse)
    }

    /// Sale date, if present and non-empty.
    pub fn date(&self) -> Option<&str> {
        self.field("date")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
    }
}

impl From<Value> for MarketplaceRecord {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Regional Internet Registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[serde(alias = "ARIN")]
    Arin,
    #[serde(alias = "RIPE")]
    Ripe,
    #[serde(alias = "APNIC")]
    Apnic,
    #[serde(alias = "LACNIC")]
    Lacnic,
    #[serde(alias = "AFRINIC")]
    Afrinic,
}

impl Region {
    /// Display order used by every per-region chart.
    pub const ALL: [Region; 5] = [
        Region::Arin,
        Region::Ripe,
        Region::Apnic,
        Region::Lacnic,
        Region::Afrinic,
    ];

    /// Order the API expects when no region filter is selected.
    pub const QUERY_ORDER: [Region; 5] = [
        Region::Arin,
        Region::Apnic,
        Region::Ripe,
        Region::Afrinic,
        Region::Lacnic,
    ];

    /// Case-insensitive match against the five registries.
    pub fn parse(text: &str) -> Option<Self> {
        Region::ALL
            .into_iter()
            .find(|r| r.api_name().eq_ignore_ascii_case(text.trim()))
    }

    pub fn api_name(self) -> &'static str {
        match self {
            Region::Arin => "arin",
            Region::Ripe => "ripe",
            Region::Apnic => "apnic",
            Region::Lacnic => "lacnic",
            Region::Afrinic => "afrinic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::Arin => "ARIN",
            Region::Ripe => "RIPE",
            Region::Apnic => "APNIC",
            Region::Lacnic => "LACNIC",
            Region::Afrinic => "AFRINIC",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Region::Arin => "#FF6384",
            Region::Ripe => "#36A2EB",
            Region::Apnic => "#FFCE56",
            Region::Lacnic => "#4BC0C0",
            Region::Afrinic => "#9966FF",
        }
    }

    /// Position in `Region::ALL`.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which dataset the banner is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    PriorSales,
    NewListings,
}

impl ViewMode {
    pub fn endpoint_path(self) -> &'static str {
        match self {
            ViewMode::PriorSales => "priorSales",
            ViewMode::NewListings => "currentListing",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewMode::PriorSales => "Prior Sales:",
            ViewMode::NewListings => "New Listings:",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ViewMode::PriorSales => "Prior Sales",
            ViewMode::NewListings => "New Listings",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::PriorSales => ViewMode::NewListings,
            ViewMode::NewListings => ViewMode::PriorSales,
        }
    }
}

/// User-selected query filters. Empty lists mean "all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSelection {
    pub block_sizes: Vec<u8>,
    pub regions: Vec<Region>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterSelection {
    /// Block sizes to request, largest prefix first. Out-of-range selections
    /// are ignored; if nothing valid remains every size is requested.
    pub fn effective_blocks(&self) -> Vec<u8> {
        let selected: Vec<u8> = self
            .block_sizes
            .iter()
            .copied()
            .filter(|b| (MIN_BLOCK..=MAX_BLOCK).contains(b))
            .collect();
        if selected.is_empty() {
            (MIN_BLOCK..=MAX_BLOCK).rev().collect()
        } else {
            selected
        }
    }

    pub fn effective_regions(&self) -> Vec<Region> {
        if self.regions.is_empty() {
            Region::QUERY_ORDER.to_vec()
        } else {
            self.regions.clone()
        }
    }
}

// --- API wire types ---

/// Request body for both marketplace endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingQuery {
    pub filter: QueryFilter,
    pub sort: SortSpec,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFilter {
    pub block: Vec<u8>,
    pub region: Vec<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

/// Inclusive date window, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortSpec {
    pub property: &'static str,
    pub direction: &'static str,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            property: "date",
            direction: "desc",
        }
    }
}

/// Response body; a missing `items` array is read as an empty page.
#[derive(Debug, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub items: Vec<MarketplaceRecord>,
}
