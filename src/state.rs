//! Application state: current filters, view, datasets, and the fetch guard.
//!
//! The monitor loop owns one `AppState` and drives it through the methods
//! below; nothing else holds mutable state.

use crate::error::FetchError;
use crate::models::{FilterSelection, MarketplaceRecord, ViewMode};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

/// Where a dataset's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    /// Nothing fetched yet.
    #[default]
    Empty,
    Live,
    /// Built-in sample shown after a failed fetch.
    Fallback,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<MarketplaceRecord>,
    pub origin: DataOrigin,
}

/// Proof that a fetch was started, handed back on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub view: ViewMode,
    generation: u64,
}

#[derive(Debug, PartialEq)]
pub enum FetchOutcome {
    Applied { view: ViewMode, count: usize },
    /// The fetch failed and the fallback sample was installed.
    FellBack { view: ViewMode, error: String },
    /// Filters changed while the fetch was in flight; its result was dropped.
    Stale { view: ViewMode },
}

#[derive(Debug, Default)]
pub struct AppState {
    filters: FilterSelection,
    view_mode: ViewMode,
    sales: Dataset,
    listings: Dataset,
    in_flight: Option<FetchTicket>,
    generation: u64,
}

impl AppState {
    pub fn new(filters: FilterSelection, view_mode: ViewMode) -> Self {
        Self {
            filters,
            view_mode,
            ..Self::default()
        }
    }

    pub fn filters(&self) -> &FilterSelection {
        &self.filters
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn dataset(&self, view: ViewMode) -> &Dataset {
        match view {
            ViewMode::PriorSales => &self.sales,
            ViewMode::NewListings => &self.listings,
        }
    }

    fn dataset_mut(&mut self, view: ViewMode) -> &mut Dataset {
        match view {
            ViewMode::PriorSales => &mut self.sales,
            ViewMode::NewListings => &mut self.listings,
        }
    }

    /// Records to chart. A fallback sample is display filler, not data, so
    /// it charts as empty.
    pub fn chart_records(&self, view: ViewMode) -> &[MarketplaceRecord] {
        let dataset = self.dataset(view);
        match dataset.origin {
            DataOrigin::Live => &dataset.records,
            DataOrigin::Empty | DataOrigin::Fallback => &[],
        }
    }

    /// Replaces the filters. Returns true when they changed, in which case any
    /// in-flight fetch is now stale.
    pub fn set_filters(&mut self, filters: FilterSelection) -> bool {
        if self.filters == filters {
            return false;
        }
        self.filters = filters;
        self.generation += 1;
        true
    }

    pub fn set_view_mode(&mut self, view: ViewMode) -> bool {
        if self.view_mode == view {
            return false;
        }
        self.view_mode = view;
        true
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggled();
        self.view_mode
    }

    /// Starts a fetch for the active view, or returns `None` if one is already
    /// running. Requests made while busy are dropped, not queued.
    pub fn try_begin_fetch(&mut self) -> Option<FetchTicket> {
        self.try_begin_fetch_for(self.view_mode)
    }

    /// Same guard as `try_begin_fetch`, for any view.
    pub fn try_begin_fetch_for(&mut self, view: ViewMode) -> Option<FetchTicket> {
        if let Some(running) = self.in_flight {
            warn!("Fetch already in progress ({:?}), skipping.", running.view);
            return None;
        }
        let ticket = FetchTicket {
            view,
            generation: self.generation,
        };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Applies a finished fetch and releases the guard.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<MarketplaceRecord>, FetchError>,
    ) -> FetchOutcome {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }

        let view = ticket.view;
        if ticket.generation != self.generation {
            warn!("Discarding {:?} results fetched with outdated filters.", view);
            return FetchOutcome::Stale { view };
        }

        match result {
            Ok(records) => {
                let count = records.len();
                *self.dataset_mut(view) = Dataset {
                    records,
                    origin: DataOrigin::Live,
                };
                info!("Loaded {} {} records", count, view.display_name());
                FetchOutcome::Applied { view, count }
            }
            Err(e) => {
                warn!("⚠️ {} fetch failed: {}. Showing fallback data.", view.display_name(), e);
                *self.dataset_mut(view) = Dataset {
                    records: fallback_records(view),
                    origin: DataOrigin::Fallback,
                };
                FetchOutcome::FellBack {
                    view,
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Small built-in sample so the ticker never scrolls an empty line after
/// a network failure.
pub fn fallback_records(view: ViewMode) -> Vec<MarketplaceRecord> {
    let values = match view {
        ViewMode::PriorSales => vec![
            json!({"block": 19, "region": "arin", "pricePerAddress": "$29"}),
            json!({"block": 24, "region": "arin", "pricePerAddress": "$32.5"}),
            json!({"block": 19, "region": "ripe", "pricePerAddress": "$30"}),
            json!({"block": 22, "region": "ripe", "pricePerAddress": "$31.9"}),
            json!({"block": 22, "region": "lacnic", "pricePerAddress": "$34.5"}),
            json!({"block": 22, "region": "arin", "pricePerAddress": "$34"}),
            json!({"block": 24, "region": "arin", "pricePerAddress": "$36"}),
        ],
        ViewMode::NewListings => vec![
            json!({"block": 24, "region": "arin", "askingPrice": "$35"}),
            json!({"block": 22, "region": "ripe", "askingPrice": "$31.5"}),
            json!({"block": 23, "region": "apnic", "askingPrice": "$32"}),
            json!({"block": 21, "region": "arin", "askingPrice": "$30"}),
            json!({"block": 24, "region": "lacnic", "askingPrice": "$33.5"}),
            json!({"block": 23, "region": "arin", "askingPrice": "$31"}),
            json!({"block": 22, "region": "arin", "askingPrice": "$29.5"}),
        ],
    };
    values.into_iter().map(MarketplaceRecord::new).collect()
}
