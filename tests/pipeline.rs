use chrono::NaiveDate;
use ipv4_ticker::aggregation::{avg_price_by_block_size, by_region};
use ipv4_ticker::client::{fetch_all, PageSource};
use ipv4_ticker::dashboard::Dashboard;
use ipv4_ticker::error::FetchError;
use ipv4_ticker::models::{FilterSelection, ListingQuery, MarketplaceRecord, ViewMode};
use ipv4_ticker::normalize::parse_price;
use ipv4_ticker::state::{AppState, DataOrigin, FetchOutcome};
use ipv4_ticker::ticker::TickerSnapshot;
use pretty_assertions::assert_eq;
use serde_json::json;

fn records(values: Vec<serde_json::Value>) -> Vec<MarketplaceRecord> {
    values.into_iter().map(MarketplaceRecord::new).collect()
}

fn sample_sales() -> Vec<MarketplaceRecord> {
    records(vec![
        json!({"block": 24, "region": "arin", "pricePerAddress": "$32.50", "date": "2024-03-01"}),
        json!({"block": 24, "region": "ripe", "pricePerAddress": "$30", "date": "2024-03-02"}),
        json!({"block": 22, "region": "arin", "price": "$40", "date": "2024-03-02"}),
    ])
}

/// Serves a fixed record list in pages, or fails every request.
struct InMemoryApi {
    items: Vec<MarketplaceRecord>,
    broken: bool,
}

impl PageSource for InMemoryApi {
    async fn fetch_page(&self, _view: ViewMode, query: &ListingQuery) -> Result<Vec<MarketplaceRecord>, FetchError> {
        if self.broken {
            return Err(FetchError::Status(503));
        }
        let start = query.offset.min(self.items.len());
        let end = (query.offset + query.limit).min(self.items.len());
        Ok(self.items[start..end].to_vec())
    }
}

#[test]
fn region_counts_and_block_averages() {
    let sales = sample_sales();

    let regions = by_region(&sales);
    assert_eq!(regions.labels, vec!["ARIN", "RIPE", "APNIC", "LACNIC", "AFRINIC"]);
    assert_eq!(regions.data, vec![2.0, 1.0, 0.0, 0.0, 0.0]);

    let blocks = avg_price_by_block_size(&sales);
    assert_eq!(blocks.labels, vec!["/24", "/22"]);
    assert_eq!(blocks.data, vec![31.25, 40.0]);
}

#[test]
fn nested_asking_price() {
    let record = MarketplaceRecord::new(json!({"askingPrice": {"perAddress": "$28.00"}}));
    assert_eq!(parse_price(&record), 28.0);
}

#[tokio::test]
async fn fetched_pages_feed_dashboard_and_ticker() {
    let mut items = Vec::new();
    for _ in 0..100 {
        items.extend(sample_sales());
    }
    let api = InMemoryApi { items, broken: false };
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let mut state = AppState::new(FilterSelection::default(), ViewMode::PriorSales);
    let ticket = state.try_begin_fetch().unwrap();
    let result = fetch_all(&api, ticket.view, state.filters(), 250, today).await;
    assert_eq!(
        state.complete_fetch(ticket, result),
        FetchOutcome::Applied { view: ViewMode::PriorSales, count: 300 }
    );

    let dashboard = Dashboard::build(ViewMode::PriorSales, state.chart_records(ViewMode::PriorSales));
    assert!(!dashboard.is_empty());
    assert_eq!(dashboard.summary.total, 300);
    assert_eq!(dashboard.charts.len(), 6);

    let ticker = TickerSnapshot::build(ViewMode::PriorSales, state.dataset(ViewMode::PriorSales));
    assert_eq!(ticker.entries.len(), 300);
    assert_eq!(ticker.entries[0], "/24 ARIN $32.50");
    assert_eq!(ticker.origin, DataOrigin::Live);
}

#[tokio::test]
async fn failed_fetch_shows_fallback_but_empty_charts() {
    let api = InMemoryApi { items: vec![], broken: true };
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let mut state = AppState::new(FilterSelection::default(), ViewMode::NewListings);
    let ticket = state.try_begin_fetch().unwrap();
    let result = fetch_all(&api, ticket.view, state.filters(), 250, today).await;
    assert!(matches!(state.complete_fetch(ticket, result), FetchOutcome::FellBack { .. }));
    assert!(!state.is_fetching());

    let ticker = TickerSnapshot::build(ViewMode::NewListings, state.dataset(ViewMode::NewListings));
    assert_eq!(ticker.origin, DataOrigin::Fallback);
    assert!(!ticker.entries.is_empty());

    let dashboard = Dashboard::build(ViewMode::NewListings, state.chart_records(ViewMode::NewListings));
    assert!(dashboard.is_empty());
}
