//! Paginated access to the marketplace API.

use crate::error::FetchError;
use crate::models::{
    FilterSelection, ListingPage, ListingQuery, MarketplaceRecord, Period, QueryFilter, SortSpec,
    ViewMode,
};
use chrono::{Datelike, Days, NaiveDate};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Page size bounds accepted by the API.
pub const MIN_PAGE_SIZE: usize = 25;
pub const MAX_PAGE_SIZE: usize = 250;

/// Anything that can return one page of records for a query.
pub trait PageSource {
    fn fetch_page(
        &self,
        view: ViewMode,
        query: &ListingQuery,
    ) -> impl Future<Output = Result<Vec<MarketplaceRecord>, FetchError>> + Send;
}

/// `PageSource` backed by the real HTTP API.
#[derive(Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn endpoint(&self, view: ViewMode) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), view.endpoint_path())
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(
        &self,
        view: ViewMode,
        query: &ListingQuery,
    ) -> Result<Vec<MarketplaceRecord>, FetchError> {
        let response = self
            .client
            .post(self.endpoint(view))
            .header("Accept", "application/json")
            .header("Origin", "https://auctions.ipv4.global")
            .header("Cache-Control", "no-cache")
            .json(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let page: ListingPage = serde_json::from_slice(&body)?;
        Ok(page.items)
    }
}

impl ListingQuery {
    /// Builds the request body for one page.
    ///
    /// Prior sales always carry a period, defaulting to the start of `today`'s
    /// year through tomorrow. Listings never do.
    pub fn build(
        view: ViewMode,
        filters: &FilterSelection,
        today: NaiveDate,
        offset: usize,
        limit: usize,
    ) -> Self {
        let period = match view {
            ViewMode::PriorSales => Some(Period {
                from: filters.date_from.unwrap_or_else(|| start_of_year(today)),
                to: filters
                    .date_to
                    .unwrap_or_else(|| today.checked_add_days(Days::new(1)).unwrap_or(today)),
            }),
            ViewMode::NewListings => None,
        };

        Self {
            filter: QueryFilter {
                block: filters.effective_blocks(),
                region: filters.effective_regions(),
                period,
            },
            sort: SortSpec::default(),
            offset,
            limit,
        }
    }
}

fn start_of_year(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
}

/// Fetches every page for `view` and concatenates them in order.
///
/// Pages are requested one at a time; the loop ends on the first page shorter
/// than `page_size` (including an empty one). Any page error aborts the fetch.
pub async fn fetch_all<S>(
    source: &S,
    view: ViewMode,
    filters: &FilterSelection,
    page_size: usize,
    today: NaiveDate,
) -> Result<Vec<MarketplaceRecord>, FetchError>
where
    S: PageSource + ?Sized,
{
    let page_size = page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    let mut all_items = Vec::new();
    let mut offset = 0;

    loop {
        let query = ListingQuery::build(view, filters, today, offset, page_size);
        debug!("Fetching {:?} page: offset={}, limit={}", view, offset, page_size);

        let items = source.fetch_page(view, &query).await?;
        let received = items.len();
        all_items.extend(items);
        debug!("Received {} items (total so far: {})", received, all_items.len());

        if received < page_size {
            break;
        }
        offset += page_size;
    }

    info!("📥 {} fetch complete: {} records", view.display_name(), all_items.len());
    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves `total` numbered records and logs every query it sees.
    struct FakeApi {
        total: usize,
        fail_at_offset: Option<usize>,
        seen: Mutex<Vec<ListingQuery>>,
    }

    impl FakeApi {
        fn new(total: usize) -> Self {
            Self { total, fail_at_offset: None, seen: Mutex::new(Vec::new()) }
        }
    }

    impl PageSource for FakeApi {
        async fn fetch_page(
            &self,
            _view: ViewMode,
            query: &ListingQuery,
        ) -> Result<Vec<MarketplaceRecord>, FetchError> {
            self.seen.lock().unwrap().push(query.clone());
            if self.fail_at_offset == Some(query.offset) {
                return Err(FetchError::Status(502));
            }
            let end = (query.offset + query.limit).min(self.total);
            Ok((query.offset..end)
                .map(|i| MarketplaceRecord::new(json!({"id": i, "block": 24})))
                .collect())
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn pages_until_short_page() {
        let api = FakeApi::new(600);
        let records = fetch_all(&api, ViewMode::PriorSales, &FilterSelection::default(), 250, day(2024, 6, 1))
            .await
            .unwrap();

        assert_eq!(records.len(), 600);
        let offsets: Vec<usize> = api.seen.lock().unwrap().iter().map(|q| q.offset).collect();
        assert_eq!(offsets, vec![0, 250, 500]);
        assert_eq!(records[599].as_value()["id"], json!(599));
    }

    #[tokio::test]
    async fn exact_multiple_stops_on_empty_page() {
        let api = FakeApi::new(500);
        let records = fetch_all(&api, ViewMode::NewListings, &FilterSelection::default(), 250, day(2024, 6, 1))
            .await
            .unwrap();
        assert_eq!(records.len(), 500);
        assert_eq!(api.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let api = FakeApi::new(10);
        fetch_all(&api, ViewMode::NewListings, &FilterSelection::default(), 1000, day(2024, 6, 1))
            .await
            .unwrap();
        fetch_all(&api, ViewMode::NewListings, &FilterSelection::default(), 5, day(2024, 6, 1))
            .await
            .unwrap();
        let limits: Vec<usize> = api.seen.lock().unwrap().iter().map(|q| q.limit).collect();
        assert_eq!(limits, vec![250, 25]);
    }

    #[tokio::test]
    async fn page_error_propagates() {
        let api = FakeApi { fail_at_offset: Some(250), ..FakeApi::new(1000) };
        let result = fetch_all(&api, ViewMode::PriorSales, &FilterSelection::default(), 250, day(2024, 6, 1)).await;
        assert!(matches!(result, Err(FetchError::Status(502))));
    }

    #[test]
    fn sales_query_defaults_period_to_current_year() {
        let query = ListingQuery::build(ViewMode::PriorSales, &FilterSelection::default(), day(2024, 12, 31), 0, 250);
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["filter"]["period"], json!({"from": "2024-01-01", "to": "2025-01-01"}));
        assert_eq!(value["filter"]["region"], json!(["arin", "apnic", "ripe", "afrinic", "lacnic"]));
        assert_eq!(value["sort"], json!({"property": "date", "direction": "desc"}));
    }

    #[test]
    fn selected_filters_override_defaults() {
        let filters = FilterSelection {
            block_sizes: vec![22],
            regions: vec![Region::Ripe],
            date_from: Some(day(2023, 5, 1)),
            date_to: Some(day(2023, 6, 1)),
        };
        let query = ListingQuery::build(ViewMode::PriorSales, &filters, day(2024, 1, 1), 250, 250);
        assert_eq!(query.filter.block, vec![22]);
        assert_eq!(query.filter.region, vec![Region::Ripe]);
        assert_eq!(query.filter.period, Some(Period { from: day(2023, 5, 1), to: day(2023, 6, 1) }));
        assert_eq!(query.offset, 250);

        let listings = ListingQuery::build(ViewMode::NewListings, &filters, day(2024, 1, 1), 0, 250);
        assert_eq!(listings.filter.period, None);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let source = HttpPageSource::new("https://api.example.com/prod/api/").unwrap();
        assert_eq!(source.endpoint(ViewMode::PriorSales), "https://api.example.com/prod/api/priorSales");
        assert_eq!(source.endpoint(ViewMode::NewListings), "https://api.example.com/prod/api/currentListing");
    }
}
