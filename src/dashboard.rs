//! Dashboard composition: which charts each view shows, with their data.
//!
//! This is the hand-off to whatever draws the charts. Nothing here knows
//! about canvases or animation; a renderer gets the chart kind and data.

use crate::aggregation::{
    avg_price_by_block_size, avg_price_by_region, by_block_size, by_region, price_distribution,
    price_trend, price_trend_by_block_category, AggregationResult, MultiSeries,
};
use crate::models::{MarketplaceRecord, ViewMode};
use crate::stats::PriceSummary;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    MultiLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Single(AggregationResult),
    Multi(MultiSeries),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Single(result) => result.is_empty() || result.data.iter().all(|v| *v == 0.0),
            ChartData::Multi(multi) => multi.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: ChartKind,
    pub data: ChartData,
}

impl Chart {
    fn single(id: &'static str, title: &'static str, kind: ChartKind, data: AggregationResult) -> Self {
        Self { id, title, kind, data: ChartData::Single(data) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub view_mode: ViewMode,
    pub summary: PriceSummary,
    pub charts: Vec<Chart>,
}

impl Dashboard {
    pub fn build(view_mode: ViewMode, records: &[MarketplaceRecord]) -> Self {
        let charts = match view_mode {
            ViewMode::PriorSales => vec![
                Chart::single("salesByRirChart", "Sales by RIR", ChartKind::Pie, by_region(records)),
                Chart::single("salesByBlockChart", "Sales by Block Size", ChartKind::Bar, by_block_size(records)),
                Chart::single(
                    "salesPriceByBlockChart",
                    "Average Price by Block Size",
                    ChartKind::Bar,
                    avg_price_by_block_size(records),
                ),
                Chart::single("salesTrendChart", "Price Trend", ChartKind::Line, price_trend(records)),
                Chart {
                    id: "salesTrendByBlockChart",
                    title: "Price Trend by Block Size",
                    kind: ChartKind::MultiLine,
                    data: ChartData::Multi(price_trend_by_block_category(records)),
                },
                Chart::single(
                    "salesPriceDistributionChart",
                    "Price Distribution",
                    ChartKind::Bar,
                    price_distribution(records),
                ),
            ],
            ViewMode::NewListings => vec![
                Chart::single("listingsByRirChart", "Listings by RIR", ChartKind::Pie, by_region(records)),
                Chart::single("listingsByBlockChart", "Listings by Block Size", ChartKind::Bar, by_block_size(records)),
                Chart::single(
                    "listingsPriceByBlockChart",
                    "Average Asking Price by Block Size",
                    ChartKind::Bar,
                    avg_price_by_block_size(records),
                ),
                Chart::single(
                    "listingsPriceByRirChart",
                    "Average Asking Price by RIR",
                    ChartKind::Bar,
                    avg_price_by_region(records),
                ),
                Chart::single(
                    "listingsPriceDistributionChart",
                    "Asking Price Distribution",
                    ChartKind::Bar,
                    price_distribution(records),
                ),
            ],
        };

        Self {
            view_mode,
            summary: PriceSummary::from_records(records),
            charts,
        }
    }

    /// True when a renderer should show the "no data available" state.
    pub fn is_empty(&self) -> bool {
        self.summary.total == 0
    }

    pub fn chart(&self, id: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Vec<MarketplaceRecord> {
        vec![
            json!({"block": 24, "region": "arin", "pricePerAddress": "$32.50"}),
            json!({"block": 24, "region": "ripe", "pricePerAddress": "$30"}),
            json!({"block": 22, "region": "arin", "price": "$40"}),
        ]
        .into_iter()
        .map(MarketplaceRecord::new)
        .collect()
    }

    #[test]
    fn sales_view_charts() {
        let dashboard = Dashboard::build(ViewMode::PriorSales, &sample());
        let ids: Vec<&str> = dashboard.charts.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![
                "salesByRirChart",
                "salesByBlockChart",
                "salesPriceByBlockChart",
                "salesTrendChart",
                "salesTrendByBlockChart",
                "salesPriceDistributionChart"
            ]
        );
        let Some(Chart { data: ChartData::Single(by_rir), .. }) = dashboard.chart("salesByRirChart") else {
            panic!("missing region chart");
        };
        assert_eq!(by_rir.data, vec![2.0, 1.0, 0.0, 0.0, 0.0]);
        // sample has no dates
        assert!(dashboard.chart("salesTrendChart").unwrap().data.is_empty());
    }

    #[test]
    fn listings_view_has_price_by_region() {
        let dashboard = Dashboard::build(ViewMode::NewListings, &sample());
        let chart = dashboard.chart("listingsPriceByRirChart").unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert!(dashboard.chart("salesTrendChart").is_none());
        assert_eq!(dashboard.summary.priced, 3);
    }

    #[test]
    fn empty_dashboard() {
        let dashboard = Dashboard::build(ViewMode::NewListings, &[]);
        assert!(dashboard.is_empty());
        assert!(dashboard.charts.iter().all(|c| c.data.is_empty()));
    }

    #[test]
    fn serializes_for_renderer() {
        let value = serde_json::to_value(Dashboard::build(ViewMode::PriorSales, &sample())).unwrap();
        assert_eq!(value["view_mode"], json!("priorSales"));
        assert_eq!(value["charts"][0]["kind"], json!("pie"));
        assert_eq!(value["charts"][2]["data"]["labels"], json!(["/24", "/22"]));
        assert_eq!(value["charts"][2]["data"]["data"], json!([31.25, 40.0]));
    }
}
