use crate::aggregation::AggregationResult;
use crate::models::MarketplaceRecord;
use crate::normalize::parse_price;
use serde::Serialize;

/// Headline numbers shown above the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSummary {
    /// Every record in the dataset, priced or not.
    pub total: usize,
    /// Records with a positive price.
    pub priced: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl PriceSummary {
    pub fn from_records(records: &[MarketplaceRecord]) -> Self {
        let prices: Vec<f64> = records.iter().map(parse_price).filter(|p| *p > 0.0).collect();
        if prices.is_empty() {
            return Self {
                total: records.len(),
                ..Self::default()
            };
        }

        Self {
            total: records.len(),
            priced: prices.len(),
            average: prices.iter().sum::<f64>() / prices.len() as f64,
            min: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Generates a formatted text histogram of a price distribution for Slack.
/// Skips empty buckets to keep the message short.
pub fn generate_report(title: &str, summary: &PriceSummary, distribution: &AggregationResult) -> String {
    let total_buckets = distribution.data.len();
    let active_buckets = distribution.data.iter().filter(|&&c| c > 0.0).count();

    let mut report = format!(
        "📊 *{} Price Distribution*\nRecords: `{}` | Priced: `{}` | Avg: `${:.2}` | Range: `${:.2}`–`${:.2}`\n```\n",
        title, summary.total, summary.priced, summary.average, summary.min, summary.max
    );

    if active_buckets == 0 {
        report.push_str("   (No priced records in this snapshot)\n");
        report.push_str("```");
        return report;
    }

    for (i, (label, &count)) in distribution.labels.iter().zip(&distribution.data).enumerate() {
        if count == 0.0 {
            continue;
        }

        // Heat by position in the price range:
        // 0-20% cheap, 20-60% mid, 60-90% high, top bucket extreme.
        let progress = i as f64 / total_buckets as f64;
        let icon = if progress < 0.2 { "🔵" }
        else if progress < 0.6 { "🟡" }
        else if progress < 0.9 { "🔴" }
        else { "🔥" };

        let percentage = if summary.priced > 0 { count / summary.priced as f64 * 100.0 } else { 0.0 };

        // 1 character per 2% keeps the widest bar at 50 characters.
        let bar = "█".repeat((percentage / 2.0).round() as usize);

        report.push_str(&format!("{} {:<12}: {:<4} {} ({:.1}%)\n", icon, label, count as usize, bar, percentage));
    }

    let hidden_count = total_buckets - active_buckets;
    if hidden_count > 0 {
        report.push_str("\n----------------------------------\n");
        report.push_str(&format!("ℹ️ {} empty buckets hidden\n", hidden_count));
    }

    report.push_str("```");
    report
}
