use crate::models::{MarketplaceRecord, Region};
use crate::normalize::{get_auction_id, parse_price};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use tracing::{error, info};

/// A "notify me" rule for new listings. Empty lists and missing bounds match anything.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotifyRule {
    pub id: String,
    #[serde(default)]
    pub block_sizes: Vec<u8>,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

impl NotifyRule {
    /// Requires a positive price inside the inclusive bounds.
    pub fn matches(&self, record: &MarketplaceRecord) -> bool {
        if !self.block_sizes.is_empty() {
            let Some(block) = record.block() else {
                return false;
            };
            if !self.block_sizes.iter().any(|b| u32::from(*b) == block) {
                return false;
            }
        }

        if !self.regions.is_empty() {
            match record.region() {
                Some(region) if self.regions.contains(&region) => {}
                _ => return false,
            }
        }

        let price = parse_price(record);
        price > 0.0
            && self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max)
    }
}

/// A listing that satisfied a rule for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingMatch {
    pub rule_id: String,
    pub listing_key: String,
    pub block: Option<u32>,
    pub region: Option<Region>,
    pub price: f64,
}

/// Remembers which (rule, listing) pairs have already been announced.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    notified: HashSet<(String, String)>,
}

impl NotificationLedger {
    /// Listings matching some rule that have not been announced yet. Each
    /// returned pair is recorded so it is not returned again.
    pub fn collect_new(&mut self, rules: &[NotifyRule], records: &[MarketplaceRecord]) -> Vec<ListingMatch> {
        let mut matches = Vec::new();
        for record in records {
            let price = parse_price(record);
            let key = listing_key(record, price);
            for rule in rules.iter().filter(|r| r.matches(record)) {
                if self.notified.insert((rule.id.clone(), key.clone())) {
                    matches.push(ListingMatch {
                        rule_id: rule.id.clone(),
                        listing_key: key.clone(),
                        block: record.block(),
                        region: record.region(),
                        price,
                    });
                }
            }
        }
        matches
    }

    /// Forgets listings that are no longer on the market.
    pub fn retain_listed(&mut self, records: &[MarketplaceRecord]) {
        let listed: HashSet<String> = records
            .iter()
            .map(|record| listing_key(record, parse_price(record)))
            .collect();
        self.notified.retain(|(_, key)| listed.contains(key));
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }
}

/// Auction id when the API provides one, else block, region, and price.
fn listing_key(record: &MarketplaceRecord, price: f64) -> String {
    get_auction_id(record).unwrap_or_else(|| {
        format!(
            "{}|{}|{}",
            record.block().map(|b| b.to_string()).unwrap_or_default(),
            record.region().map(Region::api_name).unwrap_or(""),
            price
        )
    })
}

pub fn format_listing_alert(m: &ListingMatch) -> String {
    let block = m.block.map(|b| format!("/{}", b)).unwrap_or_else(|| "/?".to_string());
    let region = m.region.map(Region::label).unwrap_or("UNKNOWN");
    format!(
        "🔔 *New IPv4 Listing Match*\n\
        > *Rule*: `{}`\n\
        > *Block*: `{}`  *RIR*: `{}`\n\
        > *Asking*: `${:.2}` per address\n\
        > *Listing*: `{}`",
        m.rule_id, block, region, m.price, m.listing_key
    )
}

/// Posts a listing alert to Slack on a background task.
pub fn send_listing_alert(webhook_url: String, m: &ListingMatch) {
    let client = reqwest::Client::new();
    let message = format_listing_alert(m);

    tokio::spawn(async move {
        match client.post(webhook_url).json(&json!({"text": message})).send().await {
            Ok(_) => info!("🔔 Listing alert delivered successfully."),
            Err(e) => error!("❌ Failed to send listing alert: {:?}", e),
        }
    });
}

pub fn send_report(webhook_url: String, report: String) {
    let client = reqwest::Client::new();
    tokio::spawn(async move {
        match client.post(webhook_url).json(&json!({"text": report})).send().await {
            Ok(_) => info!("📊 Price report delivered successfully."),
            Err(e) => error!("❌ Failed to send price report: {:?}", e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn listing(value: serde_json::Value) -> MarketplaceRecord {
        MarketplaceRecord::new(value)
    }

    fn rule(id: &str) -> NotifyRule {
        NotifyRule { id: id.to_string(), block_sizes: vec![], regions: vec![], min_price: None, max_price: None }
    }

    #[test]
    fn empty_rule_matches_any_priced_listing() {
        let r = rule("any");
        assert!(r.matches(&listing(json!({"block": 24, "askingPrice": "$30"}))));
        assert!(!r.matches(&listing(json!({"block": 24}))));
    }

    #[test]
    fn rule_filters_block_region_and_price() {
        let r = NotifyRule {
            block_sizes: vec![22, 24],
            regions: vec![Region::Arin],
            min_price: Some(25.0),
            max_price: Some(32.0),
            ..rule("cheap-arin")
        };
        assert!(r.matches(&listing(json!({"block": 24, "region": "ARIN", "askingPrice": "$32"}))));
        assert!(r.matches(&listing(json!({"block": "22", "region": "arin", "askingPrice": "$25"}))));
        assert!(!r.matches(&listing(json!({"block": 23, "region": "arin", "askingPrice": "$30"}))));
        assert!(!r.matches(&listing(json!({"block": 24, "region": "ripe", "askingPrice": "$30"}))));
        assert!(!r.matches(&listing(json!({"block": 24, "region": "arin", "askingPrice": "$33"}))));
        assert!(!r.matches(&listing(json!({"region": "arin", "askingPrice": "$30"}))));
    }

    #[test]
    fn ledger_announces_each_listing_once_per_rule() {
        let rules = vec![rule("a"), NotifyRule { max_price: Some(31.0), ..rule("b") }];
        let records = vec![
            listing(json!({"auctionId": "A-1", "block": 24, "region": "arin", "askingPrice": "$30"})),
            listing(json!({"block": 22, "region": "ripe", "askingPrice": "$35"})),
        ];

        let mut ledger = NotificationLedger::default();
        let first = ledger.collect_new(&rules, &records);
        let pairs: Vec<(&str, &str)> = first.iter().map(|m| (m.rule_id.as_str(), m.listing_key.as_str())).collect();
        assert_eq!(pairs, vec![("a", "A-1"), ("b", "A-1"), ("a", "22|ripe|35")]);

        assert!(ledger.collect_new(&rules, &records).is_empty());
    }

    #[test]
    fn ledger_forgets_delisted_listings() {
        let rules = vec![rule("a")];
        let first = listing(json!({"auctionId": "A-1", "block": 24, "askingPrice": "$30"}));
        let second = listing(json!({"auctionId": "A-2", "block": 22, "askingPrice": "$35"}));

        let mut ledger = NotificationLedger::default();
        ledger.collect_new(&rules, &[first.clone(), second.clone()]);
        assert_eq!(ledger.len(), 2);

        ledger.retain_listed(std::slice::from_ref(&second));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.collect_new(&rules, std::slice::from_ref(&second)).is_empty());

        ledger.retain_listed(&[]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn alert_text_mentions_listing() {
        let m = ListingMatch {
            rule_id: "a".to_string(),
            listing_key: "A-1".to_string(),
            block: Some(24),
            region: Some(Region::Arin),
            price: 30.0,
        };
        let text = format_listing_alert(&m);
        assert!(text.contains("`/24`"));
        assert!(text.contains("`ARIN`"));
        assert!(text.contains("$30.00"));
    }
}
