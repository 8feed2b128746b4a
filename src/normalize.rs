//! Price and identifier extraction from heterogeneous records.
//!
//! The API has shipped prices under several names over time, sometimes as
//! `"$1,234.50"` strings and sometimes wrapped in an object. The lookup order
//! is declared once in the strategy lists below.

use crate::error::PriceError;
use crate::models::MarketplaceRecord;
use serde_json::Value;

/// Top-level price fields, highest priority first.
pub const PRICE_FIELDS: [&str; 8] = [
    "pricePerAddress",
    "askingPrice",
    "price",
    "listPrice",
    "listingPrice",
    "perAddress",
    "asking",
    "list",
];

/// Sub-fields consulted when a price field holds an object.
pub const NESTED_PRICE_FIELDS: [&str; 2] = ["perAddress", "asking"];

pub const AUCTION_ID_FIELDS: [&str; 6] = [
    "auctionId",
    "auction_id",
    "id",
    "listingId",
    "listing_id",
    "_id",
];

/// Returns the record's per-address price, or 0 when none can be resolved.
pub fn parse_price(record: &MarketplaceRecord) -> f64 {
    try_parse_price(record).unwrap_or(0.0)
}

pub fn try_parse_price(record: &MarketplaceRecord) -> Result<f64, PriceError> {
    let raw = PRICE_FIELDS
        .iter()
        .find_map(|key| record.field(key).filter(|v| !is_blank(v)))
        .ok_or(PriceError::Missing)?;

    let value = match raw {
        Value::Object(nested) => NESTED_PRICE_FIELDS
            .iter()
            .find_map(|key| nested.get(*key).filter(|v| !is_blank(v)))
            .ok_or(PriceError::Missing)?,
        other => other,
    };

    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| PriceError::NotNumeric(n.to_string())),
        Value::String(s) => parse_price_text(s),
        other => Err(PriceError::NotNumeric(other.to_string())),
    }
}

/// Null and whitespace-only strings count as an absent field.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Strips `$` and `,` and reads the longest leading decimal literal, so
/// `"$1,250.00 USD"` reads as 1250.
pub fn parse_price_text(text: &str) -> Result<f64, PriceError> {
    let cleaned: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
    let trimmed = cleaned.trim_start();

    let prefix = leading_number(trimmed);
    if prefix.is_empty() {
        return Err(PriceError::NotNumeric(text.to_string()));
    }
    prefix
        .parse::<f64>()
        .map_err(|_| PriceError::NotNumeric(text.to_string()))
}

/// Byte length of the float literal at the start of `s`: sign, digits,
/// optional fraction and exponent. Returns "" when no digit is found.
fn leading_number(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return "";
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    &s[..end]
}

/// First non-empty identifier, coerced to a string.
pub fn get_auction_id(record: &MarketplaceRecord) -> Option<String> {
    AUCTION_ID_FIELDS.iter().find_map(|key| match record.field(key)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

/// Display string for a price field, `$`-prefixed. `path` may be dotted
/// (`pricing.asking`) to reach into a nested object.
pub fn display_price(record: &MarketplaceRecord, path: &str) -> Option<String> {
    let mut current = record.as_value();
    for segment in path.split('.') {
        current = current.get(segment).filter(|v| !v.is_null())?;
    }

    let text = match current {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || text == "$" {
        return None;
    }
    Some(if text.starts_with('$') { text } else { format!("${}", text) })
}
