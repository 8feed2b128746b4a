//! Error types for the ticker.
//!
//! Malformed records never surface as errors to callers of the aggregation
//! functions; `PriceError` only exists so the fallible parsing core can be
//! tested on its own.

use thiserror::Error;

/// Why a record's price could not be resolved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceError {
    /// None of the known price fields is present.
    #[error("no price field present")]
    Missing,

    /// A price field exists but holds no numeric prefix.
    #[error("price value is not numeric: {0:?}")]
    NotNumeric(String),
}

/// Failures talking to the marketplace API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network response was not ok ({0})")]
    Status(u16),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
