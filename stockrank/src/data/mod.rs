//! Fundamentals data layer.
//!
//! Turns loosely typed upstream records into [`InstrumentMetrics`] and keeps
//! recent snapshots in a TTL cache so repeated ranking requests do not hit
//! the upstream provider for every symbol.
//!
//! # Components
//! - **provider**: the `FundamentalsProvider` capability (`lookup(symbol)`)
//! - **yahoo**: Yahoo Finance quoteSummary implementation of the provider
//! - **fetcher**: one bounded lookup per symbol, coerced into typed metrics
//! - **cache**: per-symbol snapshots with lazy expiry

mod cache;
mod fetcher;
mod provider;
mod yahoo;

pub use cache::{CacheStats, MetricsCache};
pub use fetcher::{FetchError, MetricFetcher};
pub use provider::{FundamentalsProvider, MetricRecord, ProviderError};
pub use yahoo::YahooProvider;

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Upstream Field Names
// ============================================================================

/// Names of the upstream fields read for every instrument.
pub mod fields {
    pub const CURRENT_PRICE: &str = "currentPrice";
    pub const RETURN_ON_EQUITY: &str = "returnOnEquity";
    pub const RETURN_ON_ASSETS: &str = "returnOnAssets";
    pub const TRAILING_PE: &str = "trailingPE";
    pub const DEBT_TO_EQUITY: &str = "debtToEquity";
    pub const BOOK_VALUE: &str = "bookValue";
}

// ============================================================================
// Core Data Types
// ============================================================================

/// Market of origin, derived from the symbol suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Country {
    Domestic,
    Foreign,
}

impl Country {
    /// Classify a symbol: domestic when it ends with one of `domestic_suffixes`
    /// (ASCII case-insensitive), foreign otherwise.
    pub fn classify(symbol: &str, domestic_suffixes: &[String]) -> Self {
        let symbol = symbol.to_ascii_uppercase();
        let is_domestic = domestic_suffixes
            .iter()
            .filter(|suffix| !suffix.is_empty())
            .any(|suffix| symbol.ends_with(&suffix.to_ascii_uppercase()));

        if is_domestic {
            Self::Domestic
        } else {
            Self::Foreign
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domestic => "DOMESTIC",
            Self::Foreign => "FOREIGN",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fundamentals snapshot for one symbol.
///
/// Every numeric field is finite. Anything the upstream record lacks, or
/// carries as null / non-numeric / non-finite, is stored as `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMetrics {
    /// Symbol as requested (e.g., "TCS.NS", "AAPL")
    pub symbol: String,
    /// Market of origin
    pub country: Country,
    /// Last traded price, never negative
    pub current_price: f64,
    /// Return on equity
    pub return_on_equity: f64,
    /// Return on assets, used as the ROCE proxy
    pub return_on_assets: f64,
    /// Trailing P/E
    pub price_to_earnings: f64,
    /// Debt to equity
    pub debt_to_equity: f64,
    /// Book value per share
    pub book_value: f64,
}

impl InstrumentMetrics {
    /// Build a snapshot from an upstream record, applying the zero default.
    pub fn from_record(symbol: &str, country: Country, record: &MetricRecord) -> Self {
        Self {
            symbol: symbol.to_string(),
            country,
            current_price: metric_value(record, fields::CURRENT_PRICE).max(0.0),
            return_on_equity: metric_value(record, fields::RETURN_ON_EQUITY),
            return_on_assets: metric_value(record, fields::RETURN_ON_ASSETS),
            price_to_earnings: metric_value(record, fields::TRAILING_PE),
            debt_to_equity: metric_value(record, fields::DEBT_TO_EQUITY),
            book_value: metric_value(record, fields::BOOK_VALUE),
        }
    }
}

/// Read one numeric field, coercing anything unusable to `0.0`.
///
/// Numbers are taken as is and numeric strings are parsed. Null, booleans,
/// arrays, objects, unparsable strings, NaN and infinities all yield zero.
pub fn metric_value(record: &MetricRecord, key: &str) -> f64 {
    let value = match record.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

// ============================================================================
// Tests
// ============================================================================
