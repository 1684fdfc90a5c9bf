//! Upstream fundamentals provider abstraction.
//!
//! Defines the `FundamentalsProvider` trait: given a symbol, return a
//! loosely typed record of named fields, or a classified error. Typing and
//! defaulting happen later, in the fetcher.

use async_trait::async_trait;
use std::fmt;

/// Loosely typed upstream record: field name to JSON value.
pub type MetricRecord = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to fundamentals providers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network error (connection failed, transport timeout)
    Network(String),
    /// Rate limit exceeded
    RateLimited { retry_after_secs: Option<u64> },
    /// No data for the requested symbol
    DataNotAvailable(String),
    /// Invalid request parameters
    InvalidRequest(String),
    /// Response could not be decoded
    Malformed(String),
    /// Provider is temporarily unavailable (5xx, session failure)
    Unavailable(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {} seconds", secs)?;
                }
                Ok(())
            }
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Malformed(msg) => write!(f, "Malformed response: {}", msg),
            Self::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Check if the error is transient (a later request may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

// ============================================================================
// Fundamentals Provider Trait
// ============================================================================

/// A source of per-symbol fundamentals.
///
/// Implementations perform exactly one upstream lookup per call and must be
/// side-effect free, so concurrent calls for the same symbol are harmless.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Provider name for logs (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch the named fundamentals for `symbol`.
    async fn lookup(&self, symbol: &str) -> Result<MetricRecord, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================
