//! Bounded per-symbol metric lookup.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use stockrank_common::RankingConfig;

use super::provider::{FundamentalsProvider, ProviderError};
use super::{Country, InstrumentMetrics};

/// Why a single symbol could not be fetched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("lookup timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl FetchError {
    /// Whether a later batch may succeed for the same symbol.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Provider(e) => e.is_recoverable(),
        }
    }
}

/// Fetches one symbol's fundamentals within a deadline and types the result.
///
/// A fetch either yields a complete [`InstrumentMetrics`] (missing fields
/// coerced to zero) or a [`FetchError`]; it never yields a partial record.
pub struct MetricFetcher {
    provider: Arc<dyn FundamentalsProvider>,
    domestic_suffixes: Vec<String>,
    timeout: Duration,
}

impl MetricFetcher {
    /// Create a fetcher using the ranking configuration's suffixes and timeout.
    pub fn new(provider: Arc<dyn FundamentalsProvider>, config: &RankingConfig) -> Self {
        Self::with_timeout(
            provider,
            config.domestic_suffixes.clone(),
            config.fetch_timeout(),
        )
    }

    pub fn with_timeout(
        provider: Arc<dyn FundamentalsProvider>,
        domestic_suffixes: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            domestic_suffixes,
            timeout,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up `symbol` once. Not retried.
    pub async fn fetch(&self, symbol: &str) -> Result<InstrumentMetrics, FetchError> {
        if symbol.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("empty symbol".into()).into());
        }

        let record = match tokio::time::timeout(self.timeout, self.provider.lookup(symbol)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!(symbol = %symbol, provider = self.provider.name(), error = %e, "Lookup failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    symbol = %symbol,
                    provider = self.provider.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Lookup timed out"
                );
                return Err(FetchError::Timeout(self.timeout));
            }
        };

        let country = Country::classify(symbol, &self.domestic_suffixes);
        let metrics = InstrumentMetrics::from_record(symbol, country, &record);

        debug!(
            symbol = %symbol,
            country = %country,
            price = metrics.current_price,
            fields = record.len(),
            "Fetched fundamentals"
        );

        Ok(metrics)
    }
}
