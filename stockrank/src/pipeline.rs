//! Ranking pipeline.
//!
//! One `run()` is one batch:
//! 1. Purge expired cache entries, then fetch every universe symbol through
//!    the cache, concurrently
//! 2. Drop symbols that failed or timed out, remembering why
//! 3. Score, price and rank the survivors
//!
//! The whole batch runs under a deadline.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use stockrank_common::RankingConfig;

use crate::data::{InstrumentMetrics, MetricFetcher, MetricsCache};
use crate::error::{DroppedSymbol, RankError};
use crate::scoring::{ScoreEngine, ScoredInstrument};

// ============================================================================
// Ranked Batch
// ============================================================================

/// Result of one ranking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedBatch {
    /// Batch ID (timestamp-based)
    pub id: String,
    /// When the batch started
    pub generated_at: DateTime<Utc>,
    /// Number of universe symbols attempted
    pub requested: usize,
    /// Ranked instruments, rank order
    pub instruments: Vec<ScoredInstrument>,
    /// Symbols that could not be fetched
    pub dropped: Vec<DroppedSymbol>,
    /// Wall time of the run
    pub duration_ms: u64,
}

impl RankedBatch {
    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Ranked {} of {} symbols in {}ms ({} dropped)",
            self.instruments.len(),
            self.requested,
            self.duration_ms,
            self.dropped.len()
        )
    }
}

// ============================================================================
// Ranking Pipeline
// ============================================================================

/// Fetches the universe and ranks it.
pub struct RankingPipeline {
    universe: Vec<String>,
    fetcher: Arc<MetricFetcher>,
    cache: Arc<MetricsCache>,
    engine: Arc<ScoreEngine>,
    max_concurrent: usize,
    batch_timeout: Duration,
}

impl RankingPipeline {
    pub fn new(
        config: &RankingConfig,
        fetcher: Arc<MetricFetcher>,
        cache: Arc<MetricsCache>,
        engine: Arc<ScoreEngine>,
    ) -> Self {
        Self {
            universe: config.universe.clone(),
            fetcher,
            cache,
            engine,
            max_concurrent: config.max_concurrent_fetches.max(1),
            batch_timeout: config.batch_timeout(),
        }
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    /// Run one batch.
    pub async fn run(&self) -> Result<RankedBatch, RankError> {
        let started = Instant::now();
        let generated_at = Utc::now();
        let id = format!("rank_{}", generated_at.format("%Y%m%d_%H%M%S%.3f"));
        let requested = self.universe.len();

        info!(
            batch_id = %id,
            symbols = requested,
            provider = self.fetcher.provider_name(),
            "Starting ranking batch"
        );

        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!(batch_id = %id, purged, "Purged expired cache entries");
        }

        let (records, dropped) = tokio::time::timeout(self.batch_timeout, self.collect())
            .await
            .map_err(|_| {
                warn!(
                    batch_id = %id,
                    timeout_secs = self.batch_timeout.as_secs(),
                    "Ranking batch timed out"
                );
                RankError::BatchTimeout(self.batch_timeout)
            })?;

        if records.is_empty() {
            warn!(
                batch_id = %id,
                attempted = requested,
                dropped = dropped.len(),
                "No valid stock data fetched"
            );
            return Err(RankError::EmptyBatch {
                attempted: requested,
                dropped,
            });
        }

        let instruments = self.engine.score_batch(records)?;

        let batch = RankedBatch {
            id,
            generated_at,
            requested,
            instruments,
            dropped,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            batch_id = %batch.id,
            ranked = batch.instruments.len(),
            dropped = batch.dropped.len(),
            duration_ms = batch.duration_ms,
            "{}",
            batch.summary()
        );

        Ok(batch)
    }

    /// Fetch every symbol, splitting successes from failures.
    ///
    /// Both lists come back sorted by symbol so a seeded engine sees the
    /// same input order regardless of completion order.
    async fn collect(&self) -> (Vec<InstrumentMetrics>, Vec<DroppedSymbol>) {
        let results: Vec<_> = stream::iter(self.universe.clone())
            .map(|symbol| {
                let cache = self.cache.clone();
                let fetcher = self.fetcher.clone();
                async move {
                    let result = cache.get_or_fetch(&symbol, || fetcher.fetch(&symbol)).await;
                    (symbol, result)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut records = Vec::with_capacity(results.len());
        let mut dropped = Vec::new();

        for (symbol, result) in results {
            match result {
                Ok(metrics) => records.push(metrics),
                Err(e) => {
                    warn!(
                        symbol = %symbol,
                        reason = %e,
                        recoverable = e.is_recoverable(),
                        "Dropping symbol from batch"
                    );
                    dropped.push(DroppedSymbol {
                        symbol,
                        reason: e.to_string(),
                    });
                }
            }
        }

        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        dropped.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        (records, dropped)
    }
}
