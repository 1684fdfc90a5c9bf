//! stockrank Library
//!
//! Ranks a fixed universe of equities by a composite fundamentals score and
//! serves the result over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    stockrank (Rust Service)                  │
//! │                            :5000                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ Fundamentals │──▶│ Metrics      │──▶│ Score Engine     │  │
//! │  │ Provider     │   │ Cache (TTL)  │   │ + Ranker         │  │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Scoring
//!
//! Each instrument gets a weighted raw score from ROE, return on assets,
//! P/E, debt/equity and book value. Raw scores are normalized across the
//! batch onto `[1, 10]`, ranked best first, and paired with a recommended
//! buy price.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod scoring;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use stockrank_common::config::Config;

use crate::data::{FundamentalsProvider, MetricFetcher, MetricsCache, YahooProvider};
use crate::pipeline::RankingPipeline;
use crate::scoring::ScoreEngine;

pub use crate::error::{DroppedSymbol, RankError};
pub use crate::pipeline::RankedBatch;

/// Shared state of the ranking service.
pub struct RankingState {
    pub config: Config,
    pub cache: Arc<MetricsCache>,
    pub pipeline: RankingPipeline,
}

impl RankingState {
    /// Build state backed by Yahoo Finance.
    pub fn new(config: Config) -> Result<Self> {
        let provider =
            YahooProvider::new(&config.provider).context("Failed to create Yahoo provider")?;
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Build state around any fundamentals provider.
    pub fn with_provider(config: Config, provider: Arc<dyn FundamentalsProvider>) -> Self {
        let engine = ScoreEngine::new(&config.ranking);
        Self::with_engine(config, provider, engine)
    }

    /// Build state with an explicit score engine (e.g., a fixed randomness
    /// source).
    pub fn with_engine(
        config: Config,
        provider: Arc<dyn FundamentalsProvider>,
        engine: ScoreEngine,
    ) -> Self {
        let ranking = &config.ranking;
        let cache = Arc::new(MetricsCache::new(ranking.cache_ttl()));
        let fetcher = Arc::new(MetricFetcher::new(provider, ranking));
        let pipeline = RankingPipeline::new(ranking, fetcher, cache.clone(), Arc::new(engine));

        Self {
            config,
            cache,
            pipeline,
        }
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<RankingState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/stocks", get(routes::get_stocks))
        .route("/api/v1/rankings", get(routes::get_rankings))
        .route("/api/v1/cache/stats", get(routes::get_cache_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The ranking HTTP service.
pub struct RankingService {
    state: Arc<RankingState>,
}

impl RankingService {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            state: Arc::new(RankingState::new(config)?),
        })
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr = self.state.config.bind_address();
        let app = router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        tracing::info!(
            addr = %addr,
            universe = self.state.pipeline.universe().len(),
            cache_ttl_secs = self.state.cache.ttl().as_secs(),
            "stockrank listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;

        tracing::info!("stockrank stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
