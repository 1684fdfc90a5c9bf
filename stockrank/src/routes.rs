//! HTTP routes for the ranking service.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info_span, Instrument};

use stockrank_common::logging::generate_trace_id;

use crate::data::{CacheStats, Country};
use crate::error::{DroppedSymbol, RankError};
use crate::pipeline::RankedBatch;
use crate::scoring::ScoredInstrument;
use crate::RankingState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// One row of `GET /stocks`.
#[derive(Debug, Serialize)]
pub struct StockRow {
    pub symbol: String,
    pub country: Country,
    pub current_price: f64,
    pub recommended_buy_price: f64,
    pub score: f64,
    pub rank: u32,
}

impl From<ScoredInstrument> for StockRow {
    fn from(s: ScoredInstrument) -> Self {
        Self {
            symbol: s.metrics.symbol,
            country: s.metrics.country,
            current_price: s.metrics.current_price,
            recommended_buy_price: s.recommended_buy_price,
            score: s.normalized_score,
            rank: s.rank,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted: Option<usize>,
    pub dropped: Vec<DroppedSymbol>,
}

impl IntoResponse for RankError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            attempted: self.attempted(),
            dropped: self.dropped().to_vec(),
        };
        let status = StatusCode::from_u16(stockrank_common::Error::from(self).status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "stockrank".to_string(),
    })
}

async fn run_batch(state: &RankingState, route: &'static str) -> Result<RankedBatch, RankError> {
    let span = info_span!("rank_request", trace_id = %generate_trace_id(), route);
    state.pipeline.run().instrument(span).await
}

/// Ranked universe, summary view
pub async fn get_stocks(
    State(state): State<Arc<RankingState>>,
) -> Result<Json<Vec<StockRow>>, RankError> {
    let batch = run_batch(&state, "/stocks").await?;
    Ok(Json(batch.instruments.into_iter().map(StockRow::from).collect()))
}

/// Ranked universe with raw scores and dropped symbols
pub async fn get_rankings(
    State(state): State<Arc<RankingState>>,
) -> Result<Json<RankedBatch>, RankError> {
    run_batch(&state, "/api/v1/rankings").await.map(Json)
}

/// Cache statistics
pub async fn get_cache_stats(State(state): State<Arc<RankingState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}
