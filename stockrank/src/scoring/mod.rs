//! Scoring, normalization, pricing and ranking.

mod engine;
mod jitter;
mod normalize;
mod pricing;
mod ranker;

pub use engine::{raw_score, ScoreEngine};
pub use jitter::{JitterSource, NoJitter, SeededJitter};
pub use normalize::normalize;
pub use pricing::BuyPriceEstimator;
pub use ranker::rank;

use serde::{Deserialize, Serialize};

use crate::data::InstrumentMetrics;

/// A fetched instrument with its score, buy price and rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredInstrument {
    #[serde(flatten)]
    pub metrics: InstrumentMetrics,
    /// Weighted composite before normalization (unbounded)
    pub raw_score: f64,
    /// Score within the configured range, one decimal
    pub normalized_score: f64,
    /// Non-negative, two decimals
    pub recommended_buy_price: f64,
    /// 1-based position in the batch
    pub rank: u32,
}

impl ScoredInstrument {
    pub fn symbol(&self) -> &str {
        &self.metrics.symbol
    }
}

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
