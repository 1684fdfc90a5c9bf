//! Batch-level ranking errors.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A universe symbol left out of a batch, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Why no ranking could be produced.
#[derive(Debug, Clone, Error)]
pub enum RankError {
    /// Nothing could be fetched, or the universe was empty
    #[error("No valid stock data fetched ({attempted} symbols attempted)")]
    EmptyBatch {
        attempted: usize,
        dropped: Vec<DroppedSymbol>,
    },

    /// The whole batch exceeded its deadline
    #[error("Ranking batch timed out after {}s", .0.as_secs())]
    BatchTimeout(Duration),
}

impl RankError {
    /// Symbols attempted before the failure, when known.
    pub fn attempted(&self) -> Option<usize> {
        match self {
            Self::EmptyBatch { attempted, .. } => Some(*attempted),
            Self::BatchTimeout(_) => None,
        }
    }

    pub fn dropped(&self) -> &[DroppedSymbol] {
        match self {
            Self::EmptyBatch { dropped, .. } => dropped,
            Self::BatchTimeout(_) => &[],
        }
    }
}

impl From<RankError> for stockrank_common::Error {
    fn from(e: RankError) -> Self {
        // Both mean "no ranking right now" to a caller
        Self::Unavailable(e.to_string())
    }
}
