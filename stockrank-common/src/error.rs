//! Error types shared by stockrank crates.

use thiserror::Error;

use crate::validation::ValidationError;

/// Unified error type surfaced at the service boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected at startup
    #[error("Configuration error: {0}")]
    Config(#[from] ValidationError),

    /// No usable result could be produced right now
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unavailable(_) => 503,
            Self::Config(_) => 500,
        }
    }
}
