//! stockrank common - shared configuration, validation, errors, and logging.
//!
//! This crate provides:
//! - Configuration types and loading (file + environment overrides)
//! - Configuration validation
//! - The boundary error type
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    BuyPricePolicy, Config, NetworkConfig, NormalizationMethod, ObservabilityConfig,
    ProviderConfig, RankingConfig, ScoreRange, ScoreWeights,
};
pub use error::Error;
pub use validation::{Validate, ValidationError, ValidationResult};

