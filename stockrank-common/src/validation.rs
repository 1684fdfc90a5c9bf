//! Configuration validation.
//!
//! Rejects configurations that would make scoring undefined (non-finite
//! weights, inverted ranges) or the service unusable (empty universe,
//! zero timeouts) before the server starts.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::{
    BuyPricePolicy, Config, NetworkConfig, ObservabilityConfig, ProviderConfig, RankingConfig,
    MAX_DISCOUNT_FACTOR, MIN_DISCOUNT_FACTOR,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.network.validate() {
            errors.push(e);
        }

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.provider.validate() {
            errors.push(e);
        }

        if let Err(e) = self.ranking.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load, apply environment overrides, and validate.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(crate::Error::from)?;
        Ok(config)
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "network.port".into(),
            });
        }

        if self.bind.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "network.bind".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> ValidationResult<()> {
        for (field, url) in [
            ("provider.base_url", &self.base_url),
            ("provider.session_url", &self.session_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    reason: "must be an http(s) URL".into(),
                });
            }
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "provider.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(())
    }
}

impl Validate for RankingConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.universe.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "ranking.universe".into(),
            });
        }

        let mut seen = HashSet::new();
        for symbol in &self.universe {
            if symbol.trim().is_empty() {
                errors.push(ValidationError::InvalidValue {
                    field: "ranking.universe".into(),
                    reason: "contains an empty symbol".into(),
                });
            } else if !seen.insert(symbol.as_str()) {
                errors.push(ValidationError::Conflict {
                    reason: format!("symbol {} appears more than once in ranking.universe", symbol),
                });
            }
        }

        let range = self.score_range;
        if !range.low.is_finite() || !range.high.is_finite() || range.low >= range.high {
            errors.push(ValidationError::InvalidValue {
                field: "ranking.score_range".into(),
                reason: format!(
                    "low ({}) must be finite and strictly below high ({})",
                    range.low, range.high
                ),
            });
        }

        if self
            .weights
            .as_array()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            errors.push(ValidationError::InvalidValue {
                field: "ranking.weights".into(),
                reason: "weights are magnitudes and must be finite and non-negative".into(),
            });
        }

        if let Some(jitter) = self.jitter {
            if !jitter.is_finite() || jitter < 0.0 {
                errors.push(ValidationError::InvalidValue {
                    field: "ranking.jitter".into(),
                    reason: "must be a finite, non-negative amplitude".into(),
                });
            }
        }

        if let BuyPricePolicy::Discount { factor, .. } = self.buy_price {
            if !(MIN_DISCOUNT_FACTOR..=MAX_DISCOUNT_FACTOR).contains(&factor) {
                errors.push(ValidationError::InvalidValue {
                    field: "ranking.buy_price.factor".into(),
                    reason: format!(
                        "must be within [{}, {}]",
                        MIN_DISCOUNT_FACTOR, MAX_DISCOUNT_FACTOR
                    ),
                });
            }
        }

        for (field, value) in [
            ("ranking.cache_ttl_secs", self.cache_ttl_secs),
            ("ranking.fetch_timeout_ms", self.fetch_timeout_ms),
            ("ranking.batch_timeout_secs", self.batch_timeout_secs),
            ("ranking.max_concurrent_fetches", self.max_concurrent_fetches as u64),
        ] {
            if value == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreRange;
    use test_case::test_case;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.observability.log_level = "invalid".into();
        let result = config.validate();
        assert!(result.is_err());
        if let Err(ValidationError::InvalidValue { field, .. }) = result {
            assert_eq!(field, "observability.log_level");
        }
    }

    #[test]
    fn test_zero_port() {
        let mut config = Config::default();
        config.network.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPort { port: 0, .. })
        ));
    }

    #[test]
    fn test_duplicate_symbol() {
        let mut config = Config::default();
        config.ranking.universe = vec!["AAPL".into(), "MSFT".into(), "AAPL".into()];
        let result = config.validate();
        if let Err(ValidationError::Conflict { reason }) = result {
            assert!(reason.contains("AAPL"));
        } else {
            panic!("expected conflict, got {:?}", result);
        }
    }

    #[test]
    fn test_empty_universe() {
        let mut config = Config::default();
        config.ranking.universe.clear();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingField { .. })
        ));
    }

    #[test_case(1.0, 1.0 ; "degenerate range")]
    #[test_case(10.0, 1.0 ; "inverted range")]
    #[test_case(f64::NAN, 10.0 ; "nan bound")]
    fn test_invalid_score_range(low: f64, high: f64) {
        let mut config = Config::default();
        config.ranking.score_range = ScoreRange::new(low, high);
        assert!(config.validate().is_err());
    }

    #[test_case(0.79 ; "below range")]
    #[test_case(0.95 ; "above range")]
    fn test_invalid_discount_factor(factor: f64) {
        let mut config = Config::default();
        config.ranking.buy_price = BuyPricePolicy::Discount {
            factor,
            randomize: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_and_jitter_collected() {
        let mut config = Config::default();
        config.ranking.weights.price_to_earnings = -0.2;
        config.ranking.jitter = Some(-0.3);
        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timeouts() {
        let mut config = Config::default();
        config.ranking.fetch_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_url_scheme() {
        let mut config = Config::default();
        config.provider.base_url = "query2.finance.yahoo.com".into();
        assert!(config.validate().is_err());
    }
}
