//! Recommended buy price.

use stockrank_common::config::{MAX_DISCOUNT_FACTOR, MIN_DISCOUNT_FACTOR};
use stockrank_common::BuyPricePolicy;

use super::jitter::JitterSource;
use super::round_to;
use crate::data::InstrumentMetrics;

/// Estimates a recommended buy price under the configured policy.
#[derive(Debug, Clone, Copy)]
pub struct BuyPriceEstimator {
    policy: BuyPricePolicy,
}

impl BuyPriceEstimator {
    pub fn new(policy: BuyPricePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> BuyPricePolicy {
        self.policy
    }

    /// Buy price rounded to two decimals. Never negative.
    ///
    /// - `valuation`: `book_value * (1 + pe / 10)` when both are positive
    /// - `discount`: `current_price * factor`
    ///
    /// Zero whenever the current price is not positive or the policy's
    /// inputs are unusable.
    pub fn estimate(&self, metrics: &InstrumentMetrics, source: &mut dyn JitterSource) -> f64 {
        if metrics.current_price <= 0.0 {
            return 0.0;
        }

        let price = match self.policy {
            BuyPricePolicy::Valuation => {
                let (bv, pe) = (metrics.book_value, metrics.price_to_earnings);
                if bv > 0.0 && pe > 0.0 {
                    bv * (1.0 + pe / 10.0)
                } else {
                    0.0
                }
            }
            BuyPricePolicy::Discount { factor, randomize } => {
                let factor = if randomize {
                    source.sample(MIN_DISCOUNT_FACTOR, MAX_DISCOUNT_FACTOR)
                } else {
                    factor
                };
                metrics.current_price * factor.clamp(MIN_DISCOUNT_FACTOR, MAX_DISCOUNT_FACTOR)
            }
        };

        if price.is_finite() {
            round_to(price.max(0.0), 2)
        } else {
            0.0
        }
    }
}

impl Default for BuyPriceEstimator {
    fn default() -> Self {
        Self::new(BuyPricePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Country;
    use crate::scoring::{NoJitter, SeededJitter};

    fn metrics(price: f64, bv: f64, pe: f64) -> InstrumentMetrics {
        InstrumentMetrics {
            symbol: "TEST".into(),
            country: Country::Foreign,
            current_price: price,
            return_on_equity: 0.0,
            return_on_assets: 0.0,
            price_to_earnings: pe,
            debt_to_equity: 0.0,
            book_value: bv,
        }
    }

    #[test]
    fn test_valuation_formula() {
        let estimator = BuyPriceEstimator::default();
        // 100 * (1 + 25 / 10)
        assert_eq!(estimator.estimate(&metrics(500.0, 100.0, 25.0), &mut NoJitter), 350.0);
        assert_eq!(estimator.estimate(&metrics(500.0, 12.345, 10.0), &mut NoJitter), 24.69);
    }

    #[test]
    fn test_valuation_needs_positive_inputs() {
        let estimator = BuyPriceEstimator::default();
        assert_eq!(estimator.estimate(&metrics(500.0, 0.0, 25.0), &mut NoJitter), 0.0);
        assert_eq!(estimator.estimate(&metrics(500.0, 100.0, -4.0), &mut NoJitter), 0.0);
        assert_eq!(estimator.estimate(&metrics(0.0, 100.0, 25.0), &mut NoJitter), 0.0);
    }

    #[test]
    fn test_fixed_discount() {
        let estimator = BuyPriceEstimator::new(BuyPricePolicy::Discount {
            factor: 0.8,
            randomize: false,
        });
        assert_eq!(estimator.estimate(&metrics(250.0, 0.0, 0.0), &mut NoJitter), 200.0);
        assert_eq!(estimator.estimate(&metrics(-1.0, 0.0, 0.0), &mut NoJitter), 0.0);
    }

    #[test]
    fn test_randomized_discount_within_band() {
        let estimator = BuyPriceEstimator::new(BuyPricePolicy::Discount {
            factor: 0.85,
            randomize: true,
        });

        assert_eq!(estimator.estimate(&metrics(100.0, 0.0, 0.0), &mut NoJitter), 85.0);

        let mut source = SeededJitter::new(11);
        for _ in 0..50 {
            let price = estimator.estimate(&metrics(100.0, 0.0, 0.0), &mut source);
            assert!((80.0..=90.0).contains(&price), "price {} outside band", price);
        }
    }
}
