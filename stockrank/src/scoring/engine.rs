//! Composite score engine.
//!
//! Turns a batch of [`InstrumentMetrics`] into ranked [`ScoredInstrument`]s:
//!
//! 1. raw score: weighted sum of the five fundamentals
//! 2. normalization onto the configured range
//! 3. optional symmetric jitter
//! 4. clip to the range and round to one decimal
//! 5. buy price estimate, then ranking

use tracing::debug;

use stockrank_common::{NormalizationMethod, RankingConfig, ScoreRange, ScoreWeights};

use super::jitter::{JitterSource, SeededJitter};
use super::normalize::normalize;
use super::pricing::BuyPriceEstimator;
use super::{ranker, round_to, ScoredInstrument};
use crate::data::InstrumentMetrics;
use crate::error::RankError;

/// Weighted composite score. ROE, ROCE proxy and book value add; P/E and
/// debt/equity subtract.
pub fn raw_score(metrics: &InstrumentMetrics, weights: &ScoreWeights) -> f64 {
    weights.return_on_equity * metrics.return_on_equity
        + weights.return_on_assets * metrics.return_on_assets
        - weights.price_to_earnings * metrics.price_to_earnings
        - weights.debt_to_equity * metrics.debt_to_equity
        + weights.book_value * metrics.book_value
}

/// Builds the randomness source for one batch.
type SourceFactory = Box<dyn Fn() -> Box<dyn JitterSource> + Send + Sync>;

/// Scores and ranks whole batches.
pub struct ScoreEngine {
    weights: ScoreWeights,
    range: ScoreRange,
    method: NormalizationMethod,
    jitter: f64,
    estimator: BuyPriceEstimator,
    source: SourceFactory,
}

impl ScoreEngine {
    /// Create an engine from configuration.
    ///
    /// Every batch starts a fresh source: seeded from `jitter_seed` when
    /// set, so identical batches score identically; from entropy otherwise.
    pub fn new(config: &RankingConfig) -> Self {
        let source: SourceFactory = match config.jitter_seed {
            Some(seed) => Box::new(move || -> Box<dyn JitterSource> {
                Box::new(SeededJitter::new(seed))
            }),
            None => Box::new(|| -> Box<dyn JitterSource> { Box::new(SeededJitter::from_entropy()) }),
        };

        Self {
            weights: config.weights,
            range: config.score_range,
            method: config.normalization,
            jitter: config.jitter.unwrap_or(0.0),
            estimator: BuyPriceEstimator::new(config.buy_price),
            source,
        }
    }

    /// Replace the randomness source. Each batch samples from a fresh clone
    /// of `source`.
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: JitterSource + Clone + Sync + 'static,
    {
        self.source = Box::new(move || -> Box<dyn JitterSource> { Box::new(source.clone()) });
        self
    }

    pub fn range(&self) -> ScoreRange {
        self.range
    }

    pub fn method(&self) -> NormalizationMethod {
        self.method
    }

    /// Score, price and rank a batch.
    ///
    /// Output is sorted by rank. An empty batch is an error, never an empty
    /// success.
    pub fn score_batch(
        &self,
        records: Vec<InstrumentMetrics>,
    ) -> Result<Vec<ScoredInstrument>, RankError> {
        if records.is_empty() {
            return Err(RankError::EmptyBatch {
                attempted: 0,
                dropped: Vec::new(),
            });
        }

        let raw: Vec<f64> = records
            .iter()
            .map(|m| raw_score(m, &self.weights))
            .collect();
        let normalized = normalize(&raw, self.method, self.range);

        let mut source = (self.source)();
        let scored: Vec<ScoredInstrument> = records
            .into_iter()
            .zip(raw.into_iter().zip(normalized))
            .map(|(metrics, (raw_score, normalized))| {
                let jittered = if self.jitter > 0.0 {
                    normalized + source.sample(-self.jitter, self.jitter)
                } else {
                    normalized
                };
                let recommended_buy_price = self.estimator.estimate(&metrics, source.as_mut());

                ScoredInstrument {
                    metrics,
                    raw_score,
                    normalized_score: self.finalize(jittered),
                    recommended_buy_price,
                    rank: 0,
                }
            })
            .collect();

        debug!(
            count = scored.len(),
            method = ?self.method,
            jitter = self.jitter,
            "Scored batch"
        );

        Ok(ranker::rank(scored))
    }

    /// Clip, round to one decimal, and clip again for ranges whose bounds
    /// carry more than one decimal.
    fn finalize(&self, score: f64) -> f64 {
        self.range.clip(round_to(self.range.clip(score), 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Country;
    use crate::scoring::NoJitter;
    use proptest::prelude::*;
    use stockrank_common::BuyPricePolicy;

    fn metrics(symbol: &str, roe: f64, pe: f64, bv: f64) -> InstrumentMetrics {
        InstrumentMetrics {
            symbol: symbol.into(),
            country: Country::classify(symbol, &[".NS".to_string()]),
            current_price: 100.0,
            return_on_equity: roe,
            return_on_assets: 0.0,
            price_to_earnings: pe,
            debt_to_equity: 0.0,
            book_value: bv,
        }
    }

    /// Weights that make raw score equal book value.
    fn book_value_only() -> RankingConfig {
        RankingConfig {
            weights: ScoreWeights {
                return_on_equity: 0.0,
                return_on_assets: 0.0,
                price_to_earnings: 0.0,
                debt_to_equity: 0.0,
                book_value: 1.0,
            },
            ..RankingConfig::default()
        }
    }

    #[test]
    fn test_raw_score_signs() {
        let weights = ScoreWeights::default();
        let m = InstrumentMetrics {
            symbol: "X".into(),
            country: Country::Foreign,
            current_price: 10.0,
            return_on_equity: 1.0,
            return_on_assets: 1.0,
            price_to_earnings: 1.0,
            debt_to_equity: 1.0,
            book_value: 1.0,
        };
        // 0.30 + 0.25 - 0.20 - 0.15 + 0.10
        assert!((raw_score(&m, &weights) - 0.30).abs() < 1e-12);

        let mut higher_pe = m.clone();
        higher_pe.price_to_earnings = 50.0;
        assert!(raw_score(&higher_pe, &weights) < raw_score(&m, &weights));
    }

    #[test]
    fn test_three_record_batch() {
        let engine = ScoreEngine::new(&book_value_only()).with_source(NoJitter);
        let scored = engine
            .score_batch(vec![
                metrics("A", 0.0, 0.0, 10.0),
                metrics("B", 0.0, 0.0, 20.0),
                metrics("C", 0.0, 0.0, 30.0),
            ])
            .unwrap();

        let view: Vec<_> = scored
            .iter()
            .map(|s| (s.symbol(), s.normalized_score, s.rank))
            .collect();
        assert_eq!(view, vec![("C", 10.0, 1), ("B", 5.5, 2), ("A", 1.0, 3)]);
        assert_eq!(scored[0].raw_score, 30.0);
    }

    #[test]
    fn test_all_equal_batch_gets_midpoint() {
        let engine = ScoreEngine::new(&RankingConfig::default()).with_source(NoJitter);
        let scored = engine
            .score_batch(vec![
                metrics("MSFT", 0.2, 30.0, 10.0),
                metrics("AAPL", 0.2, 30.0, 10.0),
            ])
            .unwrap();

        assert!(scored.iter().all(|s| s.normalized_score == 5.5));
        assert_eq!(scored[0].symbol(), "AAPL");
        assert_eq!(scored[0].rank, 1);
        assert_eq!(scored[1].rank, 2);
    }

    #[test]
    fn test_empty_batch_is_error() {
        let engine = ScoreEngine::new(&RankingConfig::default());
        assert!(matches!(
            engine.score_batch(Vec::new()),
            Err(RankError::EmptyBatch { attempted: 0, .. })
        ));
    }

    #[test]
    fn test_buy_price_attached() {
        let config = RankingConfig {
            buy_price: BuyPricePolicy::Valuation,
            ..book_value_only()
        };
        let engine = ScoreEngine::new(&config).with_source(NoJitter);
        let scored = engine
            .score_batch(vec![metrics("INFY.NS", 0.3, 20.0, 100.0)])
            .unwrap();

        assert_eq!(scored[0].recommended_buy_price, 300.0);
        assert_eq!(scored[0].metrics.country, Country::Domestic);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let config = RankingConfig {
            jitter: Some(0.5),
            jitter_seed: Some(1234),
            ..RankingConfig::default()
        };
        let batch = || {
            vec![
                metrics("A", 0.1, 12.0, 50.0),
                metrics("B", 0.4, 30.0, 80.0),
                metrics("C", 0.2, 8.0, 20.0),
            ]
        };

        let first = ScoreEngine::new(&config).score_batch(batch()).unwrap();
        let second = ScoreEngine::new(&config).score_batch(batch()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_seeded_engine_repeats_across_batches() {
        let config = RankingConfig {
            jitter: Some(0.5),
            jitter_seed: Some(1234),
            ..RankingConfig::default()
        };
        let batch = || {
            vec![
                metrics("A", 0.1, 12.0, 50.0),
                metrics("B", 0.4, 30.0, 80.0),
                metrics("C", 0.2, 8.0, 20.0),
            ]
        };

        let engine = ScoreEngine::new(&config);
        let first = engine.score_batch(batch()).unwrap();
        let second = engine.score_batch(batch()).unwrap();
        let third = engine.score_batch(batch()).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_fixed_offset_method() {
        let config = RankingConfig {
            normalization: NormalizationMethod::FixedOffset,
            ..book_value_only()
        };
        let engine = ScoreEngine::new(&config).with_source(NoJitter);
        let scored = engine
            .score_batch(vec![metrics("A", 0.0, 0.0, 1.25), metrics("B", 0.0, 0.0, 40.0)])
            .unwrap();

        assert_eq!(scored[0].normalized_score, 10.0);
        assert_eq!(scored[1].normalized_score, 6.3);
    }

    fn arb_metrics() -> impl Strategy<Value = InstrumentMetrics> {
        (
            0.0..1e4f64,
            -5.0..5.0f64,
            -5.0..5.0f64,
            -100.0..500.0f64,
            0.0..400.0f64,
            -1e3..1e4f64,
        )
            .prop_map(|(price, roe, roa, pe, de, bv)| InstrumentMetrics {
                symbol: String::new(),
                country: Country::Foreign,
                current_price: price,
                return_on_equity: roe,
                return_on_assets: roa,
                price_to_earnings: pe,
                debt_to_equity: de,
                book_value: bv,
            })
    }

    proptest! {
        #[test]
        fn prop_scores_within_range_and_ranks_contiguous(
            batch in prop::collection::vec(arb_metrics(), 1..40),
            jitter in prop::option::of(0.0..3.0f64),
            seed in any::<u64>(),
        ) {
            let config = RankingConfig {
                jitter,
                jitter_seed: Some(seed),
                ..RankingConfig::default()
            };
            let records: Vec<_> = batch
                .into_iter()
                .enumerate()
                .map(|(i, mut m)| {
                    m.symbol = format!("S{:03}", i);
                    m
                })
                .collect();
            let n = records.len();

            let scored = ScoreEngine::new(&config).score_batch(records).unwrap();
            prop_assert_eq!(scored.len(), n);

            for (idx, s) in scored.iter().enumerate() {
                prop_assert!((1.0..=10.0).contains(&s.normalized_score));
                prop_assert!(s.recommended_buy_price >= 0.0);
                prop_assert_eq!(s.rank as usize, idx + 1);
            }
            for pair in scored.windows(2) {
                prop_assert!(pair[0].normalized_score >= pair[1].normalized_score);
            }
        }
    }
}
