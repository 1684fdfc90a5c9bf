//! Ordering and rank assignment.

use super::ScoredInstrument;

/// Sort by normalized score descending, then symbol ascending, and assign
/// ranks `1..=N` in that order.
///
/// Equal scores still get distinct ranks; the symbol decides.
pub fn rank(mut scored: Vec<ScoredInstrument>) -> Vec<ScoredInstrument> {
    scored.sort_by(|a, b| {
        b.normalized_score
            .total_cmp(&a.normalized_score)
            .then_with(|| a.metrics.symbol.cmp(&b.metrics.symbol))
    });

    for (idx, instrument) in scored.iter_mut().enumerate() {
        instrument.rank = idx as u32 + 1;
    }

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Country, InstrumentMetrics};

    fn scored(symbol: &str, score: f64) -> ScoredInstrument {
        ScoredInstrument {
            metrics: InstrumentMetrics {
                symbol: symbol.into(),
                country: Country::Foreign,
                current_price: 1.0,
                return_on_equity: 0.0,
                return_on_assets: 0.0,
                price_to_earnings: 0.0,
                debt_to_equity: 0.0,
                book_value: 0.0,
            },
            raw_score: score,
            normalized_score: score,
            recommended_buy_price: 0.0,
            rank: 0,
        }
    }

    #[test]
    fn test_rank_descending() {
        let ranked = rank(vec![scored("A", 1.0), scored("B", 10.0), scored("C", 5.5)]);
        let order: Vec<_> = ranked.iter().map(|s| (s.symbol(), s.rank)).collect();
        assert_eq!(order, vec![("B", 1), ("C", 2), ("A", 3)]);
    }

    #[test]
    fn test_ties_broken_by_symbol() {
        let ranked = rank(vec![
            scored("MSFT", 7.0),
            scored("AAPL", 7.0),
            scored("TCS.NS", 9.0),
        ]);
        let order: Vec<_> = ranked.iter().map(|s| (s.symbol(), s.rank)).collect();
        assert_eq!(order, vec![("TCS.NS", 1), ("AAPL", 2), ("MSFT", 3)]);
    }

    #[test]
    fn test_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}
