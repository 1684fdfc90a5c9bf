//! Raw score to output range mapping.
//!
//! `min_max` and `rank` are batch-relative: a record's normalized score
//! depends on the other records in the same batch. `fixed_offset` is not.

use stockrank_common::{NormalizationMethod, ScoreRange};

/// Map raw scores onto `range`, preserving input order.
pub fn normalize(raw: &[f64], method: NormalizationMethod, range: ScoreRange) -> Vec<f64> {
    match method {
        NormalizationMethod::MinMax => min_max(raw, range),
        NormalizationMethod::Rank => rank_positions(raw, range),
        NormalizationMethod::FixedOffset => fixed_offset(raw, range),
    }
}

fn min_max(raw: &[f64], range: ScoreRange) -> Vec<f64> {
    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spread = max - min;

    // Covers empty, single-record and all-equal batches
    if spread <= 0.0 {
        return vec![range.midpoint(); raw.len()];
    }

    raw.iter()
        .map(|r| range.low + (r - min) * range.span() / spread)
        .collect()
}

fn rank_positions(raw: &[f64], range: ScoreRange) -> Vec<f64> {
    let n = raw.len();
    if n < 2 {
        return vec![range.midpoint(); n];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]));

    let mut positions = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && raw[order[end]] == raw[order[start]] {
            end += 1;
        }
        // Ties share the mean of the positions they occupy
        let shared = (start + end - 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            positions[idx] = shared;
        }
        start = end;
    }

    let last = (n - 1) as f64;
    positions
        .into_iter()
        .map(|p| range.low + p * range.span() / last)
        .collect()
}

fn fixed_offset(raw: &[f64], range: ScoreRange) -> Vec<f64> {
    raw.iter().map(|r| range.clip(r + 5.0)).collect()
}
