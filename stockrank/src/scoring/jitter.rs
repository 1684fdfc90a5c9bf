//! Injectable randomness for score jitter and randomized discounts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform samples.
///
/// Everything random in scoring goes through this trait so tests and
/// seeded deployments get reproducible output.
pub trait JitterSource: Send {
    /// Uniform sample from the closed interval `[low, high]`.
    fn sample(&mut self, low: f64, high: f64) -> f64;
}

/// Always answers the interval midpoint: symmetric jitter is zero and a
/// randomized discount uses the centre factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn sample(&mut self, low: f64, high: f64) -> f64 {
        (low + high) / 2.0
    }
}

/// `StdRng`-backed source, reproducible when seeded.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl JitterSource for SeededJitter {
    fn sample(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}
