//! Multiplicative cost jitter for preference-weighted matrices.
//!
//! Jitter breaks exact ties between otherwise identical edges. A seeded
//! strategy derives each edge's factor from `(seed, from, to)` alone, so the
//! same seed always yields the same matrix regardless of build order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces a multiplicative factor for the edge `from → to`.
pub trait JitterStrategy: Send + Sync {
    /// Factor applied to the edge cost; always `>= 1`.
    fn factor(&self, from: usize, to: usize) -> f64;
}

/// No jitter: every factor is exactly 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterStrategy for NoJitter {
    fn factor(&self, _from: usize, _to: usize) -> f64 {
        1.0
    }
}

/// Reproducible jitter in `[1, 1 + max_fraction)`.
///
/// # Examples
///
/// ```
/// use fleetflow::distance::{JitterStrategy, SeededJitter};
///
/// let a = SeededJitter::new(42, 0.2);
/// let b = SeededJitter::new(42, 0.2);
/// assert_eq!(a.factor(1, 2), b.factor(1, 2));
/// assert!(a.factor(1, 2) >= 1.0 && a.factor(1, 2) < 1.2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SeededJitter {
    seed: u64,
    max_fraction: f64,
}

impl SeededJitter {
    /// Creates a seeded jitter strategy.
    pub fn new(seed: u64, max_fraction: f64) -> Self {
        Self { seed, max_fraction }
    }
}

impl JitterStrategy for SeededJitter {
    fn factor(&self, from: usize, to: usize) -> f64 {
        let edge = ((from as u64) << 32) ^ (to as u64);
        let mut rng = StdRng::seed_from_u64(self.seed ^ edge.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        1.0 + rng.random::<f64>() * self.max_fraction
    }
}

/// Non-reproducible jitter drawn from the thread RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomJitter {
    max_fraction: f64,
}

impl RandomJitter {
    /// Creates a thread-RNG jitter strategy.
    pub fn new(max_fraction: f64) -> Self {
        Self { max_fraction }
    }
}

impl JitterStrategy for RandomJitter {
    fn factor(&self, _from: usize, _to: usize) -> f64 {
        1.0 + rand::rng().random::<f64>() * self.max_fraction
    }
}
