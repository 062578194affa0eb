//! Randomness capability used by every stochastic operator.
//!
//! The engine only needs two primitives: a uniform draw in `[0, 1)` and a
//! bounded integer draw. [`RandomSource`] captures exactly that, so any
//! [`rand::Rng`] works out of the box and tests can substitute scripted
//! sources. Determinism of a run follows from the seed of the source alone.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Narrow randomness interface consumed by the engine.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform integer in `[0, n)`. `n` must be non-zero.
    fn below(&mut self, n: usize) -> usize;

    /// Bernoulli trial. `p <= 0` never fires and `p >= 1` always fires
    /// without consuming a draw.
    fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.next_f64() < p
    }

    /// Uniform real in `[min, max)`; returns `min` for an empty range.
    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        (max - min).mul_add(self.next_f64(), min)
    }

    /// Uniformly chosen element, or `None` for an empty slice.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            None
        } else {
            items.get(self.below(items.len()))
        }
    }
}

impl<R: Rng> RandomSource for R {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        self.random::<f64>()
    }

    #[inline]
    fn below(&mut self, n: usize) -> usize {
        self.random_range(0..n)
    }
}

/// Seeded generator used by the demos and tests for reproducible runs.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Scripted randomness for exercising exact operator paths in unit tests.
#[cfg(test)]
pub(crate) mod scripted {
    use super::RandomSource;

    /// Replays a fixed sequence of uniform draws, wrapping around at the end.
    /// `below(n)` maps the next draw onto `[0, n)`.
    pub(crate) struct Scripted {
        pub(crate) draws: Vec<f64>,
        pub(crate) pos: usize,
    }

    impl Scripted {
        pub(crate) fn new(draws: &[f64]) -> Self {
            Self {
                draws: draws.to_vec(),
                pos: 0,
            }
        }
    }

    impl RandomSource for Scripted {
        fn next_f64(&mut self) -> f64 {
            let v = self.draws[self.pos % self.draws.len()];
            self.pos += 1;
            v
        }

        fn below(&mut self, n: usize) -> usize {
            ((self.next_f64() * n as f64) as usize).min(n - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::scripted::Scripted;
    use super::*;

    #[test]
    fn test_chance_edges_do_not_consume() {
        let mut src = Scripted::new(&[0.5]);
        assert!(!src.chance(0.0));
        assert!(src.chance(1.0));
        assert_eq!(src.pos, 0);
        assert!(src.chance(0.6));
        assert!(!src.chance(0.4));
        assert_eq!(src.pos, 2);
    }

    #[test]
    fn test_uniform_bounds() {
        let mut src = Scripted::new(&[0.0, 0.5, 0.999]);
        assert!((src.uniform(-1.0, 1.0) - -1.0).abs() < 1e-12);
        assert!(src.uniform(-1.0, 1.0).abs() < 1e-12);
        assert!(src.uniform(-1.0, 1.0) < 1.0);
        assert!((src.uniform(2.0, 2.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pick() {
        let mut rng = seeded_rng(7);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        let items = [1, 2, 3];
        for _ in 0..20 {
            assert!(items.contains(rng.pick(&items).unwrap()));
        }
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let mut a = seeded_rng(42);
        let mut b = seeded_rng(42);
        for _ in 0..10 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
            assert_eq!(a.below(17), b.below(17));
        }
    }
}
