//! Simple random number generator for reproducibility.
//!
//! This module provides a lightweight xorshift-based PRNG with a Gaussian
//! sampler for weight initialization. It doesn't require external
//! dependencies, so a fixed seed reproduces the same network on every
//! platform.

use std::time::{SystemTime, UNIX_EPOCH};

const FALLBACK_STATE: u64 = 0x9e3779b97f4a7c15;

/// Simple RNG for reproducibility without external crates.
///
/// Uses xorshift algorithm for fast, deterministic random number generation.
pub struct SimpleRng {
    state: u64,
    spare_gaussian: Option<f64>,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_STATE } else { seed };
        Self {
            state,
            spare_gaussian: None,
        }
    }

    /// Create an RNG from a signed seed; any negative seed (conventionally
    /// `-1`) selects a time-based, non-deterministic state.
    pub fn from_seed(seed: i64) -> Self {
        let mut rng = Self::new(seed.unsigned_abs());
        if seed < 0 {
            rng.reseed_from_time();
        }
        rng
    }

    /// Reseed based on the current time.
    pub fn reseed_from_time(&mut self) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.state = if nanos == 0 { FALLBACK_STATE } else { nanos };
        self.spare_gaussian = None;
    }

    /// Basic xorshift step.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform sample in [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Standard normal sample (Box-Muller, second value cached).
    pub fn next_gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare_gaussian.take() {
            return spare;
        }
        // 1 - u keeps the logarithm argument in (0, 1]
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        self.spare_gaussian = Some(radius * angle.sin());
        radius * angle.cos()
    }

    /// Normal sample with the given mean and standard deviation.
    pub fn gen_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.next_gaussian()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(42);
        let mut rng2 = SimpleRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_next_f64_range() {
        let mut rng = SimpleRng::new(12345);

        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!((0.0..1.0).contains(&val));
        }
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = SimpleRng::new(2024);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.gen_normal(0.0, 2.0)).collect();

        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.1, "mean {} too far from 0", mean);
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std {} too far from 2", var.sqrt());
    }

    #[test]
    fn test_positive_seed_is_reproducible() {
        let mut rng1 = SimpleRng::from_seed(7);
        let mut rng2 = SimpleRng::from_seed(7);
        assert_eq!(rng1.next_gaussian(), rng2.next_gaussian());
    }

    #[test]
    fn test_zero_seed_uses_fallback_state() {
        let mut rng = SimpleRng::new(0);
        assert_ne!(rng.next_u64(), 0);
    }
}
