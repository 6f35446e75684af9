//! Beta-distributed random variates
//!
//! Thompson sampling needs one draw from each host's posterior per decision.
//! The draw is behind the [`BetaSampler`] trait so tests can substitute a
//! seeded or fully scripted source.

use std::sync::{Mutex, PoisonError};

use rand::prelude::*;
use rand_distr::{Beta, Distribution};

/// Source of Beta(alpha, beta) samples
pub trait BetaSampler: Send + Sync {
    /// Draw one value in [0, 1] from Beta(alpha, beta)
    fn sample(&self, alpha: f64, beta: f64) -> f64;
}

/// [`BetaSampler`] backed by `rand_distr::Beta` and a standard RNG
#[derive(Debug)]
pub struct RandBetaSampler {
    rng: Mutex<StdRng>,
}

impl Default for RandBetaSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl RandBetaSampler {
    /// Create a sampler seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a sampler with a fixed seed (for reproducibility in tests)
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl BetaSampler for RandBetaSampler {
    fn sample(&self, alpha: f64, beta: f64) -> f64 {
        let dist = match Beta::new(alpha, beta) {
            Ok(dist) => dist,
            Err(_) => return fallback_mean(alpha, beta),
        };

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        dist.sample(&mut *rng)
    }
}

/// Mean of the distribution for parameters `Beta::new` rejects
fn fallback_mean(alpha: f64, beta: f64) -> f64 {
    if !(alpha.is_finite() && beta.is_finite()) || alpha <= 0.0 || beta <= 0.0 {
        return 0.5;
    }
    (alpha / (alpha + beta)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_samplers_agree() {
        let a = RandBetaSampler::with_seed(7);
        let b = RandBetaSampler::with_seed(7);

        for _ in 0..32 {
            assert_eq!(a.sample(2.0, 3.0), b.sample(2.0, 3.0));
        }
    }

    #[test]
    fn test_samples_are_probabilities() {
        let sampler = RandBetaSampler::with_seed(42);
        for _ in 0..1000 {
            let x = sampler.sample(1.0, 1.0);
            assert!((0.0..=1.0).contains(&x), "sample out of range: {}", x);
        }
    }

    #[test]
    fn test_sample_mean_tracks_parameters() {
        // alpha=28, beta=2 -> mean ~0.93
        let sampler = RandBetaSampler::with_seed(3);
        let n = 2000;
        let mean: f64 = (0..n).map(|_| sampler.sample(28.0, 2.0)).sum::<f64>() / n as f64;
        assert!(mean > 0.88 && mean < 0.98, "unexpected mean {}", mean);
    }

    #[test]
    fn test_invalid_parameters_do_not_panic() {
        let sampler = RandBetaSampler::with_seed(1);
        assert_eq!(sampler.sample(0.0, 0.0), 0.5);
        assert_eq!(sampler.sample(-1.0, 2.0), 0.5);
        assert_eq!(sampler.sample(f64::NAN, 1.0), 0.5);
    }
}
