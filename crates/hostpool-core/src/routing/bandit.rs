//! Thompson Sampling selection policy
//!
//! Each host (arm) carries a Beta posterior over its expected reward. To pick
//! a host we draw once from every candidate's posterior and take the largest
//! draw.
//!
//! ## Algorithm Overview
//!
//! 1. For each host, maintain Beta(α, β) over its success probability
//! 2. Sample from each host's distribution: θ ~ Beta(α, β)
//! 3. Select the host with the highest sampled value
//! 4. Observe reward and update: α += reward, β += (1 - reward)
//!
//! Hosts with few observations have wide posteriors and occasionally win with
//! a high draw (exploration); hosts whose posteriors concentrate on a high
//! success probability win most draws (exploitation). There is no tunable
//! exploration parameter.

use tracing::trace;

use super::belief::BeliefStore;
use super::types::{Host, RoutingDecision};
use crate::error::{Error, Result};

/// Posterior standard deviation above which a choice counts as exploration
const EXPLORATION_UNCERTAINTY: f64 = 0.15;

/// Thompson Sampling policy over a [`BeliefStore`]
#[derive(Debug, Clone)]
pub struct ThompsonSamplingPolicy {
    /// Minimum observations before a host's statistics are trusted
    min_samples_for_trust: u64,
}

impl Default for ThompsonSamplingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ThompsonSamplingPolicy {
    /// Create a policy with default parameters
    pub fn new() -> Self {
        Self {
            min_samples_for_trust: 5,
        }
    }

    /// Set minimum observations for trust
    pub fn with_min_samples(mut self, min_samples: u64) -> Self {
        self.min_samples_for_trust = min_samples;
        self
    }

    /// Minimum observations before a host's statistics are trusted
    pub fn min_samples(&self) -> u64 {
        self.min_samples_for_trust
    }

    /// Select a host among `candidates`
    ///
    /// Draws exactly one sample per candidate, in order, and returns the host
    /// with the strictly greatest sample. When several hosts share the maximal
    /// draw the first one in `candidates` wins.
    pub fn select(&self, store: &BeliefStore, candidates: &[Host]) -> Result<RoutingDecision> {
        if candidates.is_empty() {
            return Err(Error::NoHosts);
        }

        let mut best: Option<&Host> = None;
        let mut best_sample = f64::NEG_INFINITY;

        for candidate in candidates {
            let sample = store.sample(candidate)?;
            trace!(host = %candidate, sample = sample, "Sampled host posterior");

            if best.is_none() || sample > best_sample {
                best_sample = sample;
                best = Some(candidate);
            }
        }

        let host = best.ok_or(Error::NoHosts)?.clone();
        let stats = store.stats(&host)?;
        let is_exploration = stats.belief.uncertainty() > EXPLORATION_UNCERTAINTY
            || stats.observations < self.min_samples_for_trust;

        Ok(RoutingDecision {
            host,
            sampled_value: best_sample,
            is_exploration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::sampler::{BetaSampler, RandBetaSampler};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Sampler that replays a fixed script of values
    struct ScriptedSampler(Mutex<Vec<f64>>);

    impl ScriptedSampler {
        fn new(mut values: Vec<f64>) -> Self {
            values.reverse();
            Self(Mutex::new(values))
        }
    }

    impl BetaSampler for ScriptedSampler {
        fn sample(&self, _alpha: f64, _beta: f64) -> f64 {
            self.0.lock().unwrap().pop().expect("script exhausted")
        }
    }

    fn hosts(names: &[&str]) -> Vec<Host> {
        names.iter().map(|n| Host::from(*n)).collect()
    }

    #[test]
    fn test_select_empty_candidates() {
        let store = BeliefStore::with_default_sampler(["a"]).unwrap();
        let err = ThompsonSamplingPolicy::new().select(&store, &[]).unwrap_err();
        assert!(matches!(err, Error::NoHosts));
    }

    #[test]
    fn test_select_single_candidate() {
        let store = BeliefStore::new(["only"], Arc::new(RandBetaSampler::with_seed(42))).unwrap();
        let policy = ThompsonSamplingPolicy::new();
        let candidates = hosts(&["only"]);

        for _ in 0..50 {
            let decision = policy.select(&store, &candidates).unwrap();
            assert_eq!(decision.host.as_str(), "only");
        }
    }

    #[test]
    fn test_select_picks_largest_sample() {
        let sampler = Arc::new(ScriptedSampler::new(vec![0.2, 0.9, 0.4]));
        let store = BeliefStore::new(["a", "b", "c"], sampler).unwrap();

        let decision = ThompsonSamplingPolicy::new()
            .select(&store, &hosts(&["a", "b", "c"]))
            .unwrap();
        assert_eq!(decision.host.as_str(), "b");
        assert_eq!(decision.sampled_value, 0.9);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let sampler = Arc::new(ScriptedSampler::new(vec![0.3, 0.7, 0.7, 0.7, 0.7, 0.7]));
        let store = BeliefStore::new(["a", "b", "c"], sampler).unwrap();
        let policy = ThompsonSamplingPolicy::new();

        let first = policy.select(&store, &hosts(&["a", "b", "c"])).unwrap();
        assert_eq!(first.host.as_str(), "b");

        let second = policy.select(&store, &hosts(&["c", "a", "b"])).unwrap();
        assert_eq!(second.host.as_str(), "c");
    }

    #[test]
    fn test_select_unknown_candidate() {
        let store = BeliefStore::with_default_sampler(["a"]).unwrap();
        let err = ThompsonSamplingPolicy::new()
            .select(&store, &hosts(&["a", "z"]))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownHost(h) if h == "z"));
    }

    #[test]
    fn test_select_stays_within_candidates() {
        let store =
            BeliefStore::new(["a", "b", "c", "d"], Arc::new(RandBetaSampler::with_seed(9))).unwrap();
        let policy = ThompsonSamplingPolicy::new();
        let subset = hosts(&["b", "d"]);

        for _ in 0..500 {
            let decision = policy.select(&store, &subset).unwrap();
            assert!(subset.contains(&decision.host));
        }
    }

    #[test]
    fn test_select_explores_uniform_priors() {
        let store =
            BeliefStore::new(["a", "b", "c"], Arc::new(RandBetaSampler::with_seed(42))).unwrap();
        let policy = ThompsonSamplingPolicy::new();
        let candidates = hosts(&["a", "b", "c"]);

        let mut selections: HashMap<String, u32> = HashMap::new();
        for _ in 0..100 {
            let decision = policy.select(&store, &candidates).unwrap();
            assert!(decision.is_exploration);
            *selections.entry(decision.host.to_string()).or_default() += 1;
        }

        assert_eq!(selections.len(), 3, "Expected every host to be explored");
    }

    #[test]
    fn test_update_affects_selection() {
        let store =
            BeliefStore::new(["a", "b", "c"], Arc::new(RandBetaSampler::with_seed(42))).unwrap();
        let policy = ThompsonSamplingPolicy::new();
        let candidates = hosts(&["a", "b", "c"]);

        for _ in 0..20 {
            store.update(&Host::from("a"), 1.0).unwrap();
            store.update(&Host::from("b"), 0.0).unwrap();
            store.update(&Host::from("c"), 0.3).unwrap();
        }

        let mut a_count = 0;
        let mut exploit_count = 0;
        for _ in 0..50 {
            let decision = policy.select(&store, &candidates).unwrap();
            if decision.host.as_str() == "a" {
                a_count += 1;
                if !decision.is_exploration {
                    exploit_count += 1;
                }
            }
        }

        assert!(
            a_count > 45,
            "Expected host a to be selected most often, got {} out of 50",
            a_count
        );
        assert_eq!(exploit_count, a_count);
    }
}
