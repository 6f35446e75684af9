//! Reward function
//!
//! Maps an [`Outcome`] to a scalar in [0, 1]. Correctness and speed are folded
//! into a single number: failures score zero, successes score linearly from
//! 1.0 (instant) down to 0.0 at [`LATENCY_CEILING`] and beyond. The belief
//! store has no notion of a multi-dimensional reward, so this is the whole
//! signal the bandit learns from.

use std::time::Duration;

use super::types::Outcome;

/// Latency at which a successful response is worth nothing
pub const LATENCY_CEILING: Duration = Duration::from_secs(1);

/// Compute the reward for one outcome
pub fn compute_reward(outcome: &Outcome) -> f64 {
    if !outcome.status_is_success {
        return 0.0;
    }

    let elapsed = outcome.elapsed.as_secs_f64() / LATENCY_CEILING.as_secs_f64();
    (1.0 - elapsed).clamp(0.0, 1.0)
}
