//! Types for adaptive host routing
//!
//! This module defines the values that flow between the belief store, the
//! selection policy and the router.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of a backend host (usually `address:port`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    /// Create a host identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Host {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Host {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for Host {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Beta posterior over "this host yields a good outcome"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    /// Accumulated reward (Beta alpha)
    pub success_weight: f64,
    /// Accumulated complement of reward (Beta beta)
    pub failure_weight: f64,
}

impl Default for Belief {
    fn default() -> Self {
        Self::uniform()
    }
}

impl Belief {
    /// Uninformed prior (Beta(1,1) = uniform distribution)
    pub fn uniform() -> Self {
        Self {
            success_weight: 1.0,
            failure_weight: 1.0,
        }
    }

    /// Fold one reward into the posterior
    ///
    /// Callers are expected to pass a reward already clamped to [0, 1].
    pub(crate) fn observe(&mut self, reward: f64) {
        self.success_weight += reward;
        self.failure_weight += 1.0 - reward;
    }

    /// Expected value of the distribution
    pub fn mean(&self) -> f64 {
        self.success_weight / (self.success_weight + self.failure_weight)
    }

    /// Standard deviation of the distribution
    pub fn uncertainty(&self) -> f64 {
        let ab = self.success_weight + self.failure_weight;
        ((self.success_weight * self.failure_weight) / (ab * ab * (ab + 1.0))).sqrt()
    }
}

/// Snapshot of one host's belief and bookkeeping counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    /// The host these statistics describe
    pub host: Host,
    /// Current posterior
    pub belief: Belief,
    /// Number of times the policy chose this host
    pub selections: u64,
    /// Number of outcomes folded into the belief
    pub observations: u64,
    /// Sum of applied rewards
    pub reward_sum: f64,
}

impl HostStats {
    /// Fresh statistics with the uniform prior
    pub fn new(host: Host) -> Self {
        Self {
            host,
            belief: Belief::uniform(),
            selections: 0,
            observations: 0,
            reward_sum: 0.0,
        }
    }

    /// Average applied reward (prior expectation when nothing was observed)
    pub fn mean_reward(&self) -> f64 {
        if self.observations == 0 {
            return 0.5;
        }
        self.reward_sum / self.observations as f64
    }
}

/// Result of one request, as seen by the router
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Host that served (or failed to serve) the request
    pub host: Host,
    /// Whether the response had a success status
    pub status_is_success: bool,
    /// Wall-clock time spent on the call
    pub elapsed: Duration,
}

impl Outcome {
    /// A successful response after `elapsed`
    pub fn success(host: Host, elapsed: Duration) -> Self {
        Self {
            host,
            status_is_success: true,
            elapsed,
        }
    }

    /// A failed response or transport error after `elapsed`
    pub fn failure(host: Host, elapsed: Duration) -> Self {
        Self {
            host,
            status_is_success: false,
            elapsed,
        }
    }

    /// Reward for this outcome
    pub fn reward(&self) -> f64 {
        super::reward::compute_reward(self)
    }
}

/// Result of a Thompson-sampling selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected host
    pub host: Host,
    /// Sample that won the selection
    pub sampled_value: f64,
    /// Whether the winner's posterior was still wide when it was chosen
    pub is_exploration: bool,
}
