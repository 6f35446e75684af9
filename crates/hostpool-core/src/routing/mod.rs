//! Adaptive host routing with Thompson sampling
//!
//! This module learns which backend hosts answer best from live traffic.
//! The key components are:
//!
//! - **Belief Store**: one Beta posterior per host, updated from rewards,
//!   plus per-host selection counters kept under the same lock.
//!
//! - **Thompson Sampling Policy**: draws once from every host's posterior and
//!   picks the largest draw, balancing exploration (uncertain hosts) with
//!   exploitation (hosts with proven results).
//!
//! - **Reward Function**: turns status and latency into a reward in [0, 1].
//!
//! - **Host Router**: selects a host, delegates the call to an injected
//!   transport, and writes the reward back.
//!
//! ## How It Works
//!
//! 1. The router asks the policy for a host among its candidates
//! 2. The transport sends the request to that host
//! 3. Status and elapsed time are turned into a reward
//! 4. The reward updates the chosen host's posterior, even on failure
//!
//! ## Example
//!
//! ```rust,ignore
//! use hostpool_core::routing::HostRouter;
//!
//! let router = HostRouter::new(["10.0.0.1:80", "10.0.0.2:80"], transport)?;
//! let response = router.route(request).await?;
//!
//! for stats in router.stats() {
//!     println!("{}: {} requests", stats.host, stats.selections);
//! }
//! ```

mod bandit;
mod belief;
mod reward;
mod router;
mod sampler;
mod types;

pub use bandit::ThompsonSamplingPolicy;
pub use belief::BeliefStore;
pub use reward::{LATENCY_CEILING, compute_reward};
pub use router::{HostRouter, HostRouterBuilder, RouterConfig, Transport};
pub use sampler::{BetaSampler, RandBetaSampler};
pub use types::{Belief, Host, HostStats, Outcome, RoutingDecision};
