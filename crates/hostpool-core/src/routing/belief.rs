//! Belief store: one Beta posterior per host
//!
//! The set of hosts is fixed when the store is built, so the host table itself
//! is immutable and needs no lock. Each host's record sits behind its own
//! mutex; `sample` copies the two shape parameters under that lock and draws
//! outside it, `update` applies both increments inside it. Selection counters
//! live in the same record so observability never needs a side table.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use super::sampler::{BetaSampler, RandBetaSampler};
use super::types::{Belief, Host, HostStats};
use crate::error::{Error, Result};

/// Per-host posteriors with their sampling source
pub struct BeliefStore {
    /// Hosts in construction order
    hosts: Arc<[Host]>,
    /// Per-host record, each under its own lock
    records: HashMap<Host, Mutex<HostStats>>,
    /// Random variate source for `sample`
    sampler: Arc<dyn BetaSampler>,
}

impl std::fmt::Debug for BeliefStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeliefStore")
            .field("hosts", &self.hosts)
            .finish_non_exhaustive()
    }
}

impl BeliefStore {
    /// Create a store with a uniform prior for every host
    ///
    /// Fails with [`Error::ConfigError`] when `hosts` is empty, contains a
    /// blank identifier, or lists the same host twice.
    pub fn new<I, H>(hosts: I, sampler: Arc<dyn BetaSampler>) -> Result<Self>
    where
        I: IntoIterator<Item = H>,
        H: Into<Host>,
    {
        let hosts: Vec<Host> = hosts.into_iter().map(Into::into).collect();
        validate_hosts(&hosts)?;

        let records = hosts
            .iter()
            .map(|host| (host.clone(), Mutex::new(HostStats::new(host.clone()))))
            .collect();

        info!(hosts = hosts.len(), "Initialized belief store");

        Ok(Self {
            hosts: hosts.into(),
            records,
            sampler,
        })
    }

    /// Create a store using an entropy-seeded [`RandBetaSampler`]
    pub fn with_default_sampler<I, H>(hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = H>,
        H: Into<Host>,
    {
        Self::new(hosts, Arc::new(RandBetaSampler::new()))
    }

    /// Hosts in construction order
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Shared handle to the host list
    pub fn shared_hosts(&self) -> Arc<[Host]> {
        Arc::clone(&self.hosts)
    }

    /// Whether `host` belongs to this store
    pub fn contains(&self, host: &Host) -> bool {
        self.records.contains_key(host)
    }

    /// Draw one value from the host's current posterior
    ///
    /// Does not modify the stored parameters.
    pub fn sample(&self, host: &Host) -> Result<f64> {
        let belief = self.belief(host)?;
        Ok(self
            .sampler
            .sample(belief.success_weight, belief.failure_weight))
    }

    /// Fold a reward into the host's posterior
    ///
    /// The reward is clamped to [0, 1]; NaN counts as 0.
    pub fn update(&self, host: &Host, reward: f64) -> Result<()> {
        let reward = clamp_reward(reward);
        let mut record = self.lock(host)?;

        record.belief.observe(reward);
        record.observations += 1;
        record.reward_sum += reward;

        debug!(
            host = %host,
            reward = reward,
            success_weight = record.belief.success_weight,
            failure_weight = record.belief.failure_weight,
            "Updated host belief"
        );
        Ok(())
    }

    /// Count one selection of `host` by the policy
    pub fn record_selection(&self, host: &Host) -> Result<()> {
        self.lock(host)?.selections += 1;
        Ok(())
    }

    /// Current posterior of a host
    pub fn belief(&self, host: &Host) -> Result<Belief> {
        Ok(self.lock(host)?.belief)
    }

    /// Current statistics of a host
    pub fn stats(&self, host: &Host) -> Result<HostStats> {
        Ok(self.lock(host)?.clone())
    }

    /// Statistics for every host, in construction order
    ///
    /// Each entry is internally consistent; entries are read one at a time.
    pub fn snapshot(&self) -> Vec<HostStats> {
        self.hosts
            .iter()
            .filter_map(|host| self.stats(host).ok())
            .collect()
    }

    /// Posterior mean for every host
    pub fn expected_values(&self) -> HashMap<String, f64> {
        self.snapshot()
            .into_iter()
            .map(|stats| (stats.host.to_string(), stats.belief.mean()))
            .collect()
    }

    fn lock(&self, host: &Host) -> Result<MutexGuard<'_, HostStats>> {
        let record = self
            .records
            .get(host)
            .ok_or_else(|| Error::UnknownHost(host.to_string()))?;
        // Every critical section leaves the record consistent, so a panic
        // elsewhere while holding the lock does not invalidate it.
        Ok(record.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn validate_hosts(hosts: &[Host]) -> Result<()> {
    if hosts.is_empty() {
        return Err(Error::ConfigError(
            "at least one host is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(hosts.len());
    for host in hosts {
        if host.as_str().trim().is_empty() {
            return Err(Error::ConfigError("host identifiers must not be blank".to_string()));
        }
        if !seen.insert(host) {
            return Err(Error::ConfigError(format!("duplicate host '{}'", host)));
        }
    }
    Ok(())
}

fn clamp_reward(reward: f64) -> f64 {
    if reward.is_nan() {
        return 0.0;
    }
    reward.clamp(0.0, 1.0)
}
