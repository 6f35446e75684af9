//! Host Router - adaptive request routing with Thompson sampling
//!
//! The router ties the pieces together for one request:
//! - the selection policy picks a host from the belief store
//! - the injected [`Transport`] performs the call against that host
//! - the elapsed time and status become an [`Outcome`] and a reward
//! - the reward is written back to the belief store exactly once
//!
//! Transport failures, timeouts and cancelled requests all count as
//! non-success outcomes so a host that starts failing loses credit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::bandit::ThompsonSamplingPolicy;
use super::belief::BeliefStore;
use super::sampler::{BetaSampler, RandBetaSampler};
use super::types::{Host, HostStats, Outcome};
use crate::config::Config;
use crate::error::{Error, Result};

/// Capability that performs the actual call against a chosen host
///
/// Implementations rewrite the request's target to `host` and leave
/// everything else untouched.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Request as supplied by the caller
    type Request: Send;
    /// Response returned to the caller
    type Response: Send;
    /// Transport failure, passed through to the caller
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send `request` to `host`
    async fn send(
        &self,
        request: Self::Request,
        host: &Host,
    ) -> std::result::Result<Self::Response, Self::Error>;

    /// Whether a response counts as a successful outcome
    fn is_success(&self, response: &Self::Response) -> bool;
}

/// Configuration for the host router
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Minimum observations before a host's statistics are trusted
    pub min_samples_for_trust: u64,
    /// Upper bound on a single transport call
    pub request_timeout: Option<Duration>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_samples_for_trust: 5,
            request_timeout: None,
        }
    }
}

impl RouterConfig {
    /// Router settings from the persisted configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_samples_for_trust: config.pool.min_samples_for_trust,
            request_timeout: config.http.timeout(),
        }
    }
}

/// Router that learns which hosts answer well
pub struct HostRouter<T: Transport> {
    /// Configuration
    config: RouterConfig,
    /// Hosts in construction order
    hosts: Arc<[Host]>,
    /// Per-host posteriors and counters
    store: BeliefStore,
    /// Thompson Sampling policy
    policy: ThompsonSamplingPolicy,
    /// Injected transport
    transport: T,
}

impl<T: Transport> HostRouter<T> {
    /// Create a router over `hosts` with default configuration
    ///
    /// Fails with [`Error::ConfigError`] when `hosts` is empty.
    pub fn new<I, H>(hosts: I, transport: T) -> Result<Self>
    where
        I: IntoIterator<Item = H>,
        H: Into<Host>,
    {
        HostRouterBuilder::new().hosts(hosts).transport(transport).build()
    }

    /// Start building a router
    pub fn builder() -> HostRouterBuilder<T> {
        HostRouterBuilder::new()
    }

    /// Route a request to the best-looking host
    pub async fn route(&self, request: T::Request) -> Result<T::Response> {
        self.route_within(request, &self.hosts).await
    }

    /// Route a request to one of `candidates`
    ///
    /// Fails with [`Error::NoHosts`] when `candidates` is empty and with
    /// [`Error::UnknownHost`] when a candidate is not part of this router.
    pub async fn route_within(
        &self,
        request: T::Request,
        candidates: &[Host],
    ) -> Result<T::Response> {
        let decision = self.policy.select(&self.store, candidates)?;
        self.store.record_selection(&decision.host)?;

        debug!(
            host = %decision.host,
            sampled_value = decision.sampled_value,
            is_exploration = decision.is_exploration,
            "Selected host for request"
        );

        let pending = PendingOutcome::start(&self.store, decision.host.clone());
        let call = self.transport.send(request, &decision.host);

        let result = match self.config.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(sent) => sent.map_err(Error::transport),
                Err(_) => Err(Error::Timeout(limit)),
            },
            None => call.await.map_err(Error::transport),
        };

        let success = matches!(&result, Ok(response) if self.transport.is_success(response));
        let outcome = pending.settle(success)?;

        match &result {
            Ok(_) => debug!(
                host = %outcome.host,
                success = success,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Recorded routing outcome"
            ),
            Err(e) => warn!(
                host = %outcome.host,
                error = %e,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Request failed"
            ),
        }

        result
    }

    /// Hosts in construction order
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Statistics for every host
    pub fn stats(&self) -> Vec<HostStats> {
        self.store.snapshot()
    }

    /// Posterior mean for every host
    pub fn expected_values(&self) -> std::collections::HashMap<String, f64> {
        self.store.expected_values()
    }

    /// The belief store backing this router
    pub fn store(&self) -> &BeliefStore {
        &self.store
    }

    /// The injected transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the current configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

/// An in-flight request whose outcome has not been written back yet
///
/// If dropped before [`settle`](Self::settle) (the route future was
/// cancelled), it records a failure so every selection gets one update.
struct PendingOutcome<'a> {
    store: &'a BeliefStore,
    host: Host,
    started: Instant,
    settled: bool,
}

impl<'a> PendingOutcome<'a> {
    fn start(store: &'a BeliefStore, host: Host) -> Self {
        Self {
            store,
            host,
            started: Instant::now(),
            settled: false,
        }
    }

    fn outcome(&self, success: bool) -> Outcome {
        let elapsed = self.started.elapsed();
        if success {
            Outcome::success(self.host.clone(), elapsed)
        } else {
            Outcome::failure(self.host.clone(), elapsed)
        }
    }

    fn settle(mut self, success: bool) -> Result<Outcome> {
        self.settled = true;
        let outcome = self.outcome(success);
        self.store.update(&outcome.host, outcome.reward())?;
        Ok(outcome)
    }
}

impl Drop for PendingOutcome<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let outcome = self.outcome(false);
        warn!(
            host = %outcome.host,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Request cancelled before completion"
        );
        if let Err(e) = self.store.update(&outcome.host, outcome.reward()) {
            warn!(host = %outcome.host, error = %e, "Failed to record cancelled request");
        }
    }
}

/// Builder for HostRouter
pub struct HostRouterBuilder<T> {
    config: RouterConfig,
    hosts: Vec<Host>,
    transport: Option<T>,
    sampler: Option<Arc<dyn BetaSampler>>,
}

impl<T: Transport> Default for HostRouterBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> HostRouterBuilder<T> {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            hosts: Vec::new(),
            transport: None,
            sampler: None,
        }
    }

    /// Set configuration
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the host list
    pub fn hosts<I, H>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<Host>,
    {
        self.hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the transport
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the Beta sampler
    pub fn sampler(mut self, sampler: Arc<dyn BetaSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Use a seeded sampler (for reproducible runs)
    pub fn seed(self, seed: u64) -> Self {
        self.sampler(Arc::new(RandBetaSampler::with_seed(seed)))
    }

    /// Set per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Build the router
    pub fn build(self) -> Result<HostRouter<T>> {
        let transport = self
            .transport
            .ok_or_else(|| Error::ConfigError("a transport is required".to_string()))?;
        let sampler = self
            .sampler
            .unwrap_or_else(|| Arc::new(RandBetaSampler::new()));

        let store = BeliefStore::new(self.hosts, sampler)?;
        let policy =
            ThompsonSamplingPolicy::new().with_min_samples(self.config.min_samples_for_trust);

        info!(
            hosts = store.hosts().len(),
            request_timeout = ?self.config.request_timeout,
            "Created host router"
        );

        Ok(HostRouter {
            config: self.config,
            hosts: store.shared_hosts(),
            store,
            policy,
            transport,
        })
    }
}
