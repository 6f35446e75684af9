//! In-process simulated backends
//!
//! Each backend answers after a fixed latency and fails with a fixed
//! probability. No sockets are opened, which makes the bandit's behaviour
//! easy to observe and reproduce.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use hostpool_core::routing::{Host, Transport};
use rand::prelude::*;

/// One simulated backend, parsed from `NAME:LATENCY_MS[:FAILURE_RATE]`
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSpec {
    pub name: String,
    pub latency: Duration,
    pub failure_rate: f64,
}

impl FromStr for BackendSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (name, latency, failure_rate) = match parts.as_slice() {
            [name, latency] => (*name, *latency, None),
            [name, latency, rate] => (*name, *latency, Some(*rate)),
            _ => {
                return Err(format!(
                    "Invalid backend '{}': expected NAME:LATENCY_MS[:FAILURE_RATE]",
                    s
                ));
            }
        };

        if name.trim().is_empty() {
            return Err(format!("Invalid backend '{}': name must not be empty", s));
        }
        let latency_ms: u64 = latency
            .parse()
            .map_err(|_| format!("Invalid latency in '{}': {}", s, latency))?;
        let failure_rate = match failure_rate {
            Some(rate) => rate
                .parse::<f64>()
                .ok()
                .filter(|r| (0.0..=1.0).contains(r))
                .ok_or_else(|| format!("Invalid failure rate in '{}': must be within 0..=1", s))?,
            None => 0.0,
        };

        Ok(Self {
            name: name.to_string(),
            latency: Duration::from_millis(latency_ms),
            failure_rate,
        })
    }
}

/// Error returned by a simulated backend
#[derive(Debug, thiserror::Error)]
pub enum SimulatedError {
    #[error("backend {0} failed")]
    BackendFailed(String),
    #[error("no simulated backend named {0}")]
    UnknownBackend(String),
}

/// Response of a simulated backend
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedResponse {
    pub backend: String,
    pub request_id: usize,
}

/// [`Transport`] over a fixed set of simulated backends
pub struct SimulatedTransport {
    backends: HashMap<Host, BackendSpec>,
    rng: Mutex<StdRng>,
}

impl SimulatedTransport {
    /// Create backends with an optional seed for failure draws
    pub fn new(specs: &[BackendSpec], seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            backends: specs
                .iter()
                .map(|spec| (Host::new(spec.name.clone()), spec.clone()))
                .collect(),
            rng: Mutex::new(rng),
        }
    }

    fn fails(&self, failure_rate: f64) -> bool {
        if failure_rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_bool(failure_rate)
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    type Request = usize;
    type Response = SimulatedResponse;
    type Error = SimulatedError;

    async fn send(&self, request_id: usize, host: &Host) -> Result<SimulatedResponse, SimulatedError> {
        let spec = self
            .backends
            .get(host)
            .ok_or_else(|| SimulatedError::UnknownBackend(host.to_string()))?;

        tokio::time::sleep(spec.latency).await;

        if self.fails(spec.failure_rate) {
            return Err(SimulatedError::BackendFailed(spec.name.clone()));
        }
        Ok(SimulatedResponse {
            backend: spec.name.clone(),
            request_id,
        })
    }

    fn is_success(&self, _response: &SimulatedResponse) -> bool {
        true
    }
}
