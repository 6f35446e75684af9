//! Hostpool Core Library
//!
//! This crate provides the adaptive host-selection engine behind Hostpool:
//! - Belief store with one Beta posterior per backend host
//! - Thompson sampling selection policy
//! - Latency-aware reward function
//! - Host router that learns from every request outcome
//! - Configuration with file persistence

pub mod config;
pub mod error;
pub mod routing;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::routing::{Host, HostRouter, HostStats, Transport};
}
