//! Error types for Hostpool

use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by a transport, preserved as-is for the caller.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using Hostpool's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Hostpool error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Transport errors (E100-E199)
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Routing errors (E1100-E1199)
    #[error("No hosts available to route to")]
    NoHosts,

    #[error("Host '{0}' is not part of this pool")]
    UnknownHost(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a transport failure without altering it
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(err))
    }

    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E100",
            Self::Timeout(_) => "E101",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::NoHosts => "E1100",
            Self::UnknownHost(_) => "E1101",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ConfigError(_) => Some("hostpool config list".to_string()),
            Self::NoHosts => Some("hostpool config set pool.hosts <host:port,...>".to_string()),
            Self::UnknownHost(_) => Some("hostpool config get pool.hosts".to_string()),
            Self::Timeout(_) => Some("hostpool config set http.timeout_secs <secs>".to_string()),
            _ => None,
        }
    }

    /// Whether this error came from the transport (including timeouts)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NoHosts.code(), "E1100");
        assert_eq!(Error::ConfigError("x".into()).code(), "E600");
        assert_eq!(Error::UnknownHost("a".into()).code(), "E1101");
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let err = Error::transport(Refused);
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Transport error: connection refused");

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<Refused>().is_some());
    }

    #[test]
    fn test_suggestion() {
        assert!(Error::NoHosts.suggestion().is_some());
        assert!(Error::InvalidInput("x".into()).suggestion().is_none());
    }
}
