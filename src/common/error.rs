//! Error handling module
//!
//! This module defines the top-level error types and result type aliases used
//! by the bootstrap sequence and the proxy launcher.

use std::io;
use thiserror::Error;

use crate::common::log::LogBridgeError;
use crate::config::error::{FlagError, LoadError, ValidationError};

/// Gatekeeper bootstrap error type
///
/// Every variant names the phase that failed. `main` is the only place that
/// turns one of these into an exit code.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A recognized bootstrap flag carried a malformed value
    #[error("failed to parse bootstrap flags: {0}")]
    Flags(#[from] FlagError),

    /// The logging bridge could not be configured or installed
    #[error("{0}")]
    LogBridge(#[from] LogBridgeError),

    /// `--alpha-config` and `--convert-config-to-alpha` were given together
    #[error("cannot use alpha-config and convert-config-to-alpha together")]
    IncompatibleFlags,

    /// The selected loader failed
    #[error("{0}")]
    Load(#[from] LoadError),

    /// The alpha document could not be rendered or written
    #[error("could not convert config: {0}")]
    Convert(String),

    /// Semantic validation rejected the configuration
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The proxy could not be initialised or started
    #[error("{0}")]
    Proxy(#[from] ProxyError),

    /// Writing to standard output failed
    #[error("unable to write output: {0}")]
    Output(#[source] io::Error),
}

/// Proxy launcher error type
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The identity validator could not be built
    #[error("Failed to initialise gatekeeper: {0}")]
    Init(String),

    /// A configured listen address is unusable
    #[error("Invalid bind address {0}: {1}")]
    BindAddress(String, String),

    /// The proxy failed while starting
    #[error("Failed to start gatekeeper: {0}")]
    Start(String),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `BootstrapError`.
pub type Result<T> = std::result::Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "address in use");
        let proxy_err: ProxyError = io_err.into();

        match proxy_err {
            ProxyError::Io(_) => {}
            _ => panic!("Should convert to IO error"),
        }

        let err: BootstrapError = proxy_err.into();
        assert!(matches!(err, BootstrapError::Proxy(ProxyError::Io(_))));
    }

    #[test]
    fn test_error_display() {
        let err = BootstrapError::IncompatibleFlags;
        assert_eq!(
            err.to_string(),
            "cannot use alpha-config and convert-config-to-alpha together"
        );

        let err = BootstrapError::Convert("unable to marshal config: boom".to_string());
        assert!(err.to_string().starts_with("could not convert config:"));
    }
}
