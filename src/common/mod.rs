//! Common module
//!
//! This module contains shared errors, the logging bridge and utility
//! functions used throughout the application.

pub mod error;
pub mod log;
pub mod net;

// Re-export commonly used types and functions
pub use error::{BootstrapError, ProxyError, Result};
pub use log::{LogBridgeError, LoggingContext, Sink, Sinks};
pub use net::parse_bind_address;
