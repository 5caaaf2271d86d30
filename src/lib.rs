//! Gatekeeper: configuration bootstrap for an authenticating reverse proxy
//!
//! Gatekeeper accepts its configuration in two schemas. The legacy schema is
//! a flat set of flags backed by an optional TOML file and `GATEKEEPER_*`
//! environment variables. The alpha schema keeps the core options of the
//! legacy schema and describes upstreams, injected headers, servers and
//! providers in a structured YAML overlay.
//!
//! # Example
//!
//! ```no_run
//! use gatekeeper::bootstrap::{Bootstrap, Outcome};
//!
//! fn main() -> gatekeeper::Result<()> {
//!     let args: Vec<String> = std::env::args().skip(1).collect();
//!     if Bootstrap::new().run(&args, &mut std::io::stdout())? == Outcome::Started {
//!         log::info!("Gatekeeper stopped");
//!     }
//!     Ok(())
//! }
//! ```

// Public modules
pub mod bootstrap;
pub mod common;
pub mod config;
pub mod proxy;

// Re-export commonly used structures and functions for convenience
pub use bootstrap::{Bootstrap, Outcome};
pub use common::{BootstrapError, ProxyError, Result};
pub use config::Options;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Compiler the binary was built with
pub const RUSTC_VERSION: &str = env!("GATEKEEPER_RUSTC_VERSION");
