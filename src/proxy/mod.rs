//! Proxy module
//!
//! The configuration bootstrap ends here: the validated options and the
//! identity validator are handed to a [`ProxyLauncher`].

pub mod server;
pub mod validator;

pub use server::{DefaultLauncher, ListenerSpec, Proxy, ProxyLauncher};
pub use validator::EmailValidator;
