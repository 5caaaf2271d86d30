//! Proxy server module
//!
//! This module starts the proxy from a validated configuration: it binds
//! the configured listeners and keeps them open until the process receives
//! Ctrl+C.

use std::net::SocketAddr;

use log::{debug, info, warn};
use tokio::net::TcpListener;

use crate::common::{parse_bind_address, ProxyError};
use crate::config::Options;
use crate::proxy::validator::EmailValidator;

/// Hand-off point between bootstrap and the running proxy
pub trait ProxyLauncher {
    /// Start the proxy; returns once it has shut down
    fn launch(&self, options: Options, validator: EmailValidator) -> Result<(), ProxyError>;
}

/// A listener the proxy should open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    /// Name used in log output
    pub name: &'static str,
    /// Address as written in configuration
    pub address: String,
}

/// Proxy server structure
#[derive(Debug, Clone)]
pub struct Proxy {
    options: Options,
    validator: EmailValidator,
}

impl Proxy {
    /// Create a new proxy instance
    pub fn new(options: Options, validator: EmailValidator) -> Self {
        Self { options, validator }
    }

    /// Listeners implied by the server and metrics server settings
    pub fn listeners(&self) -> Vec<ListenerSpec> {
        let mut listeners = Vec::new();
        let servers = [("http", "https", &self.options.server), ("metrics", "metrics-https", &self.options.metrics_server)];

        for (plain, secure, server) in servers {
            if !server.bind_address.is_empty() {
                listeners.push(ListenerSpec {
                    name: plain,
                    address: server.bind_address.clone(),
                });
            }
            if !server.secure_bind_address.is_empty() {
                if server.tls.is_none() {
                    warn!("Ignoring {} listener {}: no TLS configuration", secure, server.secure_bind_address);
                    continue;
                }
                listeners.push(ListenerSpec {
                    name: secure,
                    address: server.secure_bind_address.clone(),
                });
            }
        }

        listeners
    }

    /// Bind every configured listener
    pub async fn bind(&self) -> Result<Vec<(ListenerSpec, TcpListener)>, ProxyError> {
        let mut bound = Vec::new();

        for spec in self.listeners() {
            let addr: SocketAddr = parse_bind_address(&spec.address)?;
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| ProxyError::BindAddress(spec.address.clone(), e.to_string()))?;
            info!("{} listener bound to {}", spec.name, listener.local_addr()?);
            bound.push((spec, listener));
        }

        Ok(bound)
    }

    /// Bind the listeners and run until Ctrl+C
    pub async fn run(&self) -> Result<(), ProxyError> {
        let listeners = self.bind().await?;
        if listeners.is_empty() {
            return Err(ProxyError::Start("no listeners configured".to_string()));
        }

        debug!("Email validator: {:?}", self.validator);
        info!(
            "Gatekeeper ready with {} upstream(s) and {} provider(s), press Ctrl+C to stop",
            self.options.upstream_servers.upstreams.len(),
            self.options.providers.len()
        );

        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        debug!("Closing {} listener(s)", listeners.len());

        Ok(())
    }

    /// Build a runtime and run the proxy on it
    pub fn start(self) -> Result<(), ProxyError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ProxyError::Start(format!("unable to build runtime: {}", e)))?;

        runtime.block_on(self.run())
    }
}

/// Launcher that builds a [`Proxy`] from the configuration it receives
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLauncher;

impl ProxyLauncher for DefaultLauncher {
    fn launch(&self, options: Options, validator: EmailValidator) -> Result<(), ProxyError> {
        Proxy::new(options, validator).start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::{SecretSource, Server, Tls};

    #[test]
    fn test_listeners_from_options() {
        let mut options = Options::default();
        options.server.secure_bind_address = ":8443".to_string();
        options.metrics_server = Server {
            bind_address: "127.0.0.1:9100".to_string(),
            ..Server::default()
        };

        let proxy = Proxy::new(options, EmailValidator::default());
        let names: Vec<_> = proxy.listeners().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["http", "metrics"]);
    }

    #[test]
    fn test_secure_listener_requires_tls() {
        let mut options = Options::default();
        options.server.secure_bind_address = ":8443".to_string();
        options.server.tls = Some(Tls {
            key: SecretSource::from_file("/etc/tls/key.pem"),
            cert: SecretSource::from_file("/etc/tls/cert.pem"),
        });

        let proxy = Proxy::new(options, EmailValidator::default());
        let names: Vec<_> = proxy.listeners().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["http", "https"]);
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let mut options = Options::default();
        options.server.bind_address = "127.0.0.1:0".to_string();

        let proxy = Proxy::new(options, EmailValidator::default());
        let bound = proxy.bind().await.unwrap();
        assert_eq!(bound.len(), 1);
        assert_ne!(bound[0].1.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        let mut options = Options::default();
        options.server.bind_address = "not-an-address".to_string();

        let proxy = Proxy::new(options, EmailValidator::default());
        assert!(matches!(proxy.bind().await, Err(ProxyError::BindAddress(_, _))));
    }
}
