//! Configuration merging functionality
//!
//! This module applies an alpha overlay onto a base configuration.

use crate::config::alpha::AlphaOptions;
use crate::config::options::Options;

/// Trait for merging an overlay into a configuration
pub trait ConfigMerger<Overlay> {
    /// Merge `overlay` into this configuration and return the result
    ///
    /// A field set in the overlay replaces the whole base field; lists are
    /// replaced, never appended to.
    fn merge(&self, overlay: &Overlay) -> Self
    where
        Self: Sized;
}

impl ConfigMerger<AlphaOptions> for Options {
    fn merge(&self, overlay: &AlphaOptions) -> Self {
        fn merge_option<T: Clone>(base: &T, overlay: &Option<T>) -> T {
            match overlay {
                Some(value) => value.clone(),
                None => base.clone(),
            }
        }

        Self {
            upstream_servers: merge_option(&self.upstream_servers, &overlay.upstream_config),
            inject_request_headers: merge_option(&self.inject_request_headers, &overlay.inject_request_headers),
            inject_response_headers: merge_option(&self.inject_response_headers, &overlay.inject_response_headers),
            server: merge_option(&self.server, &overlay.server),
            metrics_server: merge_option(&self.metrics_server, &overlay.metrics_server),
            providers: merge_option(&self.providers, &overlay.providers),

            // Core options are never part of the overlay
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::{Header, HeaderValue, Provider, Server, Upstream, UpstreamConfig};

    fn base() -> Options {
        let mut options = Options::default();
        options.proxy_prefix = "/auth".to_string();
        options.inject_request_headers = vec![
            Header::new("X-Forwarded-User", vec![HeaderValue::claim("user")]),
            Header::new("X-Forwarded-Email", vec![HeaderValue::claim("email")]),
        ];
        options.providers = vec![Provider {
            id: "google=base".to_string(),
            provider_type: "google".to_string(),
            ..Provider::default()
        }];
        options
    }

    #[test]
    fn test_empty_overlay_keeps_base() {
        let base = base();
        assert_eq!(base.merge(&AlphaOptions::default()), base);
    }

    #[test]
    fn test_overlay_replaces_whole_fields() {
        let base = base();
        let overlay = AlphaOptions {
            inject_request_headers: Some(vec![Header::new("X-Only", vec![HeaderValue::claim("email")])]),
            server: Some(Server {
                bind_address: "0.0.0.0:8080".to_string(),
                ..Server::default()
            }),
            ..AlphaOptions::default()
        };

        let merged = base.merge(&overlay);
        assert_eq!(merged.inject_request_headers.len(), 1);
        assert_eq!(merged.inject_request_headers[0].name, "X-Only");
        assert_eq!(merged.server.bind_address, "0.0.0.0:8080");
        assert_eq!(merged.providers, base.providers);
        assert_eq!(merged.proxy_prefix, "/auth");
    }

    #[test]
    fn test_empty_lists_clear_base() {
        let overlay = AlphaOptions {
            inject_request_headers: Some(Vec::new()),
            providers: Some(Vec::new()),
            ..AlphaOptions::default()
        };
        let merged = base().merge(&overlay);
        assert!(merged.inject_request_headers.is_empty());
        assert!(merged.providers.is_empty());
    }

    #[test]
    fn test_extract_inverts_merge_for_set_fields() {
        let overlay = AlphaOptions {
            upstream_config: Some(UpstreamConfig {
                upstreams: vec![Upstream {
                    id: "static".to_string(),
                    path: "/".to_string(),
                    is_static: true,
                    static_code: Some(204),
                    ..Upstream::default()
                }],
            }),
            metrics_server: Some(Server {
                bind_address: "127.0.0.1:9100".to_string(),
                ..Server::default()
            }),
            ..AlphaOptions::default()
        };

        let extracted = AlphaOptions::extract_from(&base().merge(&overlay));
        assert_eq!(extracted.upstream_config, overlay.upstream_config);
        assert_eq!(extracted.metrics_server, overlay.metrics_server);
    }

    #[test]
    fn test_merge_of_full_extract_reproduces_options() {
        let source = base();
        let extracted = AlphaOptions::extract_from(&source);
        assert_eq!(Options::default().merge(&extracted).providers, source.providers);
        assert_eq!(
            Options::default().merge(&extracted).inject_request_headers,
            source.inject_request_headers
        );
    }
}
