//! Legacy configuration schema
//!
//! The legacy schema is flat: every option is a single flag and a single
//! TOML key. Options that the alpha schema has since taken over (upstreams,
//! injected headers, listeners, provider) are kept in their own sections
//! here and translated into the structured form by
//! [`LegacyOptions::to_options`].

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::defaults;
use crate::config::duration::parse_duration;
use crate::config::error::{ConversionError, Result};
use crate::config::flags::{FlagSet, FlagSpec};
use crate::config::options::{
    options_flag_set, CoreOptions, Header, HeaderValue, OidcOptions, Options, Provider, SecretSource,
    Server, Tls, Upstream, UpstreamConfig,
};
use crate::config::source::LayeredSource;

/// Flags superseded by the alpha schema
pub const LEGACY_FLAGS: &[FlagSpec] = &[
    // upstreams
    FlagSpec::list("upstream", "upstreams", "the http url(s) of the upstream endpoint, file:// paths for static files or static://<status_code> for static response"),
    FlagSpec::bool("pass-host-header", "pass_host_header", "pass the request Host Header to upstream"),
    FlagSpec::bool("proxy-websockets", "proxy_websockets", "enables WebSocket proxying"),
    FlagSpec::string("flush-interval", "flush_interval", "period between response flushing when streaming responses"),
    FlagSpec::bool("ssl-upstream-insecure-skip-verify", "ssl_upstream_insecure_skip_verify", "skip validation of certificates presented when using HTTPS upstreams"),
    // headers
    FlagSpec::bool("pass-basic-auth", "pass_basic_auth", "pass HTTP Basic Auth, X-Forwarded-User and X-Forwarded-Email information to upstream"),
    FlagSpec::string("basic-auth-password", "basic_auth_password", "the password to set when passing the HTTP Basic Auth header"),
    FlagSpec::bool("pass-access-token", "pass_access_token", "pass OAuth access_token to upstream via X-Forwarded-Access-Token header"),
    FlagSpec::bool("pass-user-headers", "pass_user_headers", "pass X-Forwarded-User and X-Forwarded-Email information to upstream"),
    FlagSpec::bool("pass-authorization-header", "pass_authorization_header", "pass the Authorization Header to upstream"),
    FlagSpec::bool("set-basic-auth", "set_basic_auth", "set HTTP Basic Auth information in response"),
    FlagSpec::bool("set-xauthrequest", "set_xauthrequest", "set X-Auth-Request-User and X-Auth-Request-Email response headers"),
    FlagSpec::bool("set-authorization-header", "set_authorization_header", "set Authorization response headers"),
    FlagSpec::bool("prefer-email-to-user", "prefer_email_to_user", "prefer to use the Email address as the Username when passing information to upstream"),
    // listeners
    FlagSpec::string("http-address", "http_address", "[http://]<addr>:<port> or unix://<path> to listen on for HTTP clients"),
    FlagSpec::string("https-address", "https_address", "<addr>:<port> to listen on for HTTPS clients"),
    FlagSpec::string("tls-cert-file", "tls_cert_file", "path to certificate file"),
    FlagSpec::string("tls-key-file", "tls_key_file", "path to private key file"),
    FlagSpec::string("metrics-address", "metrics_address", "the address /metrics will be served on"),
    FlagSpec::string("metrics-secure-address", "metrics_secure_address", "the address /metrics will be served on for HTTPS clients"),
    FlagSpec::string("metrics-tls-cert-file", "metrics_tls_cert_file", "path to certificate file for secure metrics server"),
    FlagSpec::string("metrics-tls-key-file", "metrics_tls_key_file", "path to private key file for secure metrics server"),
    // provider
    FlagSpec::string("provider", "provider", "OAuth provider"),
    FlagSpec::string("provider-display-name", "provider_display_name", "Provider display name"),
    FlagSpec::string("client-id", "client_id", "the OAuth Client ID"),
    FlagSpec::string("client-secret", "client_secret", "the OAuth Client Secret"),
    FlagSpec::string("client-secret-file", "client_secret_file", "the file with OAuth Client Secret"),
    FlagSpec::string("scope", "scope", "OAuth scope specification"),
    FlagSpec::string("login-url", "login_url", "Authentication endpoint"),
    FlagSpec::string("redeem-url", "redeem_url", "Token redemption endpoint"),
    FlagSpec::string("validate-url", "validate_url", "Access token validation endpoint"),
    FlagSpec::string("oidc-issuer-url", "oidc_issuer_url", "OpenID Connect issuer URL"),
    FlagSpec::string("oidc-email-claim", "oidc_email_claim", "which OIDC claim contains the user's email"),
];

/// The complete legacy flag set: core flags plus superseded flags
pub fn legacy_flag_set() -> FlagSet {
    let mut set = options_flag_set();
    for spec in LEGACY_FLAGS {
        set.add(spec.clone());
    }
    set
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyUpstreams {
    pub upstreams: Vec<String>,
    pub pass_host_header: bool,
    pub proxy_websockets: bool,
    pub flush_interval: String,
    pub ssl_upstream_insecure_skip_verify: bool,
}

impl Default for LegacyUpstreams {
    fn default() -> Self {
        Self {
            upstreams: Vec::new(),
            pass_host_header: true,
            proxy_websockets: true,
            flush_interval: defaults::flush_interval_str(),
            ssl_upstream_insecure_skip_verify: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyHeaders {
    pub pass_basic_auth: bool,
    pub basic_auth_password: String,
    pub pass_access_token: bool,
    pub pass_user_headers: bool,
    pub pass_authorization_header: bool,
    pub set_basic_auth: bool,
    pub set_xauthrequest: bool,
    pub set_authorization_header: bool,
    pub prefer_email_to_user: bool,
}

impl Default for LegacyHeaders {
    fn default() -> Self {
        Self {
            pass_basic_auth: true,
            basic_auth_password: String::new(),
            pass_access_token: false,
            pass_user_headers: true,
            pass_authorization_header: false,
            set_basic_auth: false,
            set_xauthrequest: false,
            set_authorization_header: false,
            prefer_email_to_user: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyServer {
    pub http_address: String,
    pub https_address: String,
    pub tls_cert_file: String,
    pub tls_key_file: String,
    pub metrics_address: String,
    pub metrics_secure_address: String,
    pub metrics_tls_cert_file: String,
    pub metrics_tls_key_file: String,
}

impl Default for LegacyServer {
    fn default() -> Self {
        Self {
            http_address: defaults::http_address(),
            https_address: defaults::https_address(),
            tls_cert_file: String::new(),
            tls_key_file: String::new(),
            metrics_address: String::new(),
            metrics_secure_address: String::new(),
            metrics_tls_cert_file: String::new(),
            metrics_tls_key_file: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyProvider {
    pub provider: String,
    pub provider_display_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub client_secret_file: String,
    pub scope: String,
    pub login_url: String,
    pub redeem_url: String,
    pub validate_url: String,
    pub oidc_issuer_url: String,
    pub oidc_email_claim: String,
}

impl Default for LegacyProvider {
    fn default() -> Self {
        Self {
            provider: defaults::provider(),
            provider_display_name: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            client_secret_file: String::new(),
            scope: String::new(),
            login_url: String::new(),
            redeem_url: String::new(),
            validate_url: String::new(),
            oidc_issuer_url: String::new(),
            oidc_email_claim: defaults::oidc_email_claim(),
        }
    }
}

/// Options as loaded through the legacy schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyOptions {
    pub upstreams: LegacyUpstreams,
    pub headers: LegacyHeaders,
    pub server: LegacyServer,
    pub provider: LegacyProvider,
    pub core: CoreOptions,
}

impl LegacyOptions {
    /// Deserialize every section from the same layered source
    pub fn load(source: &LayeredSource) -> Result<Self> {
        Ok(Self {
            upstreams: source.deserialize()?,
            headers: source.deserialize()?,
            server: source.deserialize()?,
            provider: source.deserialize()?,
            core: source.deserialize()?,
        })
    }

    /// Translate into the unified structure
    pub fn to_options(self) -> std::result::Result<Options, ConversionError> {
        let upstream_servers = self.upstreams.convert()?;
        let (inject_request_headers, inject_response_headers) = self.headers.convert()?;
        let (server, metrics_server) = self.server.convert();
        let providers = vec![self.provider.convert()];

        let options = Options {
            upstream_servers,
            inject_request_headers,
            inject_response_headers,
            server,
            metrics_server,
            providers,
            ..Options::from_core(self.core)?
        };

        debug!(
            "Converted legacy options: {} upstream(s), {} request header(s), {} response header(s)",
            options.upstream_servers.upstreams.len(),
            options.inject_request_headers.len(),
            options.inject_response_headers.len()
        );

        Ok(options)
    }
}

impl LegacyUpstreams {
    fn convert(&self) -> std::result::Result<UpstreamConfig, ConversionError> {
        let flush_interval = parse_duration(&self.flush_interval)
            .ok_or_else(|| ConversionError::InvalidDuration("flush-interval", self.flush_interval.clone()))?;

        let upstreams = self
            .upstreams
            .iter()
            .map(|raw| self.convert_one(raw, flush_interval))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(UpstreamConfig { upstreams })
    }

    fn convert_one(&self, raw: &str, flush_interval: Duration) -> std::result::Result<Upstream, ConversionError> {
        let url = Url::parse(raw).map_err(|e| ConversionError::InvalidUpstream(raw.to_string(), e.to_string()))?;

        let mut upstream = Upstream {
            id: String::new(),
            path: path_or_root(url.path()),
            uri: raw.to_string(),
            insecure_skip_tls_verify: self.ssl_upstream_insecure_skip_verify,
            flush_interval: Some(flush_interval),
            pass_host_header: Some(self.pass_host_header),
            proxy_websockets: Some(self.proxy_websockets),
            ..Upstream::default()
        };

        match url.scheme() {
            "http" | "https" => {}
            "file" => {
                // file:///srv/www#/static/ serves /srv/www under /static/
                upstream.path = url.fragment().map(path_or_root).unwrap_or_else(|| "/".to_string());
                let mut location = url.clone();
                location.set_fragment(None);
                upstream.uri = location.to_string();
            }
            "static" => {
                let code = match url.host_str().filter(|host| !host.is_empty()) {
                    Some(host) => host.parse::<u16>().map_err(|_| {
                        ConversionError::InvalidUpstream(raw.to_string(), format!("invalid static response code {:?}", host))
                    })?,
                    None => 200,
                };
                upstream.uri = String::new();
                upstream.is_static = true;
                upstream.static_code = Some(code);
                upstream.flush_interval = None;
                upstream.pass_host_header = None;
                upstream.proxy_websockets = None;
                upstream.insecure_skip_tls_verify = false;
            }
            other => {
                return Err(ConversionError::InvalidUpstream(
                    raw.to_string(),
                    format!("unsupported scheme {:?}", other),
                ))
            }
        }

        upstream.id = upstream.path.clone();
        Ok(upstream)
    }
}

fn path_or_root(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

impl LegacyHeaders {
    fn convert(&self) -> std::result::Result<(Vec<Header>, Vec<Header>), ConversionError> {
        if self.pass_basic_auth && self.pass_authorization_header {
            return Err(ConversionError::ConflictingHeaders(
                "pass-basic-auth and pass-authorization-header both set the Authorization header".to_string(),
            ));
        }
        if self.set_basic_auth && self.set_authorization_header {
            return Err(ConversionError::ConflictingHeaders(
                "set-basic-auth and set-authorization-header both set the Authorization header".to_string(),
            ));
        }

        let user_claim = if self.prefer_email_to_user { "email" } else { "user" };
        let password = if self.basic_auth_password.is_empty() {
            None
        } else {
            Some(SecretSource::from_value(self.basic_auth_password.clone()))
        };

        let mut request = Vec::new();
        if self.pass_basic_auth {
            request.push(basic_auth_header(user_claim, password.clone()));
        }
        if self.pass_basic_auth || self.pass_user_headers {
            request.push(Header::new("X-Forwarded-User", vec![HeaderValue::claim(user_claim)]));
            request.push(Header::new("X-Forwarded-Email", vec![HeaderValue::claim("email")]));
            request.push(Header::new(
                "X-Forwarded-Preferred-Username",
                vec![HeaderValue::claim("preferred_username")],
            ));
        }
        if self.pass_access_token {
            request.push(Header::new("X-Forwarded-Access-Token", vec![HeaderValue::claim("access_token")]));
        }
        if self.pass_authorization_header {
            request.push(bearer_header());
        }

        let mut response = Vec::new();
        if self.set_xauthrequest {
            response.push(Header::new("X-Auth-Request-User", vec![HeaderValue::claim(user_claim)]));
            response.push(Header::new("X-Auth-Request-Email", vec![HeaderValue::claim("email")]));
            response.push(Header::new(
                "X-Auth-Request-Preferred-Username",
                vec![HeaderValue::claim("preferred_username")],
            ));
            if self.pass_access_token {
                response.push(Header::new("X-Auth-Request-Access-Token", vec![HeaderValue::claim("access_token")]));
            }
        }
        if self.set_basic_auth {
            response.push(basic_auth_header(user_claim, password));
        }
        if self.set_authorization_header {
            response.push(bearer_header());
        }

        Ok((request, response))
    }
}

fn basic_auth_header(claim: &str, password: Option<SecretSource>) -> Header {
    let mut value = HeaderValue::claim(claim).with_prefix("Basic ");
    if let Some(password) = password {
        value = value.with_basic_auth_password(password);
    }
    Header::new("Authorization", vec![value])
}

fn bearer_header() -> Header {
    Header::new("Authorization", vec![HeaderValue::claim("id_token").with_prefix("Bearer ")])
}

impl LegacyServer {
    fn convert(&self) -> (Server, Server) {
        let server = listener(&self.http_address, &self.https_address, &self.tls_cert_file, &self.tls_key_file);
        let metrics = listener(
            &self.metrics_address,
            &self.metrics_secure_address,
            &self.metrics_tls_cert_file,
            &self.metrics_tls_key_file,
        );
        (server, metrics)
    }
}

/// A secure listener only exists when TLS material is configured
fn listener(bind: &str, secure_bind: &str, cert_file: &str, key_file: &str) -> Server {
    let tls = if cert_file.is_empty() && key_file.is_empty() {
        None
    } else {
        Some(Tls {
            key: SecretSource::from_file(key_file),
            cert: SecretSource::from_file(cert_file),
        })
    };

    Server {
        bind_address: bind.to_string(),
        secure_bind_address: if tls.is_some() { secure_bind.to_string() } else { String::new() },
        tls,
    }
}

impl LegacyProvider {
    fn convert(&self) -> Provider {
        let oidc_config = if self.oidc_issuer_url.is_empty() && self.provider != "oidc" {
            None
        } else {
            Some(OidcOptions {
                issuer_url: self.oidc_issuer_url.clone(),
                email_claim: self.oidc_email_claim.clone(),
            })
        };

        Provider {
            id: format!("{}={}", self.provider, self.client_id),
            provider_type: self.provider.clone(),
            name: self.provider_display_name.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            client_secret_file: self.client_secret_file.clone(),
            scope: self.scope.clone(),
            login_url: self.login_url.clone(),
            redeem_url: self.redeem_url.clone(),
            validate_url: self.validate_url.clone(),
            oidc_config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_upstreams(upstreams: &[&str]) -> LegacyOptions {
        LegacyOptions {
            upstreams: LegacyUpstreams {
                upstreams: upstreams.iter().map(|s| s.to_string()).collect(),
                ..LegacyUpstreams::default()
            },
            ..LegacyOptions::default()
        }
    }

    #[test]
    fn test_legacy_flag_set_is_superset() {
        let legacy = legacy_flag_set();
        for spec in options_flag_set().flags() {
            assert!(legacy.contains(spec.name));
        }
        assert!(legacy.contains("upstream"));
        assert!(legacy.contains("client-id"));
    }

    #[test]
    fn test_http_upstream() {
        let options = with_upstreams(&["http://127.0.0.1:8080/api"]).to_options().unwrap();
        let upstream = &options.upstream_servers.upstreams[0];
        assert_eq!(upstream.id, "/api");
        assert_eq!(upstream.path, "/api");
        assert_eq!(upstream.uri, "http://127.0.0.1:8080/api");
        assert_eq!(upstream.flush_interval, Some(Duration::from_secs(1)));
        assert_eq!(upstream.pass_host_header, Some(true));
        assert!(!upstream.is_static);
    }

    #[test]
    fn test_root_upstream_path() {
        let options = with_upstreams(&["https://backend.internal"]).to_options().unwrap();
        assert_eq!(options.upstream_servers.upstreams[0].path, "/");
    }

    #[test]
    fn test_static_upstream() {
        let options = with_upstreams(&["static://202"]).to_options().unwrap();
        let upstream = &options.upstream_servers.upstreams[0];
        assert!(upstream.is_static);
        assert_eq!(upstream.static_code, Some(202));
        assert!(upstream.uri.is_empty());
        assert_eq!(upstream.flush_interval, None);
    }

    #[test]
    fn test_file_upstream() {
        let options = with_upstreams(&["file:///var/www/static#/assets/"]).to_options().unwrap();
        let upstream = &options.upstream_servers.upstreams[0];
        assert_eq!(upstream.path, "/assets/");
        assert_eq!(upstream.uri, "file:///var/www/static");
    }

    #[test]
    fn test_invalid_upstreams() {
        assert!(matches!(
            with_upstreams(&["not a url"]).to_options(),
            Err(ConversionError::InvalidUpstream(_, _))
        ));
        assert!(matches!(
            with_upstreams(&["ftp://example.com"]).to_options(),
            Err(ConversionError::InvalidUpstream(_, _))
        ));
        assert!(matches!(
            with_upstreams(&["static://ok"]).to_options(),
            Err(ConversionError::InvalidUpstream(_, _))
        ));
    }

    #[test]
    fn test_default_headers() {
        let options = LegacyOptions::default().to_options().unwrap();
        let names: Vec<_> = options.inject_request_headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Authorization", "X-Forwarded-User", "X-Forwarded-Email", "X-Forwarded-Preferred-Username"]
        );
        assert!(options.inject_response_headers.is_empty());
    }

    #[test]
    fn test_xauthrequest_headers_with_email_as_user() {
        let legacy = LegacyOptions {
            headers: LegacyHeaders {
                pass_basic_auth: false,
                pass_user_headers: false,
                set_xauthrequest: true,
                pass_access_token: true,
                prefer_email_to_user: true,
                ..LegacyHeaders::default()
            },
            ..LegacyOptions::default()
        };
        let options = legacy.to_options().unwrap();

        assert_eq!(options.inject_request_headers.len(), 1);
        assert_eq!(options.inject_request_headers[0].name, "X-Forwarded-Access-Token");

        let user = &options.inject_response_headers[0];
        assert_eq!(user.name, "X-Auth-Request-User");
        assert_eq!(user.values[0].claim.as_deref(), Some("email"));
        assert_eq!(options.inject_response_headers.len(), 4);
    }

    #[test]
    fn test_conflicting_authorization_headers() {
        let legacy = LegacyOptions {
            headers: LegacyHeaders {
                pass_authorization_header: true,
                ..LegacyHeaders::default()
            },
            ..LegacyOptions::default()
        };
        assert!(matches!(legacy.to_options(), Err(ConversionError::ConflictingHeaders(_))));
    }

    #[test]
    fn test_server_without_tls_drops_secure_address() {
        let options = LegacyOptions::default().to_options().unwrap();
        assert_eq!(options.server.bind_address, defaults::HTTP_ADDRESS);
        assert!(options.server.secure_bind_address.is_empty());
        assert!(options.server.tls.is_none());
        assert_eq!(options.metrics_server, Server::default());
    }

    #[test]
    fn test_server_with_tls() {
        let legacy = LegacyOptions {
            server: LegacyServer {
                tls_cert_file: "/etc/tls/cert.pem".to_string(),
                tls_key_file: "/etc/tls/key.pem".to_string(),
                ..LegacyServer::default()
            },
            ..LegacyOptions::default()
        };
        let options = legacy.to_options().unwrap();
        assert_eq!(options.server.secure_bind_address, defaults::HTTPS_ADDRESS);
        let tls = options.server.tls.unwrap();
        assert_eq!(tls.cert, SecretSource::from_file("/etc/tls/cert.pem"));
    }

    #[test]
    fn test_provider_conversion() {
        let legacy = LegacyOptions {
            provider: LegacyProvider {
                provider: "oidc".to_string(),
                client_id: "gatekeeper".to_string(),
                oidc_issuer_url: "https://issuer.example.com".to_string(),
                ..LegacyProvider::default()
            },
            ..LegacyOptions::default()
        };
        let options = legacy.to_options().unwrap();
        let provider = &options.providers[0];
        assert_eq!(provider.id, "oidc=gatekeeper");
        assert_eq!(provider.provider_type, "oidc");
        let oidc = provider.oidc_config.as_ref().unwrap();
        assert_eq!(oidc.issuer_url, "https://issuer.example.com");
        assert_eq!(oidc.email_claim, "email");
    }

    #[test]
    fn test_bad_flush_interval() {
        let legacy = LegacyOptions {
            upstreams: LegacyUpstreams {
                flush_interval: "soon".to_string(),
                ..LegacyUpstreams::default()
            },
            ..LegacyOptions::default()
        };
        assert_eq!(
            legacy.to_options(),
            Err(ConversionError::InvalidDuration("flush-interval", "soon".to_string()))
        );
    }
}
