//! Unified runtime configuration
//!
//! [`Options`] is the one structure the rest of the system consumes. Its
//! fields fall into two groups: core options, which both schemas load from
//! flags, the environment and the TOML file, and alpha-owned options
//! (upstreams, injected headers, servers, providers), which the legacy schema
//! synthesizes from flat flags and the alpha schema takes from the YAML
//! overlay.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::config::duration::{parse_duration, serde_duration, serde_option_duration};
use crate::config::error::ConversionError;
use crate::config::flags::{FlagSet, FlagSpec};

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// Flags for options that are not superseded by the alpha schema
pub const CORE_FLAGS: &[FlagSpec] = &[
    FlagSpec::string("proxy-prefix", "proxy_prefix", "the url root path that this proxy should be nested under (e.g. /<oauth2>/sign_in)"),
    FlagSpec::bool("reverse-proxy", "reverse_proxy", "are we running behind a reverse proxy, controls whether headers like X-Real-Ip are accepted"),
    FlagSpec::string("cookie-name", "cookie_name", "the name of the cookie that the proxy creates"),
    FlagSpec::string("cookie-secret", "cookie_secret", "the seed string for secure cookies (optionally base64 encoded)"),
    FlagSpec::list("cookie-domain", "cookie_domains", "optional cookie domains to force cookies to (may be given multiple times)"),
    FlagSpec::string("cookie-expire", "cookie_expire", "expire timeframe for cookie"),
    FlagSpec::bool("cookie-secure", "cookie_secure", "set secure (HTTPS) cookie flag"),
    FlagSpec::bool("cookie-httponly", "cookie_httponly", "set HttpOnly cookie flag"),
    FlagSpec::list("email-domain", "email_domains", "authenticate emails with the specified domain (may be given multiple times), use * to authenticate any email"),
    FlagSpec::string("authenticated-emails-file", "authenticated_emails_file", "authenticate against emails via file (one per line)"),
    FlagSpec::bool("skip-auth-preflight", "skip_auth_preflight", "will skip authentication for OPTIONS requests"),
];

/// The restricted flag set used as the base of the alpha schema
pub fn options_flag_set() -> FlagSet {
    FlagSet::with_flags(defaults::APP_FLAG_SET, CORE_FLAGS)
}

/// Core options as they appear in the TOML file and on the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreOptions {
    pub proxy_prefix: String,
    pub reverse_proxy: bool,
    pub cookie_name: String,
    pub cookie_secret: String,
    pub cookie_domains: Vec<String>,
    pub cookie_expire: String,
    pub cookie_secure: bool,
    pub cookie_httponly: bool,
    pub email_domains: Vec<String>,
    pub authenticated_emails_file: String,
    pub skip_auth_preflight: bool,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            proxy_prefix: defaults::proxy_prefix(),
            reverse_proxy: false,
            cookie_name: defaults::cookie_name(),
            cookie_secret: String::new(),
            cookie_domains: Vec::new(),
            cookie_expire: defaults::cookie_expire_str(),
            cookie_secure: true,
            cookie_httponly: true,
            email_domains: Vec::new(),
            authenticated_emails_file: String::new(),
            skip_auth_preflight: false,
        }
    }
}

/// Session cookie settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieOptions {
    pub name: String,
    /// Not scrubbed when the observed configuration is logged
    pub secret: String,
    pub domains: Vec<String>,
    #[serde(with = "serde_duration")]
    pub expire: Duration,
    pub secure: bool,
    pub httponly: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: defaults::cookie_name(),
            secret: String::new(),
            domains: Vec::new(),
            expire: defaults::cookie_expire(),
            secure: true,
            httponly: true,
        }
    }
}

/// A value read from configuration, the environment or a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_file: Option<PathBuf>,
}

impl SecretSource {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            from_file: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Number of sources set; exactly one is valid
    pub fn source_count(&self) -> usize {
        [self.value.is_some(), self.from_env.is_some(), self.from_file.is_some()]
            .iter()
            .filter(|set| **set)
            .count()
    }
}

/// A single upstream the proxy forwards to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Upstream {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure_skip_tls_verify: bool,
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_code: Option<u16>,
    #[serde(default, with = "serde_option_duration", skip_serializing_if = "Option::is_none")]
    pub flush_interval: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_host_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_websockets: Option<bool>,
}

/// Upstream section of the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub upstreams: Vec<Upstream>,
}

/// One value of an injected header
///
/// Either a static secret source (`value`, `fromEnv`, `fromFile`) or a
/// session claim (`claim`, with optional `prefix` and `basicAuthPassword`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeaderValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth_password: Option<SecretSource>,
}

impl HeaderValue {
    pub fn claim(claim: impl Into<String>) -> Self {
        Self {
            claim: Some(claim.into()),
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_basic_auth_password(mut self, password: SecretSource) -> Self {
        self.basic_auth_password = Some(password);
        self
    }
}

/// A header injected into upstream requests or client responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Header {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub prefer_from_request: bool,
    #[serde(default)]
    pub values: Vec<HeaderValue>,
}

impl Header {
    pub fn new(name: impl Into<String>, values: Vec<HeaderValue>) -> Self {
        Self {
            name: name.into(),
            prefer_from_request: false,
            values,
        }
    }
}

/// TLS material for a listener
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Tls {
    pub key: SecretSource,
    pub cert: SecretSource,
}

/// A listener configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Server {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bind_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secure_bind_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Tls>,
}

/// OpenID Connect specific provider settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OidcOptions {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email_claim: String,
}

/// An identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Provider {
    pub id: String,
    #[serde(rename = "provider")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret_file: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub login_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub redeem_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub validate_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_config: Option<OidcOptions>,
}

/// Unified runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    // --- Core options ---
    pub proxy_prefix: String,
    pub reverse_proxy: bool,
    pub cookie: CookieOptions,
    pub email_domains: Vec<String>,
    pub authenticated_emails_file: Option<PathBuf>,
    pub skip_auth_preflight: bool,

    // --- Alpha-owned options ---
    pub upstream_servers: UpstreamConfig,
    pub inject_request_headers: Vec<Header>,
    pub inject_response_headers: Vec<Header>,
    pub server: Server,
    pub metrics_server: Server,
    pub providers: Vec<Provider>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            proxy_prefix: defaults::proxy_prefix(),
            reverse_proxy: false,
            cookie: CookieOptions::default(),
            email_domains: Vec::new(),
            authenticated_emails_file: None,
            skip_auth_preflight: false,
            upstream_servers: UpstreamConfig::default(),
            inject_request_headers: Vec::new(),
            inject_response_headers: Vec::new(),
            server: Server {
                bind_address: defaults::http_address(),
                ..Server::default()
            },
            metrics_server: Server::default(),
            providers: Vec::new(),
        }
    }
}

impl Options {
    /// Build options from the core section, leaving alpha-owned fields at
    /// their defaults
    pub fn from_core(core: CoreOptions) -> Result<Self, ConversionError> {
        let expire = parse_duration(&core.cookie_expire)
            .ok_or_else(|| ConversionError::InvalidDuration("cookie-expire", core.cookie_expire.clone()))?;

        let authenticated_emails_file = if core.authenticated_emails_file.is_empty() {
            None
        } else {
            Some(PathBuf::from(core.authenticated_emails_file))
        };

        Ok(Self {
            proxy_prefix: core.proxy_prefix,
            reverse_proxy: core.reverse_proxy,
            cookie: CookieOptions {
                name: core.cookie_name,
                secret: core.cookie_secret,
                domains: core.cookie_domains,
                expire,
                secure: core.cookie_secure,
                httponly: core.cookie_httponly,
            },
            email_domains: core.email_domains,
            authenticated_emails_file,
            skip_auth_preflight: core.skip_auth_preflight,
            ..Self::default()
        })
    }
}
