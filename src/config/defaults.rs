//! Default configuration values
//!
//! This module provides default values for configuration options.
//! It is the single source of truth for defaults: both the legacy and the
//! core option structures take their serde defaults from here.

use std::time::Duration;

/// Environment variable prefix for all configuration keys
pub const ENV_PREFIX: &str = "GATEKEEPER";

/// Name used in usage output
pub const APP_FLAG_SET: &str = "gatekeeper";

/// Default URL path prefix for the proxy's own endpoints
pub const PROXY_PREFIX: &str = "/oauth2";

/// Default session cookie name
pub const COOKIE_NAME: &str = "_gatekeeper";

/// Default session cookie lifetime
pub const COOKIE_EXPIRE_STR: &str = "168h";

/// Default plain HTTP listen address
pub const HTTP_ADDRESS: &str = "127.0.0.1:4180";

/// Default HTTPS listen address
pub const HTTPS_ADDRESS: &str = ":443";

/// Default upstream flush interval
pub const FLUSH_INTERVAL_STR: &str = "1s";

/// Default provider type
pub const PROVIDER: &str = "google";

/// Default OIDC claim holding the email address
pub const OIDC_EMAIL_CLAIM: &str = "email";

pub fn proxy_prefix() -> String {
    PROXY_PREFIX.to_string()
}

pub fn cookie_name() -> String {
    COOKIE_NAME.to_string()
}

pub fn cookie_expire_str() -> String {
    COOKIE_EXPIRE_STR.to_string()
}

/// Default session cookie lifetime (7 days)
pub fn cookie_expire() -> Duration {
    Duration::from_secs(168 * 3_600)
}

pub fn http_address() -> String {
    HTTP_ADDRESS.to_string()
}

pub fn https_address() -> String {
    HTTPS_ADDRESS.to_string()
}

pub fn flush_interval_str() -> String {
    FLUSH_INTERVAL_STR.to_string()
}

pub fn provider() -> String {
    PROVIDER.to_string()
}

pub fn oidc_email_claim() -> String {
    OIDC_EMAIL_CLAIM.to_string()
}
