//! Alpha configuration overlay
//!
//! The alpha schema describes upstreams, injected headers, servers and
//! providers as a structured YAML document. Every field is optional: a field
//! the document does not set leaves the base configuration untouched.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::error::{ConfigError, Result};
use crate::config::options::{Header, Options, Provider, Server, UpstreamConfig};

/// Structured overlay loaded from `--alpha-config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AlphaOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_config: Option<UpstreamConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject_request_headers: Option<Vec<Header>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject_response_headers: Option<Vec<Header>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<Server>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_server: Option<Server>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<Provider>>,
}

impl AlphaOptions {
    /// Load the overlay from a YAML file
    ///
    /// A document without content is an empty overlay. Unknown keys are
    /// rejected at every level.
    pub fn load_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let options = Self::from_yaml(&content)?;
        debug!("Loaded alpha configuration from {}", path.display());
        Ok(options)
    }

    /// Parse the overlay from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let blank = content
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
        if blank {
            return Ok(Self::default());
        }

        let document: serde_yaml::Value = serde_yaml::from_str(content)?;
        if document.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_value(document)?)
    }

    /// Extract the alpha-owned part of a unified configuration
    ///
    /// Every field of the result is set, so merging it back onto any base
    /// reproduces the alpha-owned fields of `options`.
    pub fn extract_from(options: &Options) -> Self {
        Self {
            upstream_config: Some(options.upstream_servers.clone()),
            inject_request_headers: Some(options.inject_request_headers.clone()),
            inject_response_headers: Some(options.inject_response_headers.clone()),
            server: Some(options.server.clone()),
            metrics_server: Some(options.metrics_server.clone()),
            providers: Some(options.providers.clone()),
        }
    }

    /// Render the overlay as a YAML document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Render the alpha document equivalent to a loaded configuration
pub fn render_alpha_yaml(options: &Options) -> Result<String> {
    AlphaOptions::extract_from(options).to_yaml()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const OVERLAY: &str = r#"
upstreamConfig:
  upstreams:
    - id: app
      path: /
      uri: http://127.0.0.1:8080
      flushInterval: 500ms
injectRequestHeaders:
  - name: X-Forwarded-User
    values:
      - claim: user
server:
  bindAddress: 0.0.0.0:4180
providers:
  - id: google=abc
    provider: google
    clientId: abc
"#;

    #[test]
    fn test_from_yaml() {
        let overlay = AlphaOptions::from_yaml(OVERLAY).unwrap();

        let upstreams = overlay.upstream_config.unwrap().upstreams;
        assert_eq!(upstreams.len(), 1);
        assert_eq!(upstreams[0].flush_interval, Some(std::time::Duration::from_millis(500)));

        assert_eq!(overlay.inject_request_headers.unwrap()[0].values[0].claim.as_deref(), Some("user"));
        assert_eq!(overlay.server.unwrap().bind_address, "0.0.0.0:4180");
        assert_eq!(overlay.providers.unwrap()[0].provider_type, "google");
        assert!(overlay.metrics_server.is_none());
        assert!(overlay.inject_response_headers.is_none());
    }

    #[test]
    fn test_empty_document_is_empty_overlay() {
        assert_eq!(AlphaOptions::from_yaml("").unwrap(), AlphaOptions::default());
        assert_eq!(AlphaOptions::from_yaml("# nothing here\n").unwrap(), AlphaOptions::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(AlphaOptions::from_yaml("upstreamConfig:\n  upstreams: []\nbogus: 1\n").is_err());
        assert!(AlphaOptions::from_yaml("server:\n  bindAddress: ':4180'\n  port: 4180\n").is_err());
        assert!(AlphaOptions::from_yaml(
            "injectRequestHeaders:\n  - name: X\n    values:\n      - claim: user\n        bogus: true\n"
        )
        .is_err());
    }

    #[test]
    fn test_load_yaml_missing_file() {
        let err = AlphaOptions::load_yaml(Path::new("/nonexistent/alpha.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", OVERLAY).unwrap();
        let overlay = AlphaOptions::load_yaml(file.path()).unwrap();
        assert!(overlay.upstream_config.is_some());
    }

    #[test]
    fn test_extract_sets_every_field() {
        let overlay = AlphaOptions::extract_from(&Options::default());
        assert!(overlay.upstream_config.is_some());
        assert!(overlay.inject_request_headers.is_some());
        assert!(overlay.inject_response_headers.is_some());
        assert!(overlay.server.is_some());
        assert!(overlay.metrics_server.is_some());
        assert!(overlay.providers.is_some());
    }

    #[test]
    fn test_rendered_document_loads_back() {
        let overlay = AlphaOptions::from_yaml(OVERLAY).unwrap();
        let rendered = overlay.to_yaml().unwrap();
        assert!(rendered.contains("upstreamConfig:"));
        assert!(rendered.contains("flushInterval: 500ms"));
        assert_eq!(AlphaOptions::from_yaml(&rendered).unwrap(), overlay);
    }
}
