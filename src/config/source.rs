//! Layered configuration source
//!
//! Values are resolved from, lowest priority first: serde defaults of the
//! target structure, the TOML configuration file, `GATEKEEPER_*` environment
//! variables, and flags given explicitly on the command line.

use std::path::Path;

use config::{Config, Environment, File, FileFormat, Map, Source, Value};
use log::debug;
use serde::de::DeserializeOwned;

use crate::config::defaults::ENV_PREFIX;
use crate::config::error::{ConfigError, Result};
use crate::config::flags::{FlagKind, FlagSet, ParsedFlags};

/// A fully layered configuration, ready to be deserialized section by section
#[derive(Debug, Clone)]
pub struct LayeredSource {
    config: Config,
}

impl LayeredSource {
    /// Build the layers for the flags declared in `flag_set`
    ///
    /// A `None` path means no configuration file; a path that does not exist
    /// is an error.
    pub fn build(config_path: Option<&Path>, flag_set: &FlagSet, parsed: &ParsedFlags) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            debug!("Loading configuration file: {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(EnvironmentLayer {
            list_keys: flag_set
                .flags()
                .filter(|spec| spec.kind == FlagKind::StringList)
                .map(|spec| spec.key)
                .collect(),
        });

        for (key, value) in parsed.overrides() {
            debug!("Command line override: {}", key);
            builder = builder.set_override(key, value.clone())?;
        }

        Ok(Self { config: builder.build()? })
    }

    /// Deserialize one section; keys the section does not know are ignored
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(self.config.clone().try_deserialize()?)
    }
}

const LIST_SEPARATOR: char = ',';

/// `GATEKEEPER_*` variables
///
/// Values stay strings so that digit-only secrets and ids survive intact;
/// only list keys are split on commas.
#[derive(Debug, Clone)]
struct EnvironmentLayer {
    list_keys: Vec<&'static str>,
}

impl Source for EnvironmentLayer {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<Map<String, Value>, config::ConfigError> {
        let mut values = Environment::with_prefix(ENV_PREFIX).prefix_separator("_").collect()?;

        for key in &self.list_keys {
            if let Some(value) = values.remove(*key) {
                let origin = value.origin().map(str::to_string);
                let items: Vec<Value> = value
                    .into_string()?
                    .split(LIST_SEPARATOR)
                    .map(|item| Value::new(origin.as_ref(), item))
                    .collect();
                values.insert(key.to_string(), Value::new(origin.as_ref(), items));
            }
        }

        Ok(values)
    }
}
