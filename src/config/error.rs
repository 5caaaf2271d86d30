//! Configuration errors
//!
//! This module defines error types for the configuration module. Each loader
//! phase wraps the lower-level error with the name of the phase that failed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Flag parsing error
#[derive(Error, Debug)]
pub enum FlagError {
    /// A flag that is not declared in the active flag set
    #[error("unknown flag: {0}")]
    Unknown(String),

    /// A recognized flag with a malformed or missing value
    #[error("{0}")]
    Invalid(String),

    /// `--help` was given; carries the rendered usage text
    #[error("help requested")]
    HelpRequested(String),
}

impl FlagError {
    pub(crate) fn from_clap(err: clap::Error) -> Self {
        use clap::error::{ContextKind, ErrorKind};

        match err.kind() {
            ErrorKind::DisplayHelp => Self::HelpRequested(err.render().to_string()),
            ErrorKind::UnknownArgument => {
                let flag = err
                    .get(ContextKind::InvalidArg)
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| first_line(&err));
                Self::Unknown(flag)
            }
            _ => Self::Invalid(first_line(&err)),
        }
    }
}

fn first_line(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string()
}

/// Configuration file error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Error reading file
    #[error("error reading configuration file {}: {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] io::Error),

    /// Error parsing configuration
    #[error("error parsing configuration: {0}")]
    Parse(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Error converting legacy options into the unified structure
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConversionError {
    /// An upstream that is not a usable URL
    #[error("could not parse upstream {0:?}: {1}")]
    InvalidUpstream(String, String),

    /// A duration that does not parse
    #[error("invalid duration for {0}: {1:?}")]
    InvalidDuration(&'static str, String),

    /// Two legacy options that would produce the same header
    #[error("conflicting header options: {0}")]
    ConflictingHeaders(String),
}

/// Loader error type
///
/// The variants mirror the loader phases so that a message always tells
/// which step failed.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Strict flag parsing failed
    #[error("failed to parse flags: {0}")]
    FlagParse(#[source] FlagError),

    /// The layered file/environment/flag load failed
    #[error("failed to load config: {0}")]
    FileLoad(#[source] ConfigError),

    /// The legacy structure could not be converted
    #[error("failed to convert config: {0}")]
    Convert(#[source] ConversionError),

    /// Loading the base configuration of the alpha path failed
    #[error("failed to load core options: {0}")]
    CoreOptions(#[source] Box<LoadError>),

    /// Loading the YAML overlay failed
    #[error("failed to load alpha options: {0}")]
    AlphaLoad(#[source] ConfigError),
}

impl LoadError {
    /// The usage text if this error is a `--help` request
    pub fn help_text(&self) -> Option<&str> {
        match self {
            LoadError::FlagParse(FlagError::HelpRequested(text)) => Some(text),
            LoadError::CoreOptions(inner) => inner.help_text(),
            _ => None,
        }
    }
}

/// Semantic validation error
#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid configuration:\n  {}", .0.join("\n  "))]
pub struct ValidationError(pub Vec<String>);

/// Result type alias for configuration file operations
pub type Result<T> = std::result::Result<T, ConfigError>;
