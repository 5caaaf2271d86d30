//! Startup sequence
//!
//! [`Bootstrap::run`] is the composition root: it resolves the bootstrap
//! flags, installs the logging bridge, picks a configuration schema, loads
//! and validates the configuration and finally hands it to the proxy.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, error, trace, warn, Level};

use crate::common::{BootstrapError, LoggingContext, Result, Sinks};
use crate::config::{
    load_alpha, load_legacy, render_alpha_yaml, DefaultValidator, FlagError, FlagSet, FlagSpec, LoadError, Options,
    OptionsValidator, ParseMode, APP_FLAG_SET,
};
use crate::proxy::{DefaultLauncher, EmailValidator, ProxyLauncher};
use crate::{APP_NAME, RUSTC_VERSION, VERSION};

/// Flags read before any configuration is loaded
pub const BOOTSTRAP_FLAGS: &[FlagSpec] = &[
    FlagSpec::string("config", "config", "path to config file"),
    FlagSpec::string(
        "alpha-config",
        "alpha_config",
        "path to alpha config file (use at your own risk - the structure in this config file may change between minor releases)",
    ),
    FlagSpec::bool(
        "convert-config-to-alpha",
        "convert_config_to_alpha",
        "if true, the proxy will load configuration as normal and convert existing configuration to the alpha config structure, and print it to stdout",
    ),
    FlagSpec::bool("version", "version", "print version string"),
    FlagSpec::int("log-level", "log_level", "standard logging level (higher numbers will be more verbose)"),
];

/// The bootstrap flag registry
pub fn bootstrap_flag_set() -> FlagSet {
    FlagSet::with_flags(APP_FLAG_SET, BOOTSTRAP_FLAGS)
}

/// Values of the bootstrap flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapFlags {
    pub config: Option<PathBuf>,
    pub alpha_config: Option<PathBuf>,
    pub convert_config_to_alpha: bool,
    pub version: bool,
    pub log_level: i64,
}

/// Extract the bootstrap flags, ignoring every other flag
///
/// Fails only when a bootstrap flag carries a malformed value.
pub fn resolve_bootstrap_flags(args: &[String]) -> std::result::Result<BootstrapFlags, FlagError> {
    let parsed = bootstrap_flag_set().parse(args, ParseMode::Lenient)?;

    let path = |name: &str| parsed.get_str(name).filter(|p| !p.is_empty()).map(PathBuf::from);

    Ok(BootstrapFlags {
        config: path("config"),
        alpha_config: path("alpha-config"),
        convert_config_to_alpha: parsed.get_bool("convert-config-to-alpha").unwrap_or(false),
        version: parsed.get_bool("version").unwrap_or(false),
        log_level: parsed.get_int("log-level").unwrap_or(0),
    })
}

/// Which configuration schema to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChoice {
    /// Flat flags and TOML only
    Legacy,
    /// Core options plus the YAML overlay at the given path
    Alpha(PathBuf),
}

/// Decide the schema from the bootstrap flags
pub fn select_schema(flags: &BootstrapFlags) -> Result<SchemaChoice> {
    match &flags.alpha_config {
        Some(_) if flags.convert_config_to_alpha => Err(BootstrapError::IncompatibleFlags),
        Some(path) => Ok(SchemaChoice::Alpha(path.clone())),
        None => Ok(SchemaChoice::Legacy),
    }
}

/// How a successful bootstrap ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The version string was printed
    Version,
    /// Usage was printed
    Help,
    /// The alpha document was printed
    Converted,
    /// The proxy ran and shut down
    Started,
}

/// Composition root
pub struct Bootstrap {
    sinks: Sinks,
    install_logger: bool,
    validator: Box<dyn OptionsValidator>,
    launcher: Box<dyn ProxyLauncher>,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            sinks: Sinks::default(),
            install_logger: true,
            validator: Box::new(DefaultValidator),
            launcher: Box::new(DefaultLauncher),
        }
    }
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route log output to the given sinks instead of stderr
    pub fn with_sinks(mut self, sinks: Sinks) -> Self {
        self.sinks = sinks;
        self
    }

    /// Configure the logging bridge without installing it process-wide
    pub fn without_global_logger(mut self) -> Self {
        self.install_logger = false;
        self
    }

    pub fn with_validator(mut self, validator: impl OptionsValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_launcher(mut self, launcher: impl ProxyLauncher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// Run the startup sequence
    ///
    /// `args` excludes the program name. Only the version string, usage text
    /// and converted configuration are written to `out`.
    pub fn run(self, args: &[String], out: &mut dyn Write) -> Result<Outcome> {
        let early = resolve_bootstrap_flags(args);

        let verbosity = early.as_ref().map(|flags| flags.log_level).unwrap_or(0);
        let logging = LoggingContext::configure(verbosity, self.sinks)?;
        if self.install_logger {
            logging.install()?;
        }

        let flags = match early {
            Ok(flags) => flags,
            Err(err) => {
                error!("Invalid bootstrap flags: {}", err);
                return Err(err.into());
            }
        };
        debug!("Bootstrap flags: {:?}", flags);

        if flags.version {
            writeln!(out, "{} {} (built with {})", APP_NAME, VERSION, RUSTC_VERSION).map_err(BootstrapError::Output)?;
            return Ok(Outcome::Version);
        }

        let schema = select_schema(&flags)?;
        let options = match load_configuration(&schema, flags.config.as_deref(), args) {
            Ok(options) => options,
            Err(err) => match err.help_text() {
                Some(help) => {
                    out.write_all(help.as_bytes()).map_err(BootstrapError::Output)?;
                    return Ok(Outcome::Help);
                }
                None => return Err(err.into()),
            },
        };

        // Not scrubbed: may contain secrets
        if logging.enabled(Level::Trace) {
            match serde_json::to_string(&options) {
                Ok(json) => trace!("Observed configuration: {}", json),
                Err(err) => warn!("Unable to render observed configuration: {}", err),
            }
        }

        if flags.convert_config_to_alpha {
            let yaml = render_alpha_yaml(&options).map_err(|e| BootstrapError::Convert(e.to_string()))?;
            out.write_all(yaml.as_bytes()).map_err(BootstrapError::Output)?;
            return Ok(Outcome::Converted);
        }

        self.validator.validate(&options)?;

        let validator = EmailValidator::new(&options.email_domains, options.authenticated_emails_file.as_deref())?;
        self.launcher.launch(options, validator)?;

        Ok(Outcome::Started)
    }
}

fn load_configuration(
    schema: &SchemaChoice,
    config_path: Option<&Path>,
    args: &[String],
) -> std::result::Result<Options, LoadError> {
    let extra_flags = bootstrap_flag_set();

    match schema {
        SchemaChoice::Alpha(alpha_config) => {
            warn!(
                "WARNING: You are using alpha configuration. The structure in this configuration file may change without notice. You MUST remove conflicting options from your existing configuration."
            );
            load_alpha(config_path, alpha_config, &extra_flags, args)
        }
        SchemaChoice::Legacy => load_legacy(config_path, &extra_flags, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_ignores_unknown_flags() {
        let flags = resolve_bootstrap_flags(&args(&[
            "--upstream",
            "http://127.0.0.1:8080",
            "--config",
            "/etc/gatekeeper.cfg",
            "--cookie-secure=false",
            "--log-level",
            "4",
            "--version",
        ]))
        .unwrap();

        assert_eq!(flags.config, Some(PathBuf::from("/etc/gatekeeper.cfg")));
        assert_eq!(flags.log_level, 4);
        assert!(flags.version);
        assert!(flags.alpha_config.is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        assert_eq!(resolve_bootstrap_flags(&[]).unwrap(), BootstrapFlags::default());
    }

    #[test]
    fn test_empty_paths_are_unset() {
        let flags = resolve_bootstrap_flags(&args(&["--config=", "--alpha-config", ""])).unwrap();
        assert!(flags.config.is_none());
        assert!(flags.alpha_config.is_none());
    }

    #[test]
    fn test_resolve_rejects_bad_log_level() {
        let err = resolve_bootstrap_flags(&args(&["--log-level", "loud"])).unwrap_err();
        assert!(matches!(err, FlagError::Invalid(_)));
    }

    #[test]
    fn test_select_schema() {
        let legacy = BootstrapFlags::default();
        assert_eq!(select_schema(&legacy).unwrap(), SchemaChoice::Legacy);

        let alpha = BootstrapFlags {
            alpha_config: Some(PathBuf::from("alpha.yaml")),
            ..BootstrapFlags::default()
        };
        assert_eq!(select_schema(&alpha).unwrap(), SchemaChoice::Alpha(PathBuf::from("alpha.yaml")));

        let converting = BootstrapFlags {
            convert_config_to_alpha: true,
            ..BootstrapFlags::default()
        };
        assert_eq!(select_schema(&converting).unwrap(), SchemaChoice::Legacy);
    }

    #[test]
    fn test_select_schema_rejects_alpha_with_convert() {
        let flags = BootstrapFlags {
            alpha_config: Some(PathBuf::from("/does/not/exist.yaml")),
            convert_config_to_alpha: true,
            ..BootstrapFlags::default()
        };
        assert!(matches!(select_schema(&flags), Err(BootstrapError::IncompatibleFlags)));
    }
}
