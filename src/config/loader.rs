//! Configuration loading functionality
//!
//! One loader per schema. Both parse the full argument list strictly against
//! their own flag set extended by the bootstrap flags, then resolve values
//! through the layered source.

use std::path::Path;

use log::{debug, info, warn};

use crate::config::alpha::AlphaOptions;
use crate::config::error::LoadError;
use crate::config::flags::{FlagSet, ParseMode};
use crate::config::legacy::{legacy_flag_set, LegacyOptions};
use crate::config::merger::ConfigMerger;
use crate::config::options::{options_flag_set, CoreOptions, Options};
use crate::config::source::LayeredSource;

fn layered_source(
    mut flag_set: FlagSet,
    config_path: Option<&Path>,
    extra_flags: &FlagSet,
    args: &[String],
) -> Result<LayeredSource, LoadError> {
    flag_set.add_flag_set(extra_flags);

    let parsed = flag_set.parse(args, ParseMode::Strict).map_err(LoadError::FlagParse)?;
    if !parsed.positional().is_empty() {
        warn!("Ignoring positional arguments: {}", parsed.positional().join(" "));
    }
    LayeredSource::build(config_path, &flag_set, &parsed).map_err(LoadError::FileLoad)
}

/// Load the legacy schema and convert it to the unified structure
pub fn load_legacy(config_path: Option<&Path>, extra_flags: &FlagSet, args: &[String]) -> Result<Options, LoadError> {
    let source = layered_source(legacy_flag_set(), config_path, extra_flags, args)?;
    let legacy = LegacyOptions::load(&source).map_err(LoadError::FileLoad)?;
    legacy.to_options().map_err(LoadError::Convert)
}

/// Load the core options only; alpha-owned options keep their defaults
pub fn load_options(config_path: Option<&Path>, extra_flags: &FlagSet, args: &[String]) -> Result<Options, LoadError> {
    let source = layered_source(options_flag_set(), config_path, extra_flags, args)?;
    let core: CoreOptions = source.deserialize().map_err(LoadError::FileLoad)?;
    Options::from_core(core).map_err(LoadError::Convert)
}

/// Load the core options and apply the YAML overlay on top
pub fn load_alpha(
    config_path: Option<&Path>,
    alpha_config_path: &Path,
    extra_flags: &FlagSet,
    args: &[String],
) -> Result<Options, LoadError> {
    let base = load_options(config_path, extra_flags, args).map_err(|e| LoadError::CoreOptions(Box::new(e)))?;
    debug!("Loaded core options");

    let overlay = AlphaOptions::load_yaml(alpha_config_path).map_err(LoadError::AlphaLoad)?;
    info!("Applying alpha configuration from {}", alpha_config_path.display());

    Ok(base.merge(&overlay))
}
