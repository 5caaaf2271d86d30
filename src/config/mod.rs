//! Configuration module
//!
//! This module handles application configuration: flag declaration and
//! parsing, the layered file/environment/flag source, the legacy and alpha
//! schemas, and validation of the unified [`Options`].

pub mod alpha;
pub mod defaults;
pub mod duration;
pub mod error;
pub mod flags;
pub mod legacy;
pub mod loader;
pub mod merger;
pub mod options;
pub mod source;
pub mod validator;

// Re-export types and traits
pub use self::alpha::{render_alpha_yaml, AlphaOptions};
pub use self::error::{ConfigError, ConversionError, FlagError, LoadError, ValidationError};
pub use self::flags::{FlagKind, FlagSet, FlagSpec, FlagValue, ParseMode, ParsedFlags};
pub use self::legacy::{legacy_flag_set, LegacyOptions};
pub use self::loader::{load_alpha, load_legacy, load_options};
pub use self::merger::ConfigMerger;
pub use self::options::{options_flag_set, Options};
pub use self::validator::{DefaultValidator, OptionsValidator};

// Export constants needed externally
pub use defaults::{APP_FLAG_SET, ENV_PREFIX};
