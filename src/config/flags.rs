//! Flag declaration registry
//!
//! A [`FlagSet`] declares flags once and can parse an argument list in two
//! configurations: [`ParseMode::Lenient`] silently drops every flag the set
//! does not declare, [`ParseMode::Strict`] rejects them. Both are backed by
//! the same `clap` command built from the declarations.
//!
//! Only values given explicitly on the command line are reported by
//! [`ParsedFlags`]; defaults belong to the option structures, so that a flag
//! overrides a file value only when the user actually typed it.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::config::error::FlagError;

/// Value shape of a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// `--flag` or `--flag=true|false`
    Bool,
    /// Signed integer
    Int,
    /// Single string, last occurrence wins
    String,
    /// Repeatable and comma separated
    StringList,
}

impl FlagKind {
    /// Whether `--flag value` consumes the following argument
    pub fn takes_value(self) -> bool {
        !matches!(self, FlagKind::Bool)
    }
}

/// A single flag declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    /// Long flag name without dashes
    pub name: &'static str,
    /// Configuration key the flag overrides
    pub key: &'static str,
    /// Value shape
    pub kind: FlagKind,
    /// Help text
    pub help: &'static str,
}

impl FlagSpec {
    pub const fn bool(name: &'static str, key: &'static str, help: &'static str) -> Self {
        Self { name, key, kind: FlagKind::Bool, help }
    }

    pub const fn int(name: &'static str, key: &'static str, help: &'static str) -> Self {
        Self { name, key, kind: FlagKind::Int, help }
    }

    pub const fn string(name: &'static str, key: &'static str, help: &'static str) -> Self {
        Self { name, key, kind: FlagKind::String, help }
    }

    pub const fn list(name: &'static str, key: &'static str, help: &'static str) -> Self {
        Self { name, key, kind: FlagKind::StringList, help }
    }

    fn to_arg(&self) -> Arg {
        let arg = Arg::new(self.name).long(self.name).help(self.help);
        match self.kind {
            FlagKind::Bool => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(clap::value_parser!(bool)),
            FlagKind::Int => arg
                .action(ArgAction::Set)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
            FlagKind::String => arg
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(String)),
            FlagKind::StringList => arg
                .action(ArgAction::Append)
                .value_delimiter(',')
                .value_parser(clap::value_parser!(String)),
        }
    }
}

/// Parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Undeclared flags are dropped without error
    Lenient,
    /// Undeclared flags are an error; `--help` renders usage
    Strict,
}

/// A value given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<String>),
}

impl From<FlagValue> for config::ValueKind {
    fn from(value: FlagValue) -> Self {
        match value {
            FlagValue::Bool(b) => config::ValueKind::Boolean(b),
            FlagValue::Int(i) => config::ValueKind::I64(i),
            FlagValue::String(s) => config::ValueKind::String(s),
            FlagValue::List(items) => {
                config::ValueKind::Array(items.into_iter().map(config::Value::from).collect())
            }
        }
    }
}

/// Id of the hidden argument collecting non-flag tokens
const POSITIONAL: &str = "positional-args";

/// Result of parsing an argument list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    explicit: Vec<(FlagSpec, FlagValue)>,
    positional: Vec<String>,
}

impl ParsedFlags {
    /// The value of a flag that was given explicitly
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.explicit
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, value)| value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(FlagValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FlagValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FlagValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Arguments that are neither flags nor flag values
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// `(configuration key, value)` pairs for every explicit flag
    pub fn overrides(&self) -> impl Iterator<Item = (&'static str, &FlagValue)> {
        self.explicit.iter().map(|(spec, value)| (spec.key, value))
    }
}

/// A named collection of flag declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet {
    name: &'static str,
    flags: Vec<FlagSpec>,
}

impl FlagSet {
    /// Create an empty flag set
    pub fn new(name: &'static str) -> Self {
        Self { name, flags: Vec::new() }
    }

    /// Create a flag set from a list of declarations
    pub fn with_flags(name: &'static str, flags: &[FlagSpec]) -> Self {
        let mut set = Self::new(name);
        for spec in flags {
            set.add(spec.clone());
        }
        set
    }

    /// Declare a flag; a second declaration of the same name is ignored
    pub fn add(&mut self, spec: FlagSpec) {
        if !self.contains(spec.name) {
            self.flags.push(spec);
        }
    }

    /// Declare every flag of `other` that this set does not declare yet
    pub fn add_flag_set(&mut self, other: &FlagSet) {
        for spec in &other.flags {
            self.add(spec.clone());
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&FlagSpec> {
        self.flags.iter().find(|spec| spec.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn flags(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.iter()
    }

    /// Build the `clap` command for this set
    pub fn command(&self, mode: ParseMode) -> Command {
        let command = Command::new(self.name)
            .no_binary_name(true)
            .args_override_self(true)
            .disable_version_flag(true)
            .args(self.flags.iter().map(FlagSpec::to_arg));

        match mode {
            ParseMode::Lenient => command.disable_help_flag(true),
            ParseMode::Strict => command.arg(
                Arg::new(POSITIONAL)
                    .action(ArgAction::Append)
                    .num_args(1..)
                    .hide(true)
                    .value_parser(clap::value_parser!(String)),
            ),
        }
    }

    /// Parse `args` (without the program name)
    pub fn parse(&self, args: &[String], mode: ParseMode) -> Result<ParsedFlags, FlagError> {
        let args = match mode {
            ParseMode::Lenient => self.retain_known(args),
            ParseMode::Strict => args.to_vec(),
        };

        let matches = self
            .command(mode)
            .try_get_matches_from(args)
            .map_err(FlagError::from_clap)?;

        let mut parsed = ParsedFlags::default();
        if mode == ParseMode::Strict {
            parsed.positional = matches
                .try_get_many::<String>(POSITIONAL)
                .map_err(|e| FlagError::Invalid(e.to_string()))?
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
        }
        for spec in &self.flags {
            if matches.value_source(spec.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Some(value) = explicit_value(&matches, spec)? {
                parsed.explicit.push((spec.clone(), value));
            }
        }

        Ok(parsed)
    }

    /// Keep only the arguments that belong to declared flags
    ///
    /// An undeclared `--flag` without `=` is assumed to own the following
    /// argument unless that argument looks like a flag itself.
    fn retain_known(&self, args: &[String]) -> Vec<String> {
        let mut kept = Vec::new();
        let mut iter = args.iter().peekable();

        while let Some(arg) = iter.next() {
            if arg == "--" {
                break;
            }
            if !arg.starts_with('-') || arg == "-" {
                continue;
            }

            let body = arg.trim_start_matches('-');
            let (name, inline_value) = match body.split_once('=') {
                Some((name, _)) => (name, true),
                None => (body, false),
            };

            match self.lookup(name) {
                Some(spec) if arg.starts_with("--") => {
                    kept.push(arg.clone());
                    if !inline_value && spec.kind.takes_value() {
                        if let Some(value) = iter.next() {
                            kept.push(value.clone());
                        }
                    }
                }
                _ => {
                    if !inline_value && iter.peek().map_or(false, |next| !next.starts_with('-')) {
                        iter.next();
                    }
                }
            }
        }

        kept
    }
}

fn explicit_value(matches: &ArgMatches, spec: &FlagSpec) -> Result<Option<FlagValue>, FlagError> {
    let invalid = |err: clap::parser::MatchesError| FlagError::Invalid(format!("--{}: {}", spec.name, err));

    let value = match spec.kind {
        FlagKind::Bool => matches
            .try_get_one::<bool>(spec.name)
            .map_err(invalid)?
            .map(|b| FlagValue::Bool(*b)),
        FlagKind::Int => matches
            .try_get_one::<i64>(spec.name)
            .map_err(invalid)?
            .map(|i| FlagValue::Int(*i)),
        FlagKind::String => matches
            .try_get_one::<String>(spec.name)
            .map_err(invalid)?
            .map(|s| FlagValue::String(s.clone())),
        FlagKind::StringList => matches
            .try_get_many::<String>(spec.name)
            .map_err(invalid)?
            .map(|values| FlagValue::List(values.cloned().collect())),
    };

    Ok(value)
}
