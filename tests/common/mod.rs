//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use gatekeeper::config::Options;
use gatekeeper::proxy::{EmailValidator, ProxyLauncher};
use gatekeeper::{Bootstrap, ProxyError};
use tempfile::NamedTempFile;

/// Launcher that keeps what it was handed instead of starting a proxy
#[derive(Clone, Default)]
pub struct RecordingLauncher(Arc<Mutex<Option<(Options, EmailValidator)>>>);

impl RecordingLauncher {
    pub fn options(&self) -> Option<Options> {
        self.0.lock().unwrap().as_ref().map(|(options, _)| options.clone())
    }

    pub fn validator(&self) -> Option<EmailValidator> {
        self.0.lock().unwrap().as_ref().map(|(_, validator)| validator.clone())
    }
}

impl ProxyLauncher for RecordingLauncher {
    fn launch(&self, options: Options, validator: EmailValidator) -> Result<(), ProxyError> {
        *self.0.lock().unwrap() = Some((options, validator));
        Ok(())
    }
}

/// A bootstrap that does not touch the global logger or start a proxy
pub fn bootstrap(launcher: &RecordingLauncher) -> Bootstrap {
    Bootstrap::new().without_global_logger().with_launcher(launcher.clone())
}

pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn write_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Flags that make the legacy schema pass validation
pub const VALID_LEGACY_ARGS: &[&str] = &[
    "--cookie-secret",
    "0123456789abcdef",
    "--email-domain",
    "example.com",
    "--client-id",
    "gatekeeper",
    "--client-secret",
    "s3cr3t",
];
