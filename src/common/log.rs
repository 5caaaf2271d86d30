//! Logging bridge
//!
//! Every crate in the dependency tree reports through the `log` facade. This
//! module installs, exactly once per process, a `log::Log` implementation
//! that redirects those records into the application's own sinks:
//! informational lines go to one sink, warnings and errors to another.
//!
//! The filtering itself is delegated to two `env_logger` loggers, one per
//! severity route. Both are configured to write into an application sink
//! instead of stderr and to emit the bare message; the sink owns the line
//! prefix.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::Local;
use env_logger::{Target, WriteStyle};
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use thiserror::Error;

/// Environment variable with extra per-module filter directives
pub const LOG_FILTER_ENV: &str = "GATEKEEPER_LOG";

/// Run-once guard for the process-wide logger
static INSTALLED: OnceCell<()> = OnceCell::new();

/// Logging bridge error type
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LogBridgeError {
    /// The requested verbosity is not a valid level
    #[error("could not set log level: {0} is not a valid verbosity (must be >= 0)")]
    InvalidVerbosity(i64),

    /// A logger was already installed for this process
    #[error("logging bridge is already installed")]
    AlreadyInstalled,
}

/// Map a numeric verbosity onto a `log` level filter
///
/// 0 keeps informational output, 1 to 3 add debug output, 4 and above
/// enable trace output.
pub fn verbosity_filter(verbosity: i64) -> Result<LevelFilter, LogBridgeError> {
    match verbosity {
        v if v < 0 => Err(LogBridgeError::InvalidVerbosity(v)),
        0 => Ok(LevelFilter::Info),
        1..=3 => Ok(LevelFilter::Debug),
        _ => Ok(LevelFilter::Trace),
    }
}

/// An output owned by the application logger
///
/// Bytes written to a sink are split into lines and each complete line is
/// prefixed with a timestamp before it reaches the underlying writer.
#[derive(Clone)]
pub struct Sink {
    name: &'static str,
    inner: Arc<Mutex<SinkInner>>,
}

struct SinkInner {
    writer: Box<dyn Write + Send>,
    pending: Vec<u8>,
}

impl Sink {
    /// Create a sink around any writer
    pub fn new<W: Write + Send + 'static>(name: &'static str, writer: W) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(SinkInner {
                writer: Box::new(writer),
                pending: Vec::new(),
            })),
        }
    }

    /// A sink writing to the process stderr
    pub fn stderr(name: &'static str) -> Self {
        Self::new(name, io::stderr())
    }

}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("name", &self.name).finish()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log sink poisoned"))?;

        inner.pending.extend_from_slice(buf);
        while let Some(pos) = inner.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = inner.pending.drain(..=pos).collect();
            let prefix = Local::now().format("[%Y/%m/%d %H:%M:%S] ").to_string();
            inner.writer.write_all(prefix.as_bytes())?;
            inner.writer.write_all(&line)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log sink poisoned"))?;
        inner.writer.flush()
    }
}

/// The two destinations of the bridge
#[derive(Debug, Clone)]
pub struct Sinks {
    /// Receives info, debug and trace lines
    pub info: Sink,
    /// Receives warnings and errors
    pub error: Sink,
}

impl Default for Sinks {
    fn default() -> Self {
        Self {
            info: Sink::stderr("info"),
            error: Sink::stderr("error"),
        }
    }
}

/// Build one severity route
///
/// The route never touches stderr, writes only the message text and uses
/// the verbosity derived level plus any directives in `GATEKEEPER_LOG`.
fn build_route(level: LevelFilter, sink: Sink) -> env_logger::Logger {
    let mut builder = env_logger::Builder::new();
    builder
        .target(Target::Pipe(Box::new(sink)))
        .write_style(WriteStyle::Never)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .filter_level(level)
        .parse_env(env_logger::Env::new().filter(LOG_FILTER_ENV));
    builder.build()
}

/// `log::Log` implementation that routes each record to exactly one sink
pub struct BridgeLogger {
    info: env_logger::Logger,
    error: env_logger::Logger,
}

impl BridgeLogger {
    /// Most verbose level either route lets through
    pub fn max_level(&self) -> LevelFilter {
        self.info.filter().max(self.error.filter())
    }

    fn route(&self, level: Level) -> &env_logger::Logger {
        match level {
            Level::Error | Level::Warn => &self.error,
            Level::Info | Level::Debug | Level::Trace => &self.info,
        }
    }
}

impl Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.route(metadata.level()).enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        self.route(record.level()).log(record);
    }

    fn flush(&self) {
        self.info.flush();
        self.error.flush();
    }
}

struct SharedBridge(Arc<BridgeLogger>);

impl Log for SharedBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.0.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        self.0.log(record);
    }

    fn flush(&self) {
        self.0.flush();
    }
}

/// Process logging state
///
/// Constructed once at startup from the `--log-level` verbosity and handed
/// by reference to whatever needs to know how verbose the process is.
pub struct LoggingContext {
    bridge: Arc<BridgeLogger>,
}

impl fmt::Debug for LoggingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingContext")
            .field("max_level", &self.bridge.max_level())
            .finish()
    }
}

impl LoggingContext {
    /// Configure the bridge for the given verbosity
    ///
    /// A negative verbosity is a user error.
    pub fn configure(verbosity: i64, sinks: Sinks) -> Result<Self, LogBridgeError> {
        let level = verbosity_filter(verbosity)?;
        let bridge = BridgeLogger {
            info: build_route(level, sinks.info),
            error: build_route(level, sinks.error),
        };

        Ok(Self {
            bridge: Arc::new(bridge),
        })
    }

    /// Install the bridge as the process-wide `log` backend
    ///
    /// May succeed only once per process.
    pub fn install(&self) -> Result<(), LogBridgeError> {
        INSTALLED
            .set(())
            .map_err(|_| LogBridgeError::AlreadyInstalled)?;
        log::set_boxed_logger(Box::new(SharedBridge(Arc::clone(&self.bridge))))
            .map_err(|_| LogBridgeError::AlreadyInstalled)?;
        log::set_max_level(self.bridge.max_level());
        Ok(())
    }

    /// Whether the process-wide logger has been installed
    pub fn is_installed() -> bool {
        INSTALLED.get().is_some()
    }

    /// Whether records at `level` can pass the verbosity filter or a
    /// `GATEKEEPER_LOG` directive
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.bridge.max_level()
    }

    /// Direct access to the bridge, bypassing the global facade
    pub fn logger(&self) -> &BridgeLogger {
        &self.bridge
    }
}
