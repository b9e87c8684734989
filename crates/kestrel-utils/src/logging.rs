//! # Logging Utilities
//!
//! Subscriber setup for Kestrel binaries.
//!
//! Events go to stderr so they never interleave with command output on
//! stdout (disassembly listings, register dumps). Optionally they are also
//! written to a file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kestrel_utils::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::from_env()).expect("Failed to initialize logging");
//! tracing::info!("ready");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Filter directives (e.g., `debug`, `kestrel_core=trace`)
//! - `KESTREL_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `KESTREL_LOG_FILE`: Also write to this file, rolled daily
//!
//! ## Filter Priority
//!
//! 1. An explicit level (e.g. from `--log-level`)
//! 2. `RUST_LOG`
//! 3. `warn`

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "KESTREL_LOG_FORMAT";
const FILE_VAR: &str = "KESTREL_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Where and how to log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    /// Output format for every sink
    pub format: LogFormat,
    /// Overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    /// Additional file sink
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read `KESTREL_LOG_FORMAT` and `KESTREL_LOG_FILE`.
    ///
    /// Unparsable values fall back to the defaults.
    pub fn from_env() -> Self
    {
        Self::from_vars(env::var(FORMAT_VAR).ok().as_deref(), env::var(FILE_VAR).ok().as_deref())
    }

    fn from_vars(format: Option<&str>, file: Option<&str>) -> Self
    {
        Self {
            format: format.and_then(|s| s.parse().ok()).unwrap_or_default(),
            level: None,
            file: file.filter(|s| !s.is_empty()).map(PathBuf::from),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    /// Log to `<dir>/<YYYY-MM-DD>-kestrel.log`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// [`LoggingError::FileError`] if the directory cannot be created.
    pub fn with_log_dir(mut self, dir: &Path) -> Result<Self, LoggingError>
    {
        fs::create_dir_all(dir)?;
        let today = Utc::now().format("%Y-%m-%d");
        self.file = Some(dir.join(format!("{today}-kestrel.log")));
        Ok(self)
    }

    fn filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(Level::from(level).to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string())),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// Returns the file writer's guard when a file sink is configured; keep it
/// alive until exit or buffered events are lost.
///
/// # Errors
///
/// [`LoggingError::InitializationFailed`] if a global subscriber is already
/// installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError>
{
    let ansi = io::stderr().is_terminal();
    let mut layers: Vec<BoxedLayer> = vec![build_layer(config.format, io::stderr, ansi, config.filter())];

    let guard = match &config.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or_default();
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(build_layer(config.format, writer, false, config.filter()));
            Some(guard)
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

fn build_layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(ansi)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_config_from_vars()
    {
        let config = LogConfig::from_vars(Some("json"), Some("/tmp/kestrel.log"));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/kestrel.log")));
        assert_eq!(config.level, None);

        let config = LogConfig::from_vars(Some("bogus"), Some(""));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_explicit_level_wins()
    {
        let config = LogConfig::default().with_level(Some(LogLevel::Debug));
        assert_eq!(config.level, Some(LogLevel::Debug));
        assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::DEBUG));

        let config = config.with_level(None);
        assert_eq!(config.level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_log_dir_uses_dated_file()
    {
        let dir = env::temp_dir().join(format!("kestrel-log-test-{}", std::process::id()));
        let config = LogConfig::default().with_log_dir(&dir).unwrap();
        let file = config.file.unwrap();
        assert_eq!(file.parent(), Some(dir.as_path()));
        assert!(file.to_string_lossy().ends_with("-kestrel.log"));
        assert!(dir.is_dir());
        let _ = fs::remove_dir_all(dir);
    }
}
