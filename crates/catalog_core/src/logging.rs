//! Catalog logging bootstrap.
//!
//! # Responsibility
//! - Turn a [`LogConfig`] into rolling `catalog*.log` files, once per process.
//! - Keep catalog events to ids, counts and durations; record contents are
//!   never logged.
//!
//! # Invariants
//! - Without [`init_logging`] every `log` macro in the crate is a no-op, so
//!   the store and repository never depend on logging being configured.
//! - A second call with the same config is a no-op; a different config is
//!   rejected with [`LoggingError::Conflict`].
//!
//! # See also
//! - `catalog_cli` builds the config from its `--log-level`/`--log-dir` flags.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "catalog";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 4 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static ACTIVE: OnceCell<ActiveLogging> = OnceCell::new();

struct ActiveLogging {
    config: LogConfig,
    _handle: LoggerHandle,
}

/// Verbosity accepted by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parses a level name, ignoring case and surrounding spaces.
    pub fn parse(value: &str) -> Result<Self, LoggingError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LoggingError::UnsupportedLevel(value.to_string())),
        }
    }
}

/// `debug` in debug builds, `info` otherwise.
impl Default for LogLevel {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how verbosely the catalog writes its log files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub dir: PathBuf,
}

impl LogConfig {
    /// Builds a config for an absolute log directory.
    ///
    /// # Errors
    /// - `EmptyDir` / `RelativeDir` when `dir` is blank or not absolute.
    pub fn new(level: LogLevel, dir: &str) -> Result<Self, LoggingError> {
        let trimmed = dir.trim();
        if trimmed.is_empty() {
            return Err(LoggingError::EmptyDir);
        }
        let path = Path::new(trimmed);
        if !path.is_absolute() {
            return Err(LoggingError::RelativeDir(path.to_path_buf()));
        }
        Ok(Self {
            level,
            dir: path.to_path_buf(),
        })
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyDir,
    RelativeDir(PathBuf),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// Logging is already running with a different config.
    Conflict {
        active: LogConfig,
        requested: LogConfig,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyDir => write!(f, "log directory cannot be empty"),
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                dir.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs at {} in `{}`; refusing {} in `{}`",
                active.level,
                active.dir.display(),
                requested.level,
                requested.dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

/// Starts file logging for the catalog.
///
/// # Errors
/// - `CreateDir` / `Backend` when the directory or logger cannot be set up.
/// - `Conflict` when logging already runs with another config.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let active = ACTIVE.get_or_try_init(|| start(config))?;
    if active.config != *config {
        return Err(LoggingError::Conflict {
            active: active.config.clone(),
            requested: config.clone(),
        });
    }
    Ok(())
}

/// Config logging was started with, if any.
pub fn active_log_config() -> Option<&'static LogConfig> {
    ACTIVE.get().map(|active| &active.config)
}

fn start(config: &LogConfig) -> Result<ActiveLogging, LoggingError> {
    std::fs::create_dir_all(&config.dir).map_err(|source| LoggingError::CreateDir {
        dir: config.dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(config.level.as_str())?
        .log_to_file(
            FileSpec::default()
                .directory(config.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        // Why: the CLI exits right after one command; buffered lines must
        // still reach the file when the handle drops.
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    info!(
        "event=logging_init module=core status=ok level={} log_dir={} version={}",
        config.level,
        config.dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogging {
        config: config.clone(),
        _handle: handle,
    })
}

#[cfg(test)]
mod tests {
    use super::{active_log_config, init_logging, LogConfig, LogLevel, LoggingError};

    #[test]
    fn level_names_parse_in_any_case() {
        assert_eq!(LogLevel::parse("INFO").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::parse(" warning ").unwrap(), LogLevel::Warn);
        assert!(matches!(
            LogLevel::parse("loud"),
            Err(LoggingError::UnsupportedLevel(ref level)) if level == "loud"
        ));
    }

    #[test]
    fn config_requires_an_absolute_dir() {
        assert!(matches!(
            LogConfig::new(LogLevel::Info, "logs/dev"),
            Err(LoggingError::RelativeDir(_))
        ));
        assert!(matches!(
            LogConfig::new(LogLevel::Info, "  "),
            Err(LoggingError::EmptyDir)
        ));
    }

    #[test]
    fn init_is_idempotent_and_rejects_a_different_config() {
        let first = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");
        let log_dir = first.path().join("logs");
        let config = LogConfig::new(LogLevel::Info, log_dir.to_str().expect("utf-8 dir")).unwrap();

        init_logging(&config).expect("first init should succeed");
        init_logging(&config).expect("same config should be a no-op");
        assert!(log_dir.is_dir());
        assert_eq!(active_log_config(), Some(&config));

        let louder = LogConfig {
            level: LogLevel::Debug,
            ..config.clone()
        };
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::Conflict { .. })
        ));

        let elsewhere =
            LogConfig::new(LogLevel::Info, second.path().to_str().expect("utf-8 dir")).unwrap();
        let err = init_logging(&elsewhere).unwrap_err();
        assert!(err.to_string().contains("refusing"));
    }
}
