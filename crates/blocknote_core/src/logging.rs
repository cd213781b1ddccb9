//! Editor logging bootstrap.
//!
//! # Responsibility
//! - Start the rolling file logger once per process.
//! - Derive the level from `EditorConfig` and record the editor settings in
//!   the startup event.
//! - Route panics into the log as one sanitized line.
//!
//! # Invariants
//! - Init is idempotent for the same level and directory; any other
//!   combination is rejected with `LoggingError::Conflict`.
//! - Init never panics.
//! - Events carry metadata only; block text never reaches a log line.
//!
//! # See also
//! - docs/architecture/logging.md

use crate::config::EditorConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "blocknote";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Logging bootstrap failure.
#[derive(Debug)]
pub enum LoggingError {
    /// Level is not one of `trace|debug|info|warn|error`.
    UnsupportedLevel(String),
    /// Directory is blank or relative.
    InvalidDirectory(String),
    CreateDirectory { path: PathBuf, source: std::io::Error },
    Backend(flexi_logger::FlexiLoggerError),
    /// Logger already runs with a different level or directory.
    Conflict {
        active_level: &'static str,
        active_dir: PathBuf,
    },
}

impl LoggingError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedLevel(_) => "The log level setting is not recognized.",
            Self::Conflict { .. } => "Logging is already running with other settings.",
            _ => "Diagnostic logs could not be written.",
        }
    }
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidDirectory(dir) => {
                write!(f, "log directory must be a non-empty absolute path, got `{dir}`")
            }
            Self::CreateDirectory { path, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                path.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::Conflict {
                active_level,
                active_dir,
            } => write!(
                f,
                "logging already initialized with level `{active_level}` at `{}`",
                active_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts logging for an editor host; the level comes from `config.log_level`
/// or [`default_log_level`].
///
/// # Errors
/// - Same as [`init_logging`].
pub fn init_logging_with_config(
    config: &EditorConfig,
    log_dir: impl AsRef<Path>,
) -> Result<(), LoggingError> {
    let level = config.log_level.as_deref().unwrap_or(default_log_level());
    let started = start(level, log_dir.as_ref())?;
    if started {
        info!(
            "event=editor_config module=logging status=ok autosave_quiet_ms={} list_exit={:?} restructure_max_chars={}",
            config.autosave_quiet_ms, config.list_exit_policy, config.restructure_max_input_chars
        );
    }
    Ok(())
}

/// Starts rolling file logs in `log_dir` at `level`.
///
/// # Errors
/// - `UnsupportedLevel` / `InvalidDirectory` for bad input.
/// - `Conflict` when already running with other settings.
/// - `CreateDirectory` / `Backend` when the logger cannot start.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    start(level, log_dir.as_ref()).map(|_| ())
}

/// `(level, directory)` of the running logger, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Returns `true` when this call started the logger.
fn start(level: &str, log_dir: &Path) -> Result<bool, LoggingError> {
    let level = normalize_level(level)?;
    let log_dir = normalize_log_dir(log_dir)?;

    let mut started = false;
    let active = ACTIVE.get_or_try_init(|| {
        started = true;
        launch(level, &log_dir)
    })?;
    if active.level != level || active.log_dir != log_dir {
        return Err(LoggingError::Conflict {
            active_level: active.level,
            active_dir: active.log_dir.clone(),
        });
    }
    Ok(started)
}

fn launch(level: &'static str, log_dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDirectory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::try_with_str(level)
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        // [YYYY-MM-DD HH:MM:SS.ffffff TZ] LEVEL [module] file:line: message
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "event=editor_start module=logging status=ok platform={} version={} level={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        level
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    let raw = log_dir.to_string_lossy();
    let trimmed = raw.trim();
    if trimmed.is_empty() || !Path::new(trimmed).is_absolute() {
        return Err(LoggingError::InvalidDirectory(trimmed.to_string()));
    }
    Ok(PathBuf::from(trimmed))
}

/// Runs once, from the logger's first successful start.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            one_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous(panic_info);
    }));
}

/// Panic payloads may quote note text: flattened to one line and capped.
fn one_line(value: &str, max_chars: usize) -> String {
    let mut line: String = value
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .take(max_chars)
        .collect();
    if value.chars().count() > max_chars {
        line.push_str("...");
    }
    line
}
