//! Editor configuration.
//!
//! # Responsibility
//! - Define tunables for autosave, list exit and AI restructuring.
//! - Load them from a camelCase JSON file with safe fallbacks.
//!
//! # Invariants
//! - A loaded configuration always passes `validate()`.
//! - Missing or corrupt files yield defaults, never errors.
//!
//! # See also
//! - docs/architecture/logging.md

use crate::keyboard::ListExitPolicy;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_AUTOSAVE_QUIET_MS: u64 = 1000;
pub const MIN_AUTOSAVE_QUIET_MS: u64 = 50;
pub const MAX_AUTOSAVE_QUIET_MS: u64 = 60_000;
pub const DEFAULT_RESTRUCTURE_MAX_INPUT_CHARS: usize = 20_000;

/// Per-session editor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Quiet period after the last edit before autosave writes.
    pub autosave_quiet_ms: u64,
    pub list_exit_policy: ListExitPolicy,
    /// Longest flattened text sent to the structuring service.
    pub restructure_max_input_chars: usize,
    /// Optional log level override (`trace`..`error`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_quiet_ms: DEFAULT_AUTOSAVE_QUIET_MS,
            list_exit_policy: ListExitPolicy::default(),
            restructure_max_input_chars: DEFAULT_RESTRUCTURE_MAX_INPUT_CHARS,
            log_level: None,
        }
    }
}

/// Configuration parse/validation error.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Io(std::io::Error),
    /// Field holds a value outside its accepted range.
    OutOfRange {
        field: &'static str,
        value: u64,
    },
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Parse(_) => "Editor settings could not be read.",
            Self::Io(_) => "Editor settings could not be saved.",
            Self::OutOfRange { .. } => "An editor setting is out of range.",
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid editor config: {err}"),
            Self::Io(err) => write!(f, "editor config io failed: {err}"),
            Self::OutOfRange { field, value } => {
                write!(f, "editor config field `{field}` out of range: {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::OutOfRange { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl EditorConfig {
    /// Parses and validates a JSON document; absent fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_AUTOSAVE_QUIET_MS..=MAX_AUTOSAVE_QUIET_MS).contains(&self.autosave_quiet_ms) {
            return Err(ConfigError::OutOfRange {
                field: "autosaveQuietMs",
                value: self.autosave_quiet_ms,
            });
        }
        if self.restructure_max_input_chars == 0 {
            return Err(ConfigError::OutOfRange {
                field: "restructureMaxInputChars",
                value: 0,
            });
        }
        Ok(())
    }

    pub fn autosave_quiet(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }
}

/// Loads config from `path`; returns defaults if the file is missing or corrupt.
pub fn load_config(path: impl AsRef<Path>) -> EditorConfig {
    let raw = match std::fs::read_to_string(path.as_ref()) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("event=config_load module=config status=default reason=missing");
            return EditorConfig::default();
        }
        Err(err) => {
            warn!(
                "event=config_load module=config status=default reason=io_error error={}",
                err
            );
            return EditorConfig::default();
        }
    };

    match EditorConfig::from_json(&raw) {
        Ok(config) => {
            info!("event=config_load module=config status=ok");
            config
        }
        Err(err) => {
            warn!(
                "event=config_load module=config status=default reason=invalid error={}",
                err
            );
            EditorConfig::default()
        }
    }
}

/// Writes config as pretty JSON, creating parent directories as needed.
pub fn save_config(path: impl AsRef<Path>, config: &EditorConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}
