//! Registry settings with XDG Base Directory compliance.
//!
//! This module loads and persists the registry's behavior knobs (failure
//! mode, log format, tracing of recorded entries) as a JSON file in the
//! user's config directory.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// What a wrapped method returns to its caller after a failure was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Return the "no result" value and drop the error (default).
    #[default]
    Swallow,
    /// Return the recorded entry to the caller as an error.
    Rethrow,
}

/// Layout of the records written by `log_registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One compact JSON object per line (default).
    #[default]
    Json,
    /// Indented multi-line JSON objects.
    Pretty,
}

/// Severity used for the tracing event emitted when an entry is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    /// `tracing::error!` (default).
    #[default]
    Error,
    /// `tracing::warn!`.
    Warn,
}

/// Serializable registry settings with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Behavior of wrapped methods after a failure was recorded.
    pub failure_mode: FailureMode,
    /// Output layout of `log_registry`.
    pub log_format: LogFormat,
    /// Whether recording an entry also emits a tracing event.
    pub trace_records: bool,
    /// Severity of the tracing event emitted for recorded entries.
    pub trace_level: TraceLevel,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::Swallow,
            log_format: LogFormat::Json,
            trace_records: true,
            trace_level: TraceLevel::Error,
        }
    }
}

/// Handles loading and saving of registry settings.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe settings storage.
    settings: RwLock<RegistrySettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with the default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path.
    ///
    /// A missing file yields default settings; nothing is written until
    /// [`SettingsManager::update_settings`] is called.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the file exists but cannot be read or parsed.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        let settings = if config_path.exists() {
            debug!("Loading registry settings from {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("No settings file at {:?}, using defaults", config_path);
            RegistrySettings::default()
        };

        Ok(Self {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, RegistrySettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Replaces the settings and saves them to disk.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` for contradictory settings, or an
    /// IO/serialization error if the file cannot be written.
    pub fn update_settings(&self, new_settings: RegistrySettings) -> Result<(), SettingsError> {
        validate(&new_settings)?;
        *self.settings.write() = new_settings;
        self.save_settings()
    }

    fn save_settings(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            create_dir_all(parent)?;
        }
        debug!("Saving registry settings to {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Rejects a non-default trace level while record tracing is off.
fn validate(settings: &RegistrySettings) -> Result<(), SettingsError> {
    if !settings.trace_records && settings.trace_level != TraceLevel::default() {
        return Err(SettingsError::InvalidValue {
            reason: "trace_level set while trace_records is disabled".to_string(),
        });
    }
    Ok(())
}

/// Path of the settings file under the XDG config directory.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_config_home();
    config_dir.push("errtrap");
    config_dir.push("settings.json");
    config_dir
}

/// Uses `XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
fn get_xdg_config_home() -> PathBuf {
    if let Ok(config_home) = var("XDG_CONFIG_HOME")
        && !config_home.is_empty()
    {
        return PathBuf::from(config_home);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(".config");
        return path;
    }

    PathBuf::from(".")
}
