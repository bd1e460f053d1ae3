//! Registry configuration.
//!
//! This module provides the persisted settings that control how wrapped
//! methods report failures and how the registry prints its entries.

pub mod settings;

pub use settings::{
    FailureMode, LogFormat, RegistrySettings, SettingsError, SettingsManager, TraceLevel,
    get_config_path,
};
