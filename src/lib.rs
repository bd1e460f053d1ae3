//! errtrap - in-process error registry
//!
//! Wrap a method once and every failure it returns is recorded in an
//! [`ErrorRegistry`] together with the receiver, the owning type, the
//! method name and a timestamp. Registered observers are notified
//! synchronously for each new entry, and the whole registry can be printed
//! as JSON records to standard error.

pub mod config;
pub mod error;
pub mod registry;

// Re-export key types for convenience
pub use {
    config::{FailureMode, LogFormat, RegistrySettings, SettingsError, SettingsManager},
    error::{ErrorReporter, RegistryError},
    registry::{
        CaughtError, ErrorRegistry, ErrorRegistryEntry, Interceptor, Observer, WrappedMethod,
        WrappedMethodMut,
    },
};
