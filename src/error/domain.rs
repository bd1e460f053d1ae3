//! Domain-specific error types using `thiserror`.
//!
//! This module defines the errors surfaced by the registry itself. Errors
//! raised by wrapped methods are never represented here directly; they are
//! captured into registry entries instead.

use std::{io::Error as IoError, result::Result as StdResult, sync::Arc};

use {anyhow::Error, serde_json::Error as SerdeJsonError, thiserror::Error};

use crate::registry::ErrorRegistryEntry;

/// Registry-related errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An observer failed while being notified of a new entry.
    ///
    /// Observers registered after the failing one were not notified.
    #[error("Observer failed for {constructor_name}::{method_name}: {source}")]
    Observer {
        /// Owner type of the wrapped method that produced the entry.
        constructor_name: String,
        /// Name of the wrapped method that produced the entry.
        method_name: String,
        /// Error returned by the observer.
        #[source]
        source: Error,
    },
    /// A wrapped method failed and the interceptor is configured to rethrow
    /// after recording.
    #[error(
        "{}::{} failed: {}",
        .entry.constructor_name(),
        .entry.method_name(),
        .entry.error().message()
    )]
    Rethrown {
        /// The entry recorded for the failure.
        entry: Arc<ErrorRegistryEntry>,
    },
    /// Writing registry records to the output sink failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    /// Encoding a registry record failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
}

impl RegistryError {
    /// Returns the recorded entry if this is a rethrown failure.
    #[must_use]
    pub fn entry(&self) -> Option<&Arc<ErrorRegistryEntry>> {
        match self {
            Self::Rethrown { entry } => Some(entry),
            _ => None,
        }
    }
}

/// Result alias for registry operations.
pub type Result<T> = StdResult<T, RegistryError>;
