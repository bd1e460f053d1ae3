//! Reporting of recorded entries.
//!
//! This module turns registry entries into output: a tracing event when an
//! entry is recorded, and serialized records when the registry is logged.

use std::{io::Write, sync::Arc};

use {
    serde_json::{to_vec, to_vec_pretty},
    tracing::{error, warn},
};

use crate::{
    config::{LogFormat, TraceLevel},
    error::Result,
    registry::ErrorRegistryEntry,
};

/// Centralized reporting of caught errors.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Emits a tracing event for a freshly recorded entry.
    pub fn report(entry: &ErrorRegistryEntry, level: TraceLevel) {
        let caught = entry.error();
        match level {
            TraceLevel::Error => error!(
                constructor_name = entry.constructor_name(),
                method_name = entry.method_name(),
                error.name = caught.name(),
                error.message = caught.message(),
                "Wrapped method failed"
            ),
            TraceLevel::Warn => warn!(
                constructor_name = entry.constructor_name(),
                method_name = entry.method_name(),
                error.name = caught.name(),
                error.message = caught.message(),
                "Wrapped method failed"
            ),
        }
    }

    /// Writes one serialized record per entry, each followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if an entry cannot be encoded or the writer
    /// fails.
    pub fn write_records<W: Write>(
        entries: &[Arc<ErrorRegistryEntry>],
        mut writer: W,
        format: LogFormat,
    ) -> Result<()> {
        for entry in entries {
            // Sink failures map to `RegistryError::Io`, never `Serialization`.
            let mut record = match format {
                LogFormat::Json => to_vec(entry.as_ref())?,
                LogFormat::Pretty => to_vec_pretty(entry.as_ref())?,
            };
            record.push(b'\n');
            writer.write_all(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// One-line summary of an entry for display to end users.
    #[must_use]
    pub fn to_user_message(entry: &ErrorRegistryEntry) -> String {
        format!(
            "{}::{} failed: {}",
            entry.constructor_name(),
            entry.method_name(),
            entry.error()
        )
    }
}
