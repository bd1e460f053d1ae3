//! The error registry: recorded entries plus the observers notified of them.

use std::{
    io::{Write, stderr},
    mem::take,
    sync::Arc,
};

use {parking_lot::RwLock, tracing::debug};

use crate::{
    config::RegistrySettings,
    error::{ErrorReporter, RegistryError, Result},
    registry::{ErrorRegistryEntry, Interceptor, Observer},
};

/// Ordered record of failures caught by wrapped methods.
///
/// `ErrorRegistry` is a handle: clones share the same entries and
/// observers. No lock is held while observers or wrapped methods run, so
/// observers may call back into the registry.
#[derive(Debug, Clone, Default)]
pub struct ErrorRegistry {
    /// Recorded entries in the order they were caught.
    entries: Arc<RwLock<Vec<Arc<ErrorRegistryEntry>>>>,
    /// Observers in registration order; duplicates allowed.
    observers: Arc<RwLock<Vec<Observer>>>,
    /// Behavior settings, fixed at construction.
    settings: RegistrySettings,
}

impl ErrorRegistry {
    /// Creates an empty registry with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with the given settings.
    #[must_use]
    pub fn with_settings(settings: RegistrySettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// The settings this registry was built with.
    #[must_use]
    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Returns the recorded entries, oldest first.
    ///
    /// The returned vector is a snapshot of the sequence; the entries in it
    /// are shared with the registry.
    #[must_use]
    pub fn get_registry(&self) -> Vec<Arc<ErrorRegistryEntry>> {
        self.entries.read().clone()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no entries are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every recorded entry. Observers are not notified.
    pub fn clear_registry(&self) {
        let cleared = take(&mut *self.entries.write());
        debug!(cleared = cleared.len(), "Error registry cleared");
    }

    /// Appends an observer. Registering the same observer twice makes it
    /// fire twice per entry.
    pub fn register_observer(&self, observer: Observer) {
        let mut observers = self.observers.write();
        observers.push(observer);
        debug!(observers = observers.len(), "Observer registered");
    }

    /// Removes every registration of `observer` and returns how many were
    /// removed.
    pub fn unregister_observer(&self, observer: &Observer) -> usize {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|registered| !registered.same_as(observer));
        let removed = before - observers.len();
        debug!(removed, observers = observers.len(), "Observer unregistered");
        removed
    }

    /// Number of observer registrations.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns an interceptor that wraps methods so their failures are
    /// recorded in this registry.
    #[must_use]
    pub fn catch_error(&self) -> Interceptor {
        Interceptor::new(self.clone())
    }

    /// Writes every entry to standard error, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if a record cannot be encoded or written.
    pub fn log_registry(&self) -> Result<()> {
        self.log_registry_to(stderr().lock())
    }

    /// Writes every entry to `writer`, oldest first, in the configured
    /// log format.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if a record cannot be encoded or written.
    pub fn log_registry_to<W: Write>(&self, writer: W) -> Result<()> {
        let entries = self.get_registry();
        ErrorReporter::write_records(&entries, writer, self.settings.log_format)
    }

    /// Appends an entry and notifies the observers registered at this moment.
    pub(crate) fn record(&self, entry: ErrorRegistryEntry) -> Result<Arc<ErrorRegistryEntry>> {
        let entry = Arc::new(entry);
        self.entries.write().push(Arc::clone(&entry));

        if self.settings.trace_records {
            ErrorReporter::report(&entry, self.settings.trace_level);
        }

        self.notify_observers(&entry)?;
        Ok(entry)
    }

    fn notify_observers(&self, entry: &Arc<ErrorRegistryEntry>) -> Result<()> {
        // Snapshot: observers added or removed during notification take
        // effect from the next entry on.
        let observers = self.observers.read().clone();
        debug!(
            observers = observers.len(),
            method_name = entry.method_name(),
            "Notifying observers"
        );

        for observer in &observers {
            observer
                .notify(entry)
                .map_err(|source| RegistryError::Observer {
                    constructor_name: entry.constructor_name().to_string(),
                    method_name: entry.method_name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}
