//! Recorded error occurrences.
//!
//! An [`ErrorRegistryEntry`] is created once, when a wrapped method fails,
//! and never modified afterwards. Its `Serialize` form is the record printed
//! by `log_registry`:
//!
//! ```json
//! { "error": { "name": "...", "message": "..." }, "context": ...,
//!   "constructor_name": "...", "method_name": "...", "timestamp": "..." }
//! ```

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    sync::Arc,
};

use {
    anyhow::{Chain, Error},
    chrono::{DateTime, Utc},
    serde::Serialize,
    serde_json::Value,
};

/// The error a wrapped method returned.
#[derive(Debug, Clone, Serialize)]
pub struct CaughtError {
    /// Kind of the error (short type name of the returned error).
    name: String,
    /// `Display` output of the error.
    message: String,
    /// The original error, kept for downcasting and source chains.
    #[serde(skip)]
    source: Arc<Error>,
}

impl CaughtError {
    /// Wraps a caught error under the given kind name.
    pub fn new(name: impl Into<String>, error: Error) -> Self {
        Self {
            name: name.into(),
            message: error.to_string(),
            source: Arc::new(error),
        }
    }

    /// Kind of the error.
    ///
    /// This is the static type the wrapped method returned, so failures
    /// returned as `anyhow::Error` are all named `Error`. Use
    /// [`CaughtError::downcast_ref`] or [`CaughtError::chain`] to reach the
    /// concrete error behind them.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original error.
    #[must_use]
    pub fn inner(&self) -> &Error {
        &self.source
    }

    /// Attempts to view the original error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        self.source.downcast_ref::<E>()
    }

    /// Iterates the original error and its sources, outermost first.
    pub fn chain(&self) -> Chain<'_> {
        self.source.chain()
    }
}

impl Display for CaughtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// One recorded failure of a wrapped method.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRegistryEntry {
    error: CaughtError,
    context: Value,
    constructor_name: String,
    method_name: String,
    timestamp: DateTime<Utc>,
}

impl ErrorRegistryEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(
        error: CaughtError,
        context: Value,
        constructor_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            error,
            context,
            constructor_name: constructor_name.into(),
            method_name: method_name.into(),
            timestamp: Utc::now(),
        }
    }

    /// The caught error.
    #[must_use]
    pub fn error(&self) -> &CaughtError {
        &self.error
    }

    /// Snapshot of the receiver, taken when the error was caught.
    #[must_use]
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Type that defines the wrapped method.
    #[must_use]
    pub fn constructor_name(&self) -> &str {
        &self.constructor_name
    }

    /// Name of the wrapped method.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// When the error was caught.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
