//! Observer callbacks notified of new registry entries.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ptr::addr_eq,
    sync::Arc,
};

use anyhow::Result as AnyhowResult;

use crate::registry::ErrorRegistryEntry;

type Callback = dyn Fn(&Arc<ErrorRegistryEntry>) -> AnyhowResult<()> + Send + Sync;

/// A callback invoked synchronously for every recorded entry.
///
/// Observers are compared by identity: clones of one `Observer` are the same
/// observer, while two observers built from identical closures are not.
/// Keep a clone around to unregister it later.
///
/// Callbacks must be `Send + Sync` because registries are shared through
/// `Arc` handles. Capture shared state as `Arc<parking_lot::Mutex<_>>` or an
/// atomic rather than `Rc<RefCell<_>>`.
#[derive(Clone)]
pub struct Observer {
    callback: Arc<Callback>,
}

impl Observer {
    /// Creates an observer from a fallible callback.
    ///
    /// An `Err` from the callback stops notification of the remaining
    /// observers and is returned to the caller of the wrapped method.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Arc<ErrorRegistryEntry>) -> AnyhowResult<()> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Creates an observer from a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&Arc<ErrorRegistryEntry>) + Send + Sync + 'static,
    {
        Self::new(move |entry| {
            callback(entry);
            Ok(())
        })
    }

    /// Invokes the callback with an entry.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callback returns.
    pub fn notify(&self, entry: &Arc<ErrorRegistryEntry>) -> AnyhowResult<()> {
        (self.callback)(entry)
    }

    /// Whether both handles refer to the same callback.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }
}

impl Debug for Observer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Observer")
            .field("callback", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}
