//! Method interception: wrapping a method so its failures are recorded.
//!
//! An [`Interceptor`] (from [`ErrorRegistry::catch_error`]) turns any
//! method-shaped callable, `Fn(&R, A1, .., An) -> Result<T, E>` or the
//! `&mut R` equivalent, into a [`WrappedMethod`] / [`WrappedMethodMut`].
//! Calling the wrapper runs the original method; on `Ok(v)` it returns
//! `Ok(Some(v))`, on `Err(e)` it records an entry, notifies observers and
//! returns `Ok(None)` (or the entry as an error when rethrowing).
//!
//! ```
//! use errtrap::{ErrorRegistry, catch_error};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Ledger {
//!     balance: u64,
//! }
//!
//! impl Ledger {
//!     fn withdraw(&self, amount: u64) -> anyhow::Result<u64> {
//!         self.balance
//!             .checked_sub(amount)
//!             .ok_or_else(|| anyhow::anyhow!("insufficient funds"))
//!     }
//! }
//!
//! let registry = ErrorRegistry::new();
//! let withdraw = catch_error!(registry.catch_error(), Ledger::withdraw);
//! let ledger = Ledger { balance: 5 };
//!
//! assert_eq!(withdraw.call(&ledger, (3,)).unwrap(), Some(2));
//! assert_eq!(withdraw.call(&ledger, (9,)).unwrap(), None);
//! assert_eq!(registry.get_registry()[0].method_name(), "withdraw");
//! ```
//!
//! [`ErrorRegistry::catch_error`]: crate::registry::ErrorRegistry::catch_error

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
    result::Result as StdResult,
};

use {
    anyhow::Error,
    serde::Serialize,
    serde_json::{Error as SerdeJsonError, Value, to_value},
    tracing::warn,
};

use crate::{
    config::FailureMode,
    error::{RegistryError, Result},
    registry::{CaughtError, ErrorRegistry, ErrorRegistryEntry, naming::short_type_name},
};

/// A callable shaped like a method taking `&R` and the argument tuple `Args`.
pub trait Method<R, Args, T, E> {
    /// Runs the method.
    fn invoke(&self, receiver: &R, args: Args) -> StdResult<T, E>;
}

/// A callable shaped like a method taking `&mut R` and the argument tuple
/// `Args`.
pub trait MethodMut<R, Args, T, E> {
    /// Runs the method.
    fn invoke(&self, receiver: &mut R, args: Args) -> StdResult<T, E>;
}

macro_rules! impl_method {
    ($($arg:ident: $ty:ident),*) => {
        impl<R, F, T, E, $($ty,)*> Method<R, ($($ty,)*), T, E> for F
        where
            F: Fn(&R, $($ty,)*) -> StdResult<T, E>,
        {
            fn invoke(&self, receiver: &R, ($($arg,)*): ($($ty,)*)) -> StdResult<T, E> {
                self(receiver, $($arg,)*)
            }
        }

        impl<R, F, T, E, $($ty,)*> MethodMut<R, ($($ty,)*), T, E> for F
        where
            F: Fn(&mut R, $($ty,)*) -> StdResult<T, E>,
        {
            fn invoke(&self, receiver: &mut R, ($($arg,)*): ($($ty,)*)) -> StdResult<T, E> {
                self(receiver, $($arg,)*)
            }
        }
    };
}

impl_method!();
impl_method!(a1: A1);
impl_method!(a1: A1, a2: A2);
impl_method!(a1: A1, a2: A2, a3: A3);
impl_method!(a1: A1, a2: A2, a3: A3, a4: A4);

/// Wraps a method path, naming the entry after the type and method.
///
/// `catch_error!(interceptor, Ledger::withdraw)` is
/// `interceptor.wrap_as("Ledger", "withdraw", Ledger::withdraw)`; prefix the
/// path with `mut` for methods taking `&mut self`.
#[macro_export]
macro_rules! catch_error {
    ($interceptor:expr, mut $owner:ident :: $method:ident) => {
        $interceptor.wrap_mut_as(stringify!($owner), stringify!($method), $owner::$method)
    };
    ($interceptor:expr, $owner:ident :: $method:ident) => {
        $interceptor.wrap_as(stringify!($owner), stringify!($method), $owner::$method)
    };
}

/// Factory for wrapped methods bound to one registry.
///
/// The plain `wrap*` methods snapshot the receiver with `serde_json`, so they
/// need `R: Serialize`. Receivers that cannot be serialized (holding a lock,
/// a file or a socket) are wrapped with `wrap_with_context`, which takes a
/// capture function, or `wrap_opaque`, which records `null` as the context.
#[derive(Debug, Clone)]
pub struct Interceptor {
    registry: ErrorRegistry,
    failure_mode: FailureMode,
}

impl Interceptor {
    pub(crate) fn new(registry: ErrorRegistry) -> Self {
        let failure_mode = registry.settings().failure_mode;
        Self {
            registry,
            failure_mode,
        }
    }

    /// Overrides the registry's configured failure mode for methods wrapped
    /// by this interceptor.
    #[must_use]
    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    /// The failure mode given to methods wrapped from now on.
    #[must_use]
    pub fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    /// Wraps a `&R` method; entries name `R` (without its module path) as
    /// the constructor.
    pub fn wrap<R, Args, T, E, F>(
        &self,
        method_name: impl Into<String>,
        method: F,
    ) -> WrappedMethod<R, Args, T, E, F>
    where
        R: Serialize,
        F: Method<R, Args, T, E>,
    {
        self.wrap_as(short_type_name::<R>(), method_name, method)
    }

    /// Wraps a `&R` method under an explicit constructor name.
    pub fn wrap_as<R, Args, T, E, F>(
        &self,
        constructor_name: impl Into<String>,
        method_name: impl Into<String>,
        method: F,
    ) -> WrappedMethod<R, Args, T, E, F>
    where
        R: Serialize,
        F: Method<R, Args, T, E>,
    {
        WrappedMethod {
            method,
            capture: ContextCapture::serde(),
            site: self.call_site(constructor_name.into(), method_name.into()),
            _signature: PhantomData,
        }
    }

    /// Wraps a `&R` method whose entries take their context from `capture`.
    pub fn wrap_with_context<R, Args, T, E, F, C>(
        &self,
        method_name: impl Into<String>,
        capture: C,
        method: F,
    ) -> WrappedMethod<R, Args, T, E, F>
    where
        C: Fn(&R) -> Value + Send + Sync + 'static,
        F: Method<R, Args, T, E>,
    {
        WrappedMethod {
            method,
            capture: ContextCapture::Custom(Box::new(capture)),
            site: self.call_site(short_type_name::<R>(), method_name.into()),
            _signature: PhantomData,
        }
    }

    /// Wraps a `&R` method whose entries record `null` as their context.
    pub fn wrap_opaque<R, Args, T, E, F>(
        &self,
        method_name: impl Into<String>,
        method: F,
    ) -> WrappedMethod<R, Args, T, E, F>
    where
        F: Method<R, Args, T, E>,
    {
        WrappedMethod {
            method,
            capture: ContextCapture::Opaque,
            site: self.call_site(short_type_name::<R>(), method_name.into()),
            _signature: PhantomData,
        }
    }

    /// Wraps a `&mut R` method; entries name `R` as the constructor.
    pub fn wrap_mut<R, Args, T, E, F>(
        &self,
        method_name: impl Into<String>,
        method: F,
    ) -> WrappedMethodMut<R, Args, T, E, F>
    where
        R: Serialize,
        F: MethodMut<R, Args, T, E>,
    {
        self.wrap_mut_as(short_type_name::<R>(), method_name, method)
    }

    /// Wraps a `&mut R` method under an explicit constructor name.
    pub fn wrap_mut_as<R, Args, T, E, F>(
        &self,
        constructor_name: impl Into<String>,
        method_name: impl Into<String>,
        method: F,
    ) -> WrappedMethodMut<R, Args, T, E, F>
    where
        R: Serialize,
        F: MethodMut<R, Args, T, E>,
    {
        WrappedMethodMut {
            method,
            capture: ContextCapture::serde(),
            site: self.call_site(constructor_name.into(), method_name.into()),
            _signature: PhantomData,
        }
    }

    /// Wraps a `&mut R` method whose entries take their context from
    /// `capture`, applied after the method returned.
    pub fn wrap_mut_with_context<R, Args, T, E, F, C>(
        &self,
        method_name: impl Into<String>,
        capture: C,
        method: F,
    ) -> WrappedMethodMut<R, Args, T, E, F>
    where
        C: Fn(&R) -> Value + Send + Sync + 'static,
        F: MethodMut<R, Args, T, E>,
    {
        WrappedMethodMut {
            method,
            capture: ContextCapture::Custom(Box::new(capture)),
            site: self.call_site(short_type_name::<R>(), method_name.into()),
            _signature: PhantomData,
        }
    }

    /// Wraps a `&mut R` method whose entries record `null` as their context.
    pub fn wrap_mut_opaque<R, Args, T, E, F>(
        &self,
        method_name: impl Into<String>,
        method: F,
    ) -> WrappedMethodMut<R, Args, T, E, F>
    where
        F: MethodMut<R, Args, T, E>,
    {
        WrappedMethodMut {
            method,
            capture: ContextCapture::Opaque,
            site: self.call_site(short_type_name::<R>(), method_name.into()),
            _signature: PhantomData,
        }
    }

    fn call_site(&self, constructor_name: String, method_name: String) -> CallSite {
        CallSite {
            registry: self.registry.clone(),
            constructor_name,
            method_name,
            failure_mode: self.failure_mode,
        }
    }
}

/// How a wrapped method turns its receiver into entry context.
enum ContextCapture<R> {
    /// `serde_json::to_value`; `null` if serialization fails.
    Serde(fn(&R) -> StdResult<Value, SerdeJsonError>),
    /// Caller-supplied capture function.
    Custom(Box<dyn Fn(&R) -> Value + Send + Sync>),
    /// No context.
    Opaque,
}

impl<R> ContextCapture<R> {
    fn serde() -> Self
    where
        R: Serialize,
    {
        Self::Serde(serialize::<R>)
    }

    fn capture(&self, receiver: &R, site: &CallSite) -> Value {
        match self {
            Self::Serde(serialize) => serialize(receiver).unwrap_or_else(|error| {
                warn!(
                    constructor_name = %site.constructor_name,
                    error = %error,
                    "Receiver could not be snapshotted"
                );
                Value::Null
            }),
            Self::Custom(capture) => capture(receiver),
            Self::Opaque => Value::Null,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Serde(_) => "serde",
            Self::Custom(_) => "custom",
            Self::Opaque => "opaque",
        }
    }
}

fn serialize<R: Serialize>(receiver: &R) -> StdResult<Value, SerdeJsonError> {
    to_value(receiver)
}

/// What a wrapped method knows about itself, fixed at wrap time.
#[derive(Debug, Clone)]
struct CallSite {
    registry: ErrorRegistry,
    constructor_name: String,
    method_name: String,
    failure_mode: FailureMode,
}

impl CallSite {
    fn intercept<E: Into<Error>>(&self, context: Value, error: E) -> Result<()> {
        let caught = CaughtError::new(short_type_name::<E>(), error.into());
        let entry = ErrorRegistryEntry::new(
            caught,
            context,
            self.constructor_name.as_str(),
            self.method_name.as_str(),
        );
        let entry = self.registry.record(entry)?;

        match self.failure_mode {
            FailureMode::Swallow => Ok(()),
            FailureMode::Rethrow => Err(RegistryError::Rethrown { entry }),
        }
    }
}

/// A `&R` method whose failures are recorded in a registry.
pub struct WrappedMethod<R, Args, T, E, F> {
    method: F,
    capture: ContextCapture<R>,
    site: CallSite,
    _signature: PhantomData<fn(&R, Args) -> StdResult<T, E>>,
}

impl<R, Args, T, E, F> WrappedMethod<R, Args, T, E, F>
where
    E: Into<Error>,
    F: Method<R, Args, T, E>,
{
    /// Calls the method on `receiver` with the argument tuple `args`.
    ///
    /// Returns `Ok(Some(output))` on success and `Ok(None)` when the method
    /// failed and the failure was recorded.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Observer` if an observer failed, or
    /// `RegistryError::Rethrown` in [`FailureMode::Rethrow`].
    pub fn call(&self, receiver: &R, args: Args) -> Result<Option<T>> {
        match self.method.invoke(receiver, args) {
            Ok(output) => Ok(Some(output)),
            Err(error) => {
                let context = self.capture.capture(receiver, &self.site);
                self.site.intercept(context, error).map(|()| None)
            }
        }
    }
}

impl<R, Args, T, E, F> WrappedMethod<R, Args, T, E, F> {
    /// Type recorded as the owner of the method.
    #[must_use]
    pub fn constructor_name(&self) -> &str {
        &self.site.constructor_name
    }

    /// Name recorded for the method.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.site.method_name
    }

    /// Failure mode fixed when the method was wrapped.
    #[must_use]
    pub fn failure_mode(&self) -> FailureMode {
        self.site.failure_mode
    }
}

impl<R, Args, T, E, F> Debug for WrappedMethod<R, Args, T, E, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("WrappedMethod")
            .field("constructor_name", &self.site.constructor_name)
            .field("method_name", &self.site.method_name)
            .field("failure_mode", &self.site.failure_mode)
            .field("context", &self.capture.kind())
            .finish_non_exhaustive()
    }
}

/// A `&mut R` method whose failures are recorded in a registry.
pub struct WrappedMethodMut<R, Args, T, E, F> {
    method: F,
    capture: ContextCapture<R>,
    site: CallSite,
    _signature: PhantomData<fn(&mut R, Args) -> StdResult<T, E>>,
}

impl<R, Args, T, E, F> WrappedMethodMut<R, Args, T, E, F>
where
    E: Into<Error>,
    F: MethodMut<R, Args, T, E>,
{
    /// Calls the method on `receiver` with the argument tuple `args`.
    ///
    /// The context in a recorded entry reflects any changes the method made
    /// before failing.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Observer` if an observer failed, or
    /// `RegistryError::Rethrown` in [`FailureMode::Rethrow`].
    pub fn call(&self, receiver: &mut R, args: Args) -> Result<Option<T>> {
        match self.method.invoke(receiver, args) {
            Ok(output) => Ok(Some(output)),
            Err(error) => {
                let context = self.capture.capture(receiver, &self.site);
                self.site.intercept(context, error).map(|()| None)
            }
        }
    }
}

impl<R, Args, T, E, F> WrappedMethodMut<R, Args, T, E, F> {
    /// Type recorded as the owner of the method.
    #[must_use]
    pub fn constructor_name(&self) -> &str {
        &self.site.constructor_name
    }

    /// Name recorded for the method.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.site.method_name
    }

    /// Failure mode fixed when the method was wrapped.
    #[must_use]
    pub fn failure_mode(&self) -> FailureMode {
        self.site.failure_mode
    }
}

impl<R, Args, T, E, F> Debug for WrappedMethodMut<R, Args, T, E, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("WrappedMethodMut")
            .field("constructor_name", &self.site.constructor_name)
            .field("method_name", &self.site.method_name)
            .field("failure_mode", &self.site.failure_mode)
            .field("context", &self.capture.kind())
            .finish_non_exhaustive()
    }
}
