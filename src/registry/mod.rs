//! The error registry and the method-wrapping mechanism that feeds it.
//!
//! Wrapped methods record their failures as [`ErrorRegistryEntry`] values
//! in an [`ErrorRegistry`], which hands each new entry to its registered
//! [`Observer`]s.

pub mod entry;
pub mod intercept;
pub mod naming;
pub mod observer;
pub mod store;

#[cfg(test)]
mod tests;

pub use {
    entry::{CaughtError, ErrorRegistryEntry},
    intercept::{Interceptor, Method, MethodMut, WrappedMethod, WrappedMethodMut},
    naming::short_type_name,
    observer::Observer,
    store::ErrorRegistry,
};
