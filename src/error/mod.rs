//! Error handling for the registry using `thiserror` and `anyhow`.
//!
//! Registry failures are precise `thiserror` enums, while errors captured
//! from wrapped methods are carried as `anyhow::Error` so any error type can
//! be recorded.

pub mod domain;
pub mod operational;

pub use {
    domain::{RegistryError, Result},
    operational::ErrorReporter,
};
