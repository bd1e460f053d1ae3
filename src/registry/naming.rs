//! Short, module-path-free type names.

use std::{any::type_name, sync::LazyLock};

use regex::Regex;

/// Matches one or more leading `segment::` components of a Rust path.
static MODULE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:[A-Za-z_][A-Za-z0-9_]*::)+").unwrap());

/// Returns the name of `T` with every module path stripped.
///
/// `my_app::billing::Ledger` becomes `Ledger`, and
/// `alloc::vec::Vec<my_app::Entry>` becomes `Vec<Entry>`.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> String {
    shorten(type_name::<T>())
}

fn shorten(path: &str) -> String {
    MODULE_PATH.replace_all(path, "").into_owned()
}
