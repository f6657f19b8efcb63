//! Debug formatting helpers for [`custom_debug_derive`].

use std::fmt;

/// Formats an optional secret without revealing it.
///
/// Use with `#[debug(with = "crate::fmt::redacted")]` on credential fields.
pub fn redacted<T>(value: &Option<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Some(_) => f.write_str("Some(<redacted>)"),
        None => f.write_str("None"),
    }
}
