//! Environment key normalization.

/// Separator placed between prefix segments and variable names.
pub const SEPARATOR: char = '_';

/// Convert a declared variable or namespace name into its environment key form.
///
/// The name is uppercased, every `.` becomes `_` and all trailing `_` are
/// removed. Nothing else is touched.
#[must_use]
pub fn normalize(name: &str) -> String {
    let mut key = name.to_uppercase().replace('.', "_");
    let trimmed = key.trim_end_matches(SEPARATOR).len();
    key.truncate(trimmed);
    key
}

/// Extend a parent's full prefix with a schema's own declared prefix.
///
/// The result ends with a single separator unless it is empty.
#[must_use]
pub fn join_prefix(parent: &str, prefix: &str) -> String {
    let mut full = format!("{parent}{}", normalize(prefix));
    if !full.is_empty() && !full.ends_with(SEPARATOR) {
        full.push(SEPARATOR);
    }
    full
}
