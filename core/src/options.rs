//! Per-schema parsing knobs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{Error, Result};

/// Knobs controlling how raw strings are coerced for one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::module_name_repetitions)]
pub struct ParseOptions {
    /// Lower-case strings that represent `true`. Everything else is `false`.
    pub truthy: BTreeSet<String>,
    /// Separator between collection items and between mapping entries.
    pub item_separator: String,
    /// Separator between a mapping key and its value.
    pub value_separator: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            truthy: ["1", "true", "yes", "on"].into_iter().map(String::from).collect(),
            item_separator: ",".to_string(),
            value_separator: ":".to_string(),
        }
    }
}

impl ParseOptions {
    /// Whether `raw`, lower-cased, is in the truthy set.
    #[must_use]
    pub fn is_truthy(&self, raw: &str) -> bool {
        self.truthy.contains(&raw.to_lowercase())
    }

    /// Check that both separators are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeclarationType`] if a separator is empty.
    pub fn validate(&self) -> Result<()> {
        if self.item_separator.is_empty() {
            return Err(Error::declaration_type("item_separator", "separator must not be empty"));
        }
        if self.value_separator.is_empty() {
            return Err(Error::declaration_type("value_separator", "separator must not be empty"));
        }
        Ok(())
    }
}
