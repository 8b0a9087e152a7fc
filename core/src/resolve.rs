//! Construction of configuration objects from a schema and a source.
//!
//! Resolution runs in two passes. The first resolves every variable and
//! nested schema in declaration order; the second runs derived values in
//! declaration order, each one seeing everything resolved before it. Any
//! failure aborts the whole construction.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::environ::{ProcessEnv, Source};
use crate::errors::{Error, Result};
use crate::key::join_prefix;
use crate::schema::{Member, Schema};
use crate::types::{FromValue, Value};
use crate::warnings::{Diagnostics, TracingDiagnostics};

/// One attribute of a resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Resolved variable or derived value.
    Value(Value),
    /// Resolved nested configuration.
    Namespace(Config),
}

/// A fully resolved configuration object.
///
/// Instances only exist once every declared member has been resolved; the
/// framework never mutates them afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Prefix prepended to every key of this object.
    full_prefix: String,
    /// Attributes in declaration order, derived values last.
    entries: IndexMap<String, Entry>,
}

impl Config {
    /// Resolve `schema` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving any member.
    pub fn from_env(schema: &Schema) -> Result<Self> {
        Self::new(schema, &ProcessEnv)
    }

    /// Resolve `schema` from `source`, reporting deprecations to `tracing`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving any member.
    pub fn new(schema: &Schema, source: &dyn Source) -> Result<Self> {
        Self::with_diagnostics(schema, source, &TracingDiagnostics)
    }

    /// Resolve `schema` from `source`, reporting deprecations to `diagnostics`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving any member.
    pub fn with_diagnostics(
        schema: &Schema,
        source: &dyn Source,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Self> {
        Self::resolve(schema, source, "", diagnostics)
    }

    /// Resolve `schema` as a child of `parent`, extending its prefix.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving any member.
    pub fn with_parent(
        schema: &Schema,
        source: &dyn Source,
        parent: &Config,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Self> {
        Self::resolve(schema, source, &parent.full_prefix, diagnostics)
    }

    /// Run both resolution passes under `parent_prefix`.
    fn resolve(
        schema: &Schema,
        source: &dyn Source,
        parent_prefix: &str,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Self> {
        let full_prefix = join_prefix(parent_prefix, schema.prefix());
        tracing::debug!(prefix = %full_prefix, members = schema.len(), "resolving configuration");

        let mut config = Self {
            full_prefix,
            entries: IndexMap::with_capacity(schema.len()),
        };

        for (name, member) in schema.iter() {
            let entry = match member {
                Member::Variable(variable) => Entry::Value(variable.retrieve(
                    source,
                    &config.full_prefix,
                    schema.options(),
                    diagnostics,
                )?),
                Member::Namespace(nested) => Entry::Namespace(Self::resolve(
                    nested,
                    source,
                    &config.full_prefix,
                    diagnostics,
                )?),
                Member::Derived(_) => continue,
            };
            config.entries.insert(name.to_string(), entry);
        }

        for (name, member) in schema.iter() {
            if let Member::Derived(derived) = member {
                let value = derived.resolve(name, &config)?;
                config.entries.insert(name.to_string(), Entry::Value(value));
            }
        }

        Ok(config)
    }

    /// Prefix prepended to the keys of this object's variables.
    #[must_use]
    pub fn full_prefix(&self) -> &str {
        &self.full_prefix
    }

    /// Attribute `name`, if resolved.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Value of attribute `name`, if it is a variable or derived value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.entries.get(name)? {
            Entry::Value(value) => Some(value),
            Entry::Namespace(_) => None,
        }
    }

    /// Nested configuration `name`, if it is a namespace.
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&Config> {
        match self.entries.get(name)? {
            Entry::Namespace(config) => Some(config),
            Entry::Value(_) => None,
        }
    }

    /// Attribute names and entries, in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Extract the value at `path` as a native type.
    ///
    /// `path` is an attribute name, or names joined with `.` to reach into
    /// nested configurations, e.g. `"db.port"`. Attribute names that contain a
    /// `.` themselves cannot be reached this way; use [`Config::value`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] if the path does not lead to a
    /// value and [`Error::TypeMismatch`] if the value cannot be converted.
    pub fn get<T: FromValue>(&self, path: &str) -> Result<T> {
        let (parents, attr) = path.rsplit_once('.').map_or(("", path), |(p, a)| (p, a));

        let mut config = self;
        if !parents.is_empty() {
            for segment in parents.split('.') {
                config = config
                    .namespace(segment)
                    .ok_or_else(|| Error::unknown_attribute(path))?;
            }
        }

        let value = config.value(attr).ok_or_else(|| Error::unknown_attribute(path))?;
        T::from_value(value).ok_or_else(|| {
            Error::type_mismatch(
                path,
                std::any::type_name::<T>(),
                format!("cannot convert {}", value.kind()),
            )
        })
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::Namespace(config) => config.serialize(serializer),
        }
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}
