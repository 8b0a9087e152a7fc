//! Variable and derived-variable descriptors.
//!
//! A [`Variable`] binds a declared name to a type and knows how to resolve
//! itself from a [`Source`] under a given prefix. A [`Derived`] computes its
//! value from an already populated [`Config`].

use std::fmt;
use std::sync::Arc;

use crate::coercion::{MapFn, coerce};
use crate::environ::Source;
use crate::errors::{Error, Result};
use crate::key::normalize;
use crate::options::ParseOptions;
use crate::resolve::Config;
use crate::types::{TypeTag, Value};
use crate::warnings::{DeprecationNotice, Diagnostics};

/// Custom parser replacing the default coercion.
pub type Parser = Arc<dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync>;

/// Validation hook run on every retrieved value before it is stored.
pub type Validator = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Function computing a derived value from the populated configuration.
pub type Derivation = Arc<dyn Fn(&Config) -> anyhow::Result<Value> + Send + Sync>;

/// A deprecated alias for a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    /// Old declared name, normalized like any variable name.
    pub name: String,
    /// Version in which the alias was deprecated.
    pub deprecated_in: Option<String>,
    /// Version in which the alias will be removed.
    pub removed_in: Option<String>,
}

impl Deprecation {
    /// Declare a deprecated alias without version information.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deprecated_in: None,
            removed_in: None,
        }
    }

    /// Set the version the alias was deprecated in.
    #[must_use]
    pub fn deprecated_in(mut self, version: impl Into<String>) -> Self {
        self.deprecated_in = Some(version.into());
        self
    }

    /// Set the version the alias will be removed in.
    #[must_use]
    pub fn removed_in(mut self, version: impl Into<String>) -> Self {
        self.removed_in = Some(version.into());
        self
    }
}

/// Where a resolved value came from; only used for logging.
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// The primary key.
    Source,
    /// A deprecated alias.
    Deprecated,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// Declarative binding of a name to a typed environment value.
#[derive(Clone)]
pub struct Variable {
    /// Declared type.
    tag: TypeTag,
    /// Declared logical name.
    name: String,
    /// Custom parser.
    parser: Option<Parser>,
    /// Validation hook.
    validator: Option<Validator>,
    /// Element transform for collections.
    map: Option<MapFn>,
    /// Value used when the variable is absent.
    default: Option<Value>,
    /// Deprecated aliases, consulted in order.
    deprecations: Vec<Deprecation>,
    /// Help text.
    help: Option<String>,
    /// Rendered type override for help output.
    help_type: Option<String>,
    /// Rendered default override for help output.
    help_default: Option<String>,
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .field("parser", &self.parser.is_some())
            .field("validator", &self.validator.is_some())
            .field("map", &self.map)
            .field("default", &self.default)
            .field("deprecations", &self.deprecations)
            .finish_non_exhaustive()
    }
}

impl Variable {
    /// Start declaring a variable of type `tag` named `name`.
    #[must_use]
    pub fn builder(tag: TypeTag, name: impl Into<String>) -> VariableBuilder {
        VariableBuilder {
            variable: Self {
                tag,
                name: name.into(),
                parser: None,
                validator: None,
                map: None,
                default: None,
                deprecations: Vec::new(),
                help: None,
                help_type: None,
                help_default: None,
            },
        }
    }

    /// Declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Deprecated aliases in lookup order.
    #[must_use]
    pub fn deprecations(&self) -> &[Deprecation] {
        &self.deprecations
    }

    /// Help text, if declared.
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Rendered type override for help output.
    #[must_use]
    pub fn help_type(&self) -> Option<&str> {
        self.help_type.as_deref()
    }

    /// Rendered default override for help output.
    #[must_use]
    pub fn help_default(&self) -> Option<&str> {
        self.help_default.as_deref()
    }

    /// Environment key of this variable under `prefix`.
    #[must_use]
    pub fn full_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", normalize(&self.name))
    }

    /// Resolve the variable from `source` and run the validator on the result.
    ///
    /// Deprecated aliases are consulted in order when the primary key is
    /// unset; the first hit is reported to `diagnostics`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingVariable`] when no key is set and there is no
    /// default, [`Error::TypeMismatch`] when the raw value cannot be coerced,
    /// and [`Error::Application`] for parser, map or validator failures.
    pub fn retrieve(
        &self,
        source: &dyn Source,
        prefix: &str,
        options: &ParseOptions,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Value> {
        let value = self.lookup(source, prefix, options, diagnostics)?;

        if let Some(validator) = &self.validator {
            validator(&value)?;
        }

        Ok(value)
    }

    /// Find the raw value and coerce it, falling back to the default.
    fn lookup(
        &self,
        source: &dyn Source,
        prefix: &str,
        options: &ParseOptions,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Value> {
        let full_key = self.full_key(prefix);

        let mut found = source.get(&full_key).map(|raw| (raw, Origin::Source));
        if found.is_none() {
            for deprecation in &self.deprecations {
                let deprecated_key = format!("{prefix}{}", normalize(&deprecation.name));
                if let Some(raw) = source.get(&deprecated_key) {
                    diagnostics.deprecated(&DeprecationNotice {
                        deprecated_key,
                        replacement_key: full_key.clone(),
                        deprecated_in: deprecation.deprecated_in.clone(),
                        removed_in: deprecation.removed_in.clone(),
                    });
                    found = Some((raw, Origin::Deprecated));
                    break;
                }
            }
        }

        let Some((raw, origin)) = found else {
            return match &self.default {
                Some(default) => {
                    tracing::debug!(key = %full_key, origin = "default", "resolved variable");
                    Ok(default.clone())
                },
                None => Err(Error::missing_variable(full_key)),
            };
        };

        tracing::debug!(key = %full_key, origin = %origin, "resolved variable");
        self.parse(&full_key, &raw, options)
    }

    /// Turn a raw string into a value of the declared type.
    fn parse(&self, full_key: &str, raw: &str, options: &ParseOptions) -> Result<Value> {
        let Some(parser) = &self.parser else {
            return coerce(full_key, raw, &self.tag, self.map.as_ref(), options);
        };

        let parsed = parser(raw)?;
        if self.tag.matches(&parsed) {
            Ok(parsed)
        } else {
            Err(Error::type_mismatch(
                full_key,
                &self.tag,
                format!("parser returned {}", parsed.kind()),
            ))
        }
    }
}

/// Builder for [`Variable`]; checks the declaration when built.
#[derive(Debug, Clone)]
pub struct VariableBuilder {
    /// Variable under construction.
    variable: Variable,
}

impl VariableBuilder {
    /// Use `parser` instead of the default coercion.
    #[must_use]
    pub fn parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.variable.parser = Some(Arc::new(parser));
        self
    }

    /// Run `validator` on every retrieved value.
    #[must_use]
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.variable.validator = Some(Arc::new(validator));
        self
    }

    /// Transform every item of a list, tuple or set.
    #[must_use]
    pub fn map_items<F>(mut self, map: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.variable.map = Some(MapFn::items(map));
        self
    }

    /// Transform every key/value pair of a dict.
    #[must_use]
    pub fn map_pairs<F>(mut self, map: F) -> Self
    where
        F: Fn(&str, &str) -> anyhow::Result<(String, Value)> + Send + Sync + 'static,
    {
        self.variable.map = Some(MapFn::pairs(map));
        self
    }

    /// Value used when the variable is absent from the source.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.variable.default = Some(value.into());
        self
    }

    /// Append a deprecated alias.
    #[must_use]
    pub fn deprecation(mut self, deprecation: Deprecation) -> Self {
        self.variable.deprecations.push(deprecation);
        self
    }

    /// Append several deprecated aliases, keeping their order.
    #[must_use]
    pub fn deprecations(mut self, deprecations: impl IntoIterator<Item = Deprecation>) -> Self {
        self.variable.deprecations.extend(deprecations);
        self
    }

    /// Help text shown in generated documentation.
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.variable.help = Some(help.into());
        self
    }

    /// Type rendering shown in generated documentation.
    #[must_use]
    pub fn help_type(mut self, help_type: impl Into<String>) -> Self {
        self.variable.help_type = Some(help_type.into());
        self
    }

    /// Default rendering shown in generated documentation.
    #[must_use]
    pub fn help_default(mut self, help_default: impl Into<String>) -> Self {
        self.variable.help_default = Some(help_default.into());
        self
    }

    /// Finish the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeclarationType`] if the default does not match the
    /// declared type, or if the element map cannot apply to it.
    pub fn build(self) -> Result<Variable> {
        let variable = self.variable;

        if let Some(default) = &variable.default
            && !variable.tag.matches(default)
        {
            return Err(Error::declaration_type(
                &variable.name,
                format!("default must be of type {}, got {}", variable.tag, default.kind()),
            ));
        }

        match &variable.map {
            Some(MapFn::Item(_)) if !variable.tag.accepts_items() => {
                return Err(Error::declaration_type(
                    &variable.name,
                    format!("item map needs a list, tuple or set type, not {}", variable.tag),
                ));
            },
            Some(MapFn::Pair(_)) if !variable.tag.accepts_pairs() => {
                return Err(Error::declaration_type(
                    &variable.name,
                    format!("pair map needs a dict type, not {}", variable.tag),
                ));
            },
            _ => {},
        }

        Ok(variable)
    }
}

/// A value computed from the populated configuration.
#[derive(Clone)]
pub struct Derived {
    /// Declared result type.
    tag: TypeTag,
    /// Computation.
    derivation: Derivation,
}

impl fmt::Debug for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

impl Derived {
    /// Declare a derived value of type `tag`.
    #[must_use]
    pub fn new<F>(tag: TypeTag, derivation: F) -> Self
    where
        F: Fn(&Config) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            tag,
            derivation: Arc::new(derivation),
        }
    }

    /// Declared result type.
    #[must_use]
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Compute the value for attribute `attr` from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Application`] if the derivation fails and
    /// [`Error::TypeMismatch`] if it returns a value of the wrong type.
    pub fn resolve(&self, attr: &str, config: &Config) -> Result<Value> {
        let value = (self.derivation)(config)?;
        if self.tag.matches(&value) {
            Ok(value)
        } else {
            Err(Error::type_mismatch(
                attr,
                &self.tag,
                format!("derivation returned {}", value.kind()),
            ))
        }
    }
}
