//! Schema declarations and composition.
//!
//! A [`Schema`] is a plain value describing a configuration shape: its prefix,
//! its parsing knobs and an ordered set of named members. Schemas are built
//! once with a [`Builder`] and may later be merged with [`Schema::include`].

use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::descriptor::{Derived, Variable};
use crate::errors::{Error, Result};
use crate::options::ParseOptions;

/// One declared attribute of a schema.
#[derive(Debug, Clone)]
pub enum Member {
    /// Value read from the source.
    Variable(Variable),
    /// Value computed after all variables are resolved.
    Derived(Derived),
    /// Nested configuration resolved under an extended prefix.
    Namespace(Arc<Schema>),
}

/// Static declaration of a configuration shape.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Declared prefix, normalized when keys are computed.
    prefix: String,
    /// Attribute name this schema takes when nested into another one.
    item: Option<String>,
    /// Parsing knobs for this schema's own variables.
    options: ParseOptions,
    /// Members in declaration order.
    members: IndexMap<String, Member>,
}

impl Schema {
    /// Start declaring a schema.
    #[must_use]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Declared prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Attribute name override used when nested.
    #[must_use]
    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    /// Parsing knobs.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Member declared under `name`.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Names of all declared members, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// All declared members, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Name and member pairs, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    /// Number of declared members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the schema declares no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Merge the members of `other` into this schema.
    ///
    /// With a `namespace`, `other` is attached as a nested schema under that
    /// name (or under its item name, if it declares one). Without, its members
    /// are copied to the top level and its own prefix is ignored.
    ///
    /// # Errors
    ///
    /// Without `overwrite`, returns [`Error::NamespaceConflict`] if the
    /// namespace is taken, or [`Error::DeclarationConflict`] listing every
    /// member name that already exists. Nothing is changed on error.
    pub fn include(&mut self, other: &Schema, namespace: Option<&str>, overwrite: bool) -> Result<()> {
        if let Some(namespace) = namespace {
            let name = nested_name(namespace, other);
            if !overwrite && self.members.contains_key(&name) {
                return Err(Error::namespace_conflict(name));
            }
            tracing::debug!(namespace = %name, "including schema as namespace");
            self.members
                .insert(name, Member::Namespace(Arc::new(other.clone())));
            return Ok(());
        }

        if !overwrite {
            let clashes: Vec<String> = other
                .keys()
                .filter(|name| self.members.contains_key(*name))
                .map(String::from)
                .collect();
            if !clashes.is_empty() {
                return Err(Error::declaration_conflict(clashes));
            }
        }

        tracing::debug!(members = other.len(), "including schema members");
        for (name, member) in &other.members {
            self.members.insert(name.clone(), member.clone());
        }
        Ok(())
    }
}

/// Attribute name a nested schema registers under.
fn nested_name(attr: &str, nested: &Schema) -> String {
    nested.item().unwrap_or(attr).to_string()
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct Builder {
    /// Schema under construction.
    schema: Schema,
    /// Attribute names declared more than once.
    duplicates: BTreeSet<String>,
}

impl Builder {
    /// Prefix shared by every variable of the schema.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.schema.prefix = prefix.into();
        self
    }

    /// Attribute name to use when this schema is nested into another one.
    #[must_use]
    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.schema.item = Some(item.into());
        self
    }

    /// Replace all parsing knobs at once.
    #[must_use]
    pub fn options(mut self, options: ParseOptions) -> Self {
        self.schema.options = options;
        self
    }

    /// Lower-case strings considered `true`.
    #[must_use]
    pub fn truthy<I, S>(mut self, truthy: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.options.truthy = truthy.into_iter().map(Into::into).collect();
        self
    }

    /// Separator between collection items.
    #[must_use]
    pub fn item_separator(mut self, separator: impl Into<String>) -> Self {
        self.schema.options.item_separator = separator.into();
        self
    }

    /// Separator between mapping keys and values.
    #[must_use]
    pub fn value_separator(mut self, separator: impl Into<String>) -> Self {
        self.schema.options.value_separator = separator.into();
        self
    }

    /// Declare a variable under attribute `attr`.
    #[must_use]
    pub fn var(self, attr: impl Into<String>, variable: Variable) -> Self {
        self.member(attr.into(), Member::Variable(variable))
    }

    /// Declare a derived value under attribute `attr`.
    #[must_use]
    pub fn derived(self, attr: impl Into<String>, derived: Derived) -> Self {
        self.member(attr.into(), Member::Derived(derived))
    }

    /// Nest `schema` under attribute `attr`, or under its item name if set.
    #[must_use]
    pub fn namespace(self, attr: impl Into<String>, schema: Schema) -> Self {
        let name = nested_name(&attr.into(), &schema);
        self.member(name, Member::Namespace(Arc::new(schema)))
    }

    /// Record a member, remembering names that were already taken.
    fn member(mut self, name: String, member: Member) -> Self {
        if self.schema.members.contains_key(&name) {
            self.duplicates.insert(name.clone());
        }
        self.schema.members.insert(name, member);
        self
    }

    /// Finish the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeclarationConflict`] if an attribute was declared
    /// twice and [`Error::DeclarationType`] if a separator is empty.
    pub fn build(self) -> Result<Schema> {
        if !self.duplicates.is_empty() {
            return Err(Error::declaration_conflict(self.duplicates));
        }
        self.schema.options.validate()?;
        Ok(self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeTag, Value};

    fn var(name: &str) -> Variable {
        Variable::builder(TypeTag::Str, name).build().unwrap()
    }

    fn base() -> Schema {
        Schema::builder()
            .prefix("app")
            .var("host", var("host"))
            .var("port", var("port"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_keeps_declaration_order() {
        let schema = Schema::builder()
            .var("b", var("b"))
            .derived("c", Derived::new(TypeTag::Int, |_| Ok(Value::Int(1))))
            .var("a", var("a"))
            .build()
            .unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["b", "c", "a"]);
        assert_eq!(schema.len(), 3);
        assert!(matches!(schema.member("c"), Some(Member::Derived(_))));
    }

    #[test]
    fn test_builder_rejects_duplicate_attribute() {
        let err = Schema::builder()
            .var("host", var("host"))
            .var("host", var("other"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DeclarationConflict { names } if names == vec!["host"]));
    }

    #[test]
    fn test_builder_rejects_empty_separator() {
        let err = Schema::builder().item_separator("").build().unwrap_err();
        assert!(matches!(err, Error::DeclarationType { .. }));
    }

    #[test]
    fn test_item_name_override_on_nesting() {
        let nested = Schema::builder().prefix("db").item("database").build().unwrap();
        let schema = Schema::builder().namespace("db", nested).build().unwrap();
        assert!(schema.member("db").is_none());
        assert!(matches!(schema.member("database"), Some(Member::Namespace(_))));
    }

    #[test]
    fn test_include_conflict_lists_every_collision() {
        let mut schema = base();
        let other = Schema::builder()
            .var("port", var("port"))
            .var("host", var("host"))
            .var("user", var("user"))
            .build()
            .unwrap();

        let err = schema.include(&other, None, false).unwrap_err();
        assert!(
            matches!(err, Error::DeclarationConflict { names } if names == vec!["host", "port"])
        );
        assert!(schema.member("user").is_none());
    }

    #[test]
    fn test_include_overwrite_later_wins() {
        let mut schema = base();
        let other = Schema::builder()
            .var("port", Variable::builder(TypeTag::Int, "port").default(80).build().unwrap())
            .build()
            .unwrap();

        schema.include(&other, None, true).unwrap();
        let Some(Member::Variable(port)) = schema.member("port") else {
            panic!("port should be a variable");
        };
        assert_eq!(port.tag(), &TypeTag::Int);
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["host", "port"]);
    }

    #[test]
    fn test_include_namespace() {
        let mut schema = base();
        let other = Schema::builder().prefix("cache").var("ttl", var("ttl")).build().unwrap();

        schema.include(&other, Some("cache"), false).unwrap();
        assert!(matches!(schema.member("cache"), Some(Member::Namespace(_))));

        let err = schema.include(&other, Some("host"), false).unwrap_err();
        assert!(matches!(err, Error::NamespaceConflict { namespace } if namespace == "host"));

        schema.include(&other, Some("host"), true).unwrap();
        assert!(matches!(schema.member("host"), Some(Member::Namespace(_))));
    }

    #[test]
    fn test_values_lists_every_kind() {
        let nested = Schema::builder().build().unwrap();
        let schema = Schema::builder()
            .var("a", var("a"))
            .derived("b", Derived::new(TypeTag::Str, |_| Ok(Value::from("x"))))
            .namespace("c", nested)
            .build()
            .unwrap();
        let kinds: Vec<&str> = schema
            .values()
            .map(|member| match member {
                Member::Variable(_) => "variable",
                Member::Derived(_) => "derived",
                Member::Namespace(_) => "namespace",
            })
            .collect();
        assert_eq!(kinds, vec!["variable", "derived", "namespace"]);
    }
}
