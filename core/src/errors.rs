//! Error types for schema declaration and configuration resolution.

/// Result type alias for envbind operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while declaring schemas or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A declaration is inconsistent with its declared type.
    #[error("invalid declaration of '{name}': {message}")]
    DeclarationType {
        /// Declared name of the offending variable or knob.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// A required variable is absent from the source and has no default.
    #[error("{key} is not set")]
    MissingVariable {
        /// Fully prefixed environment key that was looked up.
        key: String,
    },

    /// A raw value, parser result or derivation result has the wrong type.
    #[error("'{key}' expected {expected}: {message}")]
    TypeMismatch {
        /// Environment key or attribute name being resolved.
        key: String,
        /// Rendered expected type.
        expected: String,
        /// Details about the mismatch.
        message: String,
    },

    /// A namespace attribute is already declared on the schema.
    #[error("namespace already in use: {namespace}")]
    NamespaceConflict {
        /// The contested attribute name.
        namespace: String,
    },

    /// Merging schemas would overwrite existing members.
    #[error("configuration clashes detected: {}", .names.join(", "))]
    DeclarationConflict {
        /// Every colliding member name, sorted.
        names: Vec<String>,
    },

    /// A resolved configuration has no attribute with this name.
    #[error("unknown configuration attribute '{name}'")]
    UnknownAttribute {
        /// The requested attribute path.
        name: String,
    },

    /// Error raised by an application callback, passed through untouched.
    #[error(transparent)]
    Application(#[from] anyhow::Error),
}

impl Error {
    /// Create a declaration type error.
    #[must_use]
    pub fn declaration_type(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeclarationType {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a missing variable error.
    #[must_use]
    pub fn missing_variable(key: impl Into<String>) -> Self {
        Self::MissingVariable { key: key.into() }
    }

    /// Create a type mismatch error.
    #[must_use]
    pub fn type_mismatch(
        key: impl Into<String>,
        expected: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected: expected.to_string(),
            message: message.into(),
        }
    }

    /// Create a namespace conflict error.
    #[must_use]
    pub fn namespace_conflict(namespace: impl Into<String>) -> Self {
        Self::NamespaceConflict {
            namespace: namespace.into(),
        }
    }

    /// Create a declaration conflict error; names are sorted for stable output.
    #[must_use]
    pub fn declaration_conflict(names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names.dedup();
        Self::DeclarationConflict { names }
    }

    /// Create an unknown attribute error.
    #[must_use]
    pub fn unknown_attribute(name: impl Into<String>) -> Self {
        Self::UnknownAttribute { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("port out of range")]
    struct PortRange;

    #[test]
    fn test_missing_variable_display() {
        let err = Error::missing_variable("APP_PORT");
        assert_eq!(err.to_string(), "APP_PORT is not set");
    }

    #[test]
    fn test_declaration_conflict_sorted() {
        let err = Error::declaration_conflict(vec!["port".to_string(), "host".to_string()]);
        assert_eq!(err.to_string(), "configuration clashes detected: host, port");
    }

    #[test]
    fn test_application_error_is_transparent() {
        let err = Error::from(anyhow::Error::new(PortRange));
        assert_eq!(err.to_string(), "port out of range");

        let Error::Application(inner) = err else {
            panic!("expected application error");
        };
        assert!(inner.downcast_ref::<PortRange>().is_some());
    }
}
