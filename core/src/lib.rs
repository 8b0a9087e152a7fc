//! Declarative binding of typed configuration attributes to environment variables.
//!
//! An application describes its configuration as a [`Schema`]: a prefix, a set
//! of typed [`Variable`]s, [`Derived`] values computed from them, and nested
//! schemas for sub-namespaces. [`Config::new`] resolves that schema against a
//! [`Source`] (by default the process environment) in one shot, producing a
//! fully populated configuration object or the first error encountered.
//!
//! Variable names are normalized into keys by uppercasing, turning dots into
//! underscores and dropping trailing underscores; prefixes accumulate across
//! nesting levels. Raw strings are coerced according to the declared
//! [`TypeTag`], with support for booleans, collections, mappings, unions,
//! custom parsers, validators and deprecated aliases.

pub mod coercion;
pub mod descriptor;
pub mod docs;
pub mod environ;
pub mod errors;
pub mod key;
pub mod options;
pub mod resolve;
pub mod schema;
pub mod types;
pub mod warnings;

pub use coercion::{MapFn, coerce};

pub use descriptor::{Deprecation, Derived, Variable, VariableBuilder};

pub use docs::HelpEntry;

pub use environ::{ProcessEnv, Source};

pub use errors::{Error, Result};

pub use key::normalize;

pub use options::ParseOptions;

pub use resolve::{Config, Entry};

pub use schema::{Member, Schema};

pub use types::{FromValue, TypeTag, Value};

pub use warnings::{DeprecationNotice, Diagnostics, RecordingDiagnostics, TracingDiagnostics};
