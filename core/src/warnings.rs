//! Deprecation diagnostics.
//!
//! Resolving a variable through a deprecated alias is not an error, but the
//! application should hear about it. Notices go to a [`Diagnostics`] sink
//! passed into resolution; [`TracingDiagnostics`] forwards them to `tracing`
//! and [`RecordingDiagnostics`] keeps them for inspection.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A variable was found under a deprecated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationNotice {
    /// Fully prefixed deprecated key that held the value.
    pub deprecated_key: String,
    /// Fully prefixed key that should be used instead.
    pub replacement_key: String,
    /// Version in which the alias was deprecated.
    pub deprecated_in: Option<String>,
    /// Version in which the alias will be removed.
    pub removed_in: Option<String>,
}

impl fmt::Display for DeprecationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has been deprecated", self.deprecated_key)?;
        if let Some(version) = &self.deprecated_in {
            write!(f, " in version {version}")?;
        }
        if let Some(version) = &self.removed_in {
            write!(f, " and will be removed in version {version}")?;
        }
        write!(f, ". Use {} instead", self.replacement_key)
    }
}

/// Receiver for non-fatal resolution diagnostics.
pub trait Diagnostics {
    /// Called once for every variable resolved through a deprecated key.
    fn deprecated(&self, notice: &DeprecationNotice);
}

/// Emits diagnostics as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn deprecated(&self, notice: &DeprecationNotice) {
        tracing::warn!(
            deprecated = %notice.deprecated_key,
            replacement = %notice.replacement_key,
            "{notice}"
        );
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    /// Notices received so far.
    notices: Mutex<Vec<DeprecationNotice>>,
}

impl RecordingDiagnostics {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the notices received so far, in order.
    #[must_use]
    pub fn notices(&self) -> Vec<DeprecationNotice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn deprecated(&self, notice: &DeprecationNotice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}
