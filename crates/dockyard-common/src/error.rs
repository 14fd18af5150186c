//! Unified error types for the Dockyard workspace.
//!
//! The compose engine never stops at the first problem it finds: it
//! collects every [`DockyardError`] of a run into [`Diagnostics`] so a
//! single invocation reports all configuration mistakes at once.

use std::fmt;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DockyardError {
    /// A request, service, or setting carries an invalid value.
    #[error("invalid {subject} \"{value}\": {reason}")]
    Validation {
        /// What was being validated (e.g. `cache version`).
        subject: String,
        /// The offending value, verbatim.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A later consumer asked a shared entry for a configuration that differs
    /// from the one its first consumer fixed.
    #[error("service \"{consumer}\" requests a different {field} for shared entry \"{key}\" than the one already configured")]
    Conflict {
        /// Canonical name of the shared entry.
        key: String,
        /// Name of the diverging override.
        field: &'static str,
        /// Service whose request diverges.
        consumer: String,
    },

    /// A dependency edge points at an entry that is not part of the document.
    #[error("dependency of \"{from}\" targets missing entry \"{target}\"")]
    MissingTarget {
        /// Entry declaring the dependency.
        from: String,
        /// Name that did not resolve.
        target: String,
    },

    /// The dependency graph contains a cycle.
    #[error("cyclic dependency detected involving \"{node}\"")]
    Cycle {
        /// A node that takes part in the cycle.
        node: String,
    },

    /// No provider is registered for a resource kind.
    #[error("no provider registered for resource kind \"{kind}\" requested by \"{consumer}\"")]
    UnsupportedKind {
        /// The kind that has no provider.
        kind: String,
        /// Service that requested it.
        consumer: String,
    },
}

impl DockyardError {
    /// Builds a [`DockyardError::Validation`].
    pub fn validation(
        subject: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            subject: subject.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for structural graph errors (missing target or cycle).
    #[must_use]
    pub const fn is_graph(&self) -> bool {
        matches!(self, Self::MissingTarget { .. } | Self::Cycle { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DockyardError>;

/// A non-empty collection of errors gathered during one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<DockyardError>);

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Records an error.
    pub fn push(&mut self, error: DockyardError) {
        self.0.push(error);
    }

    /// Records the error of a failed result and returns its success value, if any.
    pub fn capture<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    /// Returns `true` if no error was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the recorded errors in the order they were found.
    pub fn iter(&self) -> std::slice::Iter<'_, DockyardError> {
        self.0.iter()
    }

    /// Returns `Ok(value)` when nothing was recorded, the diagnostics otherwise.
    ///
    /// # Errors
    ///
    /// Returns `self` if at least one error was recorded.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl From<DockyardError> for Diagnostics {
    fn from(error: DockyardError) -> Self {
        Self(vec![error])
    }
}

impl Extend<DockyardError> for Diagnostics {
    fn extend<I: IntoIterator<Item = DockyardError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = DockyardError;
    type IntoIter = std::vec::IntoIter<DockyardError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DockyardError;
    type IntoIter = std::slice::Iter<'a, DockyardError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
