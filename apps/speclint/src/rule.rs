//! The `Rule` capability: a named, severity-tagged check over a document tree.
//!
//! Rules are plain trait objects, shared as `Arc<dyn Rule>` across threads and
//! documents. Data-driven built-ins live in `checks`; ad-hoc rules can be
//! composed from a closure with `FnRule`.

use crate::models::{Diagnostic, DocumentNode, PathNotFound, Severity};
use std::fmt;
use thiserror::Error;

/// A single, independently testable check.
///
/// `evaluate` must be a pure function of `root`: rule violations are returned
/// as diagnostics, never as errors. Errors are reserved for "this document
/// shape is not mine" (`Inapplicable`) and genuine faults (`Internal`).
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn severity(&self) -> Severity;

    fn evaluate(&self, root: &DocumentNode) -> Result<Vec<Diagnostic>, RuleError>;

    /// Short human description used by `speclint rules`.
    fn describe(&self) -> String {
        String::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Non-diagnostic outcomes of a rule evaluation.
pub enum RuleError {
    /// The document shape does not fit this rule; it contributes nothing.
    #[error("rule does not apply: {0}")]
    Inapplicable(String),
    /// The rule itself failed; reported as a synthetic error diagnostic.
    #[error("internal rule error: {0}")]
    Internal(String),
}

impl From<PathNotFound> for RuleError {
    fn from(e: PathNotFound) -> Self {
        RuleError::Inapplicable(e.to_string())
    }
}

/// Rule backed by a closure receiving the rule's own name and severity.
pub struct FnRule<F> {
    name: String,
    severity: Severity,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&str, Severity, &DocumentNode) -> Result<Vec<Diagnostic>, RuleError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, severity: Severity, check: F) -> Self {
        Self {
            name: name.into(),
            severity,
            check,
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&str, Severity, &DocumentNode) -> Result<Vec<Diagnostic>, RuleError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate(&self, root: &DocumentNode) -> Result<Vec<Diagnostic>, RuleError> {
        (self.check)(&self.name, self.severity, root)
    }
}

impl<F> fmt::Debug for FnRule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish()
    }
}
