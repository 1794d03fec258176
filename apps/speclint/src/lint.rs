//! Lint runner: evaluates every registered rule against a document.
//!
//! Each rule runs inside its own fault boundary and fills its own local
//! diagnostic list; lists are merged and put in report order afterwards, so
//! the result never depends on registry order or thread scheduling.
//! Rules may run in parallel (rayon) or sequentially with identical output.

use crate::error::LintError;
use crate::models::{Diagnostic, Document, NodePath, Position, Report, Severity};
use crate::registry::RuleRegistry;
use crate::report::{aggregate, SeverityOverrides};
use crate::rule::{Rule, RuleError};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
/// Cooperative cancellation flag, checked before each rule invocation.
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a registry against documents and produces reports.
pub struct Evaluator {
    registry: RuleRegistry,
    overrides: SeverityOverrides,
    parallel: bool,
}

impl Evaluator {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            overrides: SeverityOverrides::new(),
            parallel: true,
        }
    }

    pub fn with_overrides(mut self, overrides: SeverityOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// All diagnostics of one run, in report order, before overrides.
    pub fn collect(
        &self,
        doc: &Document,
        cancel: &CancellationToken,
    ) -> Result<Vec<Diagnostic>, LintError> {
        if cancel.is_cancelled() {
            return Err(LintError::Cancelled);
        }
        let guarded = |rule: &Arc<dyn Rule>| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(run_rule(rule.as_ref(), doc))
        };
        let rules = self.registry.rules();
        let per_rule: Option<Vec<Vec<Diagnostic>>> = if self.parallel {
            rules.par_iter().map(guarded).collect()
        } else {
            rules.iter().map(guarded).collect()
        };
        let Some(per_rule) = per_rule else {
            log::info!("lint run cancelled");
            return Err(LintError::Cancelled);
        };
        let mut combined: Vec<Diagnostic> = per_rule.into_iter().flatten().collect();
        combined.sort_by(|a, b| a.report_order(b));
        Ok(combined)
    }

    /// Lint one document. Fails only when cancelled.
    pub fn lint(&self, doc: &Document, cancel: &CancellationToken) -> Result<Report, LintError> {
        let diagnostics = self.collect(doc, cancel)?;
        Ok(aggregate(diagnostics, &self.overrides, self.registry.len()))
    }

    /// Lint many documents in parallel with the same registry.
    /// Results keep the input order.
    pub fn lint_batch(
        &self,
        docs: &[Document],
        cancel: &CancellationToken,
    ) -> Vec<Result<Report, LintError>> {
        docs.par_iter().map(|doc| self.lint(doc, cancel)).collect()
    }
}

/// Evaluate one rule inside its fault boundary.
///
/// Inapplicable rules contribute nothing. Internal errors, panics and
/// diagnostics pointing at paths absent from `doc` all collapse into one
/// synthetic error diagnostic named `<rule>:internal-error`.
fn run_rule(rule: &dyn Rule, doc: &Document) -> Vec<Diagnostic> {
    let name = rule.name();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(doc.root())));
    let failure = match outcome {
        Ok(Ok(found)) => {
            let dangling = found
                .iter()
                .find(|d| doc.resolve(d.path.segments()).is_err())
                .map(|d| d.path.to_string());
            match dangling {
                None => {
                    log::debug!("rule {} found {} diagnostic(s)", name, found.len());
                    return found;
                }
                Some(path) => format!("reported a diagnostic at unknown path {}", path),
            }
        }
        Ok(Err(RuleError::Inapplicable(reason))) => {
            log::debug!("rule {} skipped: {}", name, reason);
            return Vec::new();
        }
        Ok(Err(RuleError::Internal(message))) => message,
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    log::warn!("rule {} failed: {}", name, failure);
    vec![internal_error(name, failure)]
}

fn internal_error(rule_name: &str, message: String) -> Diagnostic {
    Diagnostic::new(
        format!("{}:internal-error", rule_name),
        Severity::Error,
        format!("rule '{}' failed: {}", rule_name, message),
        NodePath::root(),
        Position::start(),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
