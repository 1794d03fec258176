//! Diagnostic aggregation: severity overrides, ordering, dedup and verdict.

use crate::models::{Diagnostic, Report, Severity};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Operator-supplied `rule name -> severity` map applied before counting.
///
/// Names that match no diagnostic are ignored, so configs may mention rules
/// a given profile does not register.
pub struct SeverityOverrides(HashMap<String, Severity>);

impl SeverityOverrides {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn set(&mut self, rule: impl Into<String>, severity: Severity) {
        self.0.insert(rule.into(), severity);
    }

    pub fn get(&self, rule: &str) -> Option<Severity> {
        self.0.get(rule).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Later entries win over existing ones.
    pub fn merge(&mut self, other: &SeverityOverrides) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), *v);
        }
    }

    /// Assigns the overridden severity, so applying twice equals applying once.
    pub fn apply(&self, diagnostics: &mut [Diagnostic]) {
        if self.0.is_empty() {
            return;
        }
        for d in diagnostics.iter_mut() {
            if let Some(sev) = self.get(&d.rule_name) {
                d.severity = sev;
            }
        }
    }
}

impl From<HashMap<String, Severity>> for SeverityOverrides {
    fn from(map: HashMap<String, Severity>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Severity)> for SeverityOverrides {
    fn from_iter<I: IntoIterator<Item = (String, Severity)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Turn a flat diagnostic list into a `Report`.
///
/// Overrides are applied first, then diagnostics are put in report order and
/// exact duplicates dropped, then counted. `passed` depends on the error
/// count alone.
pub fn aggregate(
    mut diagnostics: Vec<Diagnostic>,
    overrides: &SeverityOverrides,
    rules_evaluated: usize,
) -> Report {
    overrides.apply(&mut diagnostics);
    diagnostics.sort_by(|a, b| a.report_order(b));
    diagnostics.dedup();

    let mut error_count = 0usize;
    let mut warning_count = 0usize;
    let mut info_count = 0usize;
    for d in &diagnostics {
        match d.severity {
            Severity::Error => error_count += 1,
            Severity::Warning => warning_count += 1,
            Severity::Info => info_count += 1,
        }
    }
    Report {
        diagnostics,
        error_count,
        warning_count,
        info_count,
        passed: error_count == 0,
        rules_evaluated,
    }
}
