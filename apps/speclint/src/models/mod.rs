//! Shared data models: document tree, diagnostics, report and policy schema.

pub mod document;
pub mod policy;

pub use document::{Document, DocumentNode, NodeKind, NodePath, PathNotFound, PathSegment, Position, Scalar};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Exit status of a completed run without errors.
pub const EXIT_PASSED: i32 = 0;
/// Exit status of a completed run with at least one error.
pub const EXIT_FAILED: i32 = 1;
/// Exit status when no report could be produced (cancellation, bad configuration).
pub const EXIT_INTERNAL: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
/// Severity of a finding. Only `Error` fails a run.
///
/// Deserialization goes through `FromStr`, so policy and config files accept
/// the same spellings as `--severity` (`err`, `warn`, any case).
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        s.parse()
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "err" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity '{}' (expected error|warning|info)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
/// A single finding with severity and location.
pub struct Diagnostic {
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    pub path: NodePath,
    pub position: Position,
}

impl Diagnostic {
    pub fn new(
        rule_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        path: NodePath,
        position: Position,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            severity,
            message: message.into(),
            path,
            position,
        }
    }

    /// Finding attributed to `node`, copying its path and position.
    pub fn at(
        node: &DocumentNode,
        rule_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self::new(rule_name, severity, message, node.path().clone(), node.position())
    }

    /// Total report order: start line, start column, rule name, message.
    /// Path, end position and severity only break remaining ties.
    pub fn report_order(&self, other: &Self) -> Ordering {
        let a = &self.position;
        let b = &other.position;
        (a.start_line, a.start_column)
            .cmp(&(b.start_line, b.start_column))
            .then_with(|| self.rule_name.cmp(&other.rule_name))
            .then_with(|| self.message.cmp(&other.message))
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| (a.end_line, a.end_column).cmp(&(b.end_line, b.end_column)))
            .then_with(|| severity_rank(self.severity).cmp(&severity_rank(other.severity)))
    }
}

fn severity_rank(s: Severity) -> u8 {
    match s {
        Severity::Error => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Aggregated outcome of one lint run over one document.
///
/// Field order is the serialized order and is kept stable; new fields are
/// only ever appended.
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub passed: bool,
    pub rules_evaluated: usize,
}

impl Report {
    /// True when the registry was empty, as opposed to a clean pass.
    pub fn no_rules_ran(&self) -> bool {
        self.rules_evaluated == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed {
            EXIT_PASSED
        } else {
            EXIT_FAILED
        }
    }
}
