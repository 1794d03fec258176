//! Crate-level error taxonomy.
//!
//! Only configuration errors (raised while building a registry, before any
//! evaluation) and cancellation prevent a `Report`. Everything else that goes
//! wrong during a run is turned into a diagnostic.

use crate::models::EXIT_INTERNAL;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("duplicate rule name '{0}'")]
    DuplicateRuleName(String),

    #[error("rule name must not be empty")]
    EmptyRuleName,

    #[error("rule '{rule}' has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}' has an invalid path selector '{selector}': {reason}")]
    InvalidSelector {
        rule: String,
        selector: String,
        reason: String,
    },

    #[error("lint run cancelled")]
    Cancelled,

    #[error("invalid policy {file}: {message}")]
    Policy { file: PathBuf, message: String },

    #[error("cannot parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error("IO error on {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LintError {
    /// Every variant aborts before a report exists, which maps to exit status 2.
    pub fn exit_code(&self) -> i32 {
        EXIT_INTERNAL
    }
}
