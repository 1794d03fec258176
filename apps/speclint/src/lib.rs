//! speclint core library.
//!
//! A rule engine for structured specification documents: a pluggable set of
//! checks runs against a parsed document tree and yields position-aware
//! diagnostics, aggregated into a pass/fail report.
//!
//! High-level modules:
//! - `models`: Document tree, diagnostics, report and policy schema.
//! - `rule`: The `Rule` trait and its non-diagnostic outcomes.
//! - `checks`: Built-in rule families (required, forbidden, pattern, order, type).
//! - `registry`: Ordered, name-unique rule collection.
//! - `lint`: Evaluator with per-rule fault isolation and cancellation.
//! - `report`: Severity overrides and aggregation into a `Report`.
//! - `output`: Text/human/JSON rendering.
//! - `parse`: JSON loader producing positioned documents.
//! - `config`: Discovery and effective configuration resolution.
//! - `error`: Crate error taxonomy.
pub mod checks;
pub mod config;
pub mod error;
pub mod lint;
pub mod models;
pub mod output;
pub mod parse;
pub mod registry;
pub mod report;
pub mod rule;

pub use error::LintError;
pub use lint::{CancellationToken, Evaluator};
pub use models::{Diagnostic, Document, DocumentNode, Report, Severity};
pub use registry::RuleRegistry;
pub use rule::{Rule, RuleError};
