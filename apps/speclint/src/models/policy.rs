//! Policy schema: the lint profile loaded from TOML.
//!
//! A policy is a list of `[[rules]]` tables tagged by `kind`:
//! - `required`: a path must resolve (optionally with a scalar `predicate`).
//! - `forbidden`: a path must not resolve.
//! - `pattern`: string scalars at a path must match `regex`.
//! - `order`: children of a node must follow the declared `order`.
//! - `type`: nodes at a path must be of kind/type `expect`.
//!
//! Every rule carries a unique `name`, an optional `level`
//! (error|warning|info) and an optional `message` replacing the default one.

use crate::error::LintError;
use crate::models::Severity;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Default)]
/// Root policy document.
pub struct Policy {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "kind")]
/// One configured rule.
pub enum RuleSpec {
    #[serde(rename = "required")]
    Required {
        name: String,
        path: String,
        #[serde(default)]
        predicate: Option<Predicate>,
        #[serde(default)]
        level: Option<Severity>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "forbidden")]
    Forbidden {
        name: String,
        path: String,
        #[serde(default)]
        level: Option<Severity>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "pattern")]
    Pattern {
        name: String,
        path: String,
        regex: String,
        #[serde(default)]
        level: Option<Severity>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "order")]
    Order {
        name: String,
        path: String,
        order: Vec<String>,
        /// Field used as the label of sequence items (e.g. `title`).
        #[serde(default)]
        by: Option<String>,
        #[serde(default)]
        level: Option<Severity>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "type")]
    Type {
        name: String,
        path: String,
        expect: ExpectedType,
        #[serde(default)]
        level: Option<Severity>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl RuleSpec {
    pub fn name(&self) -> &str {
        match self {
            RuleSpec::Required { name, .. }
            | RuleSpec::Forbidden { name, .. }
            | RuleSpec::Pattern { name, .. }
            | RuleSpec::Order { name, .. }
            | RuleSpec::Type { name, .. } => name,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
/// Extra condition a required scalar must satisfy.
pub enum Predicate {
    /// Strings must contain a non-whitespace character; null never passes.
    NonEmpty,
    NotNull,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::NonEmpty => write!(f, "non-empty"),
            Predicate::NotNull => write!(f, "not null"),
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Expected node kind or primitive scalar type.
pub enum ExpectedType {
    Mapping,
    Sequence,
    Scalar,
    String,
    Integer,
    /// Any number, integers included.
    Number,
    Boolean,
    Null,
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpectedType::Mapping => "mapping",
            ExpectedType::Sequence => "sequence",
            ExpectedType::Scalar => "scalar",
            ExpectedType::String => "string",
            ExpectedType::Integer => "integer",
            ExpectedType::Number => "number",
            ExpectedType::Boolean => "boolean",
            ExpectedType::Null => "null",
        };
        write!(f, "{}", s)
    }
}

impl Policy {
    pub fn from_toml_str(s: &str, file: &Path) -> Result<Self, LintError> {
        toml::from_str(s).map_err(|e| LintError::Policy {
            file: file.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read and parse a policy file.
    pub fn load(path: &Path) -> Result<Self, LintError> {
        let s = fs::read_to_string(path).map_err(|source| LintError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s, path)
    }
}
