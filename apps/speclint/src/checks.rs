//! Built-in rule families.
//!
//! Each family is a `Check` variant compiled from a policy `RuleSpec`; a
//! `BuiltinRule` pairs a check with its name, severity and optional message.
//!
//! Paths are written as selectors: `title`, `sections.2.title`,
//! `sections.*.title`, `$.sections[*]["odd key"]`. Purely numeric segments are
//! indices and `*` matches every child of a mapping or sequence.

use crate::error::LintError;
use crate::models::policy::{ExpectedType, Predicate, RuleSpec};
use crate::models::{Diagnostic, DocumentNode, NodeKind, PathNotFound, PathSegment, Scalar, Severity};
use crate::rule::{Rule, RuleError};
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorStep {
    Key(String),
    Index(usize),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parsed path selector.
pub struct Selector {
    raw: String,
    steps: Vec<SelectorStep>,
}

/// Outcome of following a selector down one branch.
pub enum Selected<'a> {
    Found(&'a DocumentNode),
    /// `parent` exists but the next step does not.
    Missing {
        parent: &'a DocumentNode,
        error: PathNotFound,
    },
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let s = raw.trim();
        let s = s.strip_prefix('$').unwrap_or(s);
        let body = if s.is_empty() || s.starts_with('.') || s.starts_with('[') {
            s.to_string()
        } else {
            format!(".{}", s)
        };
        let mut steps = Vec::new();
        let mut rest = body.as_str();
        while !rest.is_empty() {
            if let Some(r) = rest.strip_prefix('.') {
                let end = r.find(['.', '[']).unwrap_or(r.len());
                let tok = &r[..end];
                if tok.is_empty() {
                    return Err("empty segment".to_string());
                }
                steps.push(if tok == "*" {
                    SelectorStep::Any
                } else if tok.bytes().all(|b| b.is_ascii_digit()) {
                    SelectorStep::Index(tok.parse().map_err(|_| format!("invalid index '{}'", tok))?)
                } else {
                    SelectorStep::Key(tok.to_string())
                });
                rest = &r[end..];
            } else if let Some(r) = rest.strip_prefix('[') {
                if r.starts_with('"') {
                    let close = closing_quote(&r[1..]).ok_or("unterminated quoted key")?;
                    let literal = &r[..close + 2];
                    let key: String = serde_json::from_str(literal)
                        .map_err(|e| format!("invalid quoted key {}: {}", literal, e))?;
                    rest = r[close + 2..].strip_prefix(']').ok_or("expected ']' after quoted key")?;
                    steps.push(SelectorStep::Key(key));
                } else {
                    let end = r.find(']').ok_or("unclosed '['")?;
                    let tok = r[..end].trim();
                    steps.push(if tok == "*" {
                        SelectorStep::Any
                    } else {
                        SelectorStep::Index(tok.parse().map_err(|_| format!("invalid index '{}'", tok))?)
                    });
                    rest = &r[end + 1..];
                }
            } else {
                return Err(format!("unexpected input at '{}'", rest));
            }
        }
        Ok(Self {
            raw: raw.trim().to_string(),
            steps,
        })
    }

    pub fn steps(&self) -> &[SelectorStep] {
        &self.steps
    }

    /// Follow the selector from `root`, reporting every matched node and
    /// every branch that stopped at a missing step.
    pub fn select<'a>(&self, root: &'a DocumentNode) -> Vec<Selected<'a>> {
        let mut out = Vec::new();
        walk(root, &self.steps, &mut out);
        out
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn walk<'a>(node: &'a DocumentNode, steps: &[SelectorStep], out: &mut Vec<Selected<'a>>) {
    let Some((step, rest)) = steps.split_first() else {
        out.push(Selected::Found(node));
        return;
    };
    let segment = match step {
        SelectorStep::Any => {
            for child in node.children() {
                walk(child, rest, out);
            }
            return;
        }
        SelectorStep::Key(k) => PathSegment::Key(k.clone()),
        SelectorStep::Index(i) => PathSegment::Index(*i),
    };
    match node.get(&segment) {
        Ok(child) => walk(child, rest, out),
        Err(error) => out.push(Selected::Missing { parent: node, error }),
    }
}

#[derive(Debug, Clone)]
/// Data-driven check variants.
pub enum Check {
    RequiredPath {
        selector: Selector,
        predicate: Option<Predicate>,
    },
    ForbiddenPath {
        selector: Selector,
    },
    Pattern {
        selector: Selector,
        regex: Regex,
    },
    Ordering {
        selector: Selector,
        order: Vec<String>,
        by: Option<String>,
    },
    SchemaType {
        selector: Selector,
        expected: ExpectedType,
    },
}

impl Check {
    fn family(&self) -> &'static str {
        match self {
            Check::RequiredPath { .. } => "required",
            Check::ForbiddenPath { .. } => "forbidden",
            Check::Pattern { .. } => "pattern",
            Check::Ordering { .. } => "order",
            Check::SchemaType { .. } => "type",
        }
    }

    fn selector(&self) -> &Selector {
        match self {
            Check::RequiredPath { selector, .. }
            | Check::ForbiddenPath { selector }
            | Check::Pattern { selector, .. }
            | Check::Ordering { selector, .. }
            | Check::SchemaType { selector, .. } => selector,
        }
    }
}

#[derive(Debug, Clone)]
/// A named, severity-tagged built-in check.
pub struct BuiltinRule {
    name: String,
    severity: Severity,
    message: Option<String>,
    check: Check,
}

impl BuiltinRule {
    pub fn new(name: impl Into<String>, severity: Severity, check: Check) -> Self {
        Self {
            name: name.into(),
            severity,
            message: None,
            check,
        }
    }

    /// Replace the default message of every finding.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Compile a policy entry. Invalid selectors and regexes fail here,
    /// before any document is evaluated.
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, LintError> {
        let name = spec.name().to_string();
        let selector = |raw: &str| {
            Selector::parse(raw).map_err(|reason| LintError::InvalidSelector {
                rule: name.clone(),
                selector: raw.to_string(),
                reason,
            })
        };
        let (check, level, message) = match spec {
            RuleSpec::Required {
                path,
                predicate,
                level,
                message,
                ..
            } => (
                Check::RequiredPath {
                    selector: selector(path)?,
                    predicate: *predicate,
                },
                level.unwrap_or(Severity::Error),
                message,
            ),
            RuleSpec::Forbidden {
                path,
                level,
                message,
                ..
            } => (
                Check::ForbiddenPath {
                    selector: selector(path)?,
                },
                level.unwrap_or(Severity::Error),
                message,
            ),
            RuleSpec::Pattern {
                path,
                regex,
                level,
                message,
                ..
            } => (
                Check::Pattern {
                    selector: selector(path)?,
                    regex: Regex::new(regex).map_err(|source| LintError::InvalidPattern {
                        rule: name.clone(),
                        source,
                    })?,
                },
                level.unwrap_or(Severity::Warning),
                message,
            ),
            RuleSpec::Order {
                path,
                order,
                by,
                level,
                message,
                ..
            } => (
                Check::Ordering {
                    selector: selector(path)?,
                    order: order.clone(),
                    by: by.clone(),
                },
                level.unwrap_or(Severity::Warning),
                message,
            ),
            RuleSpec::Type {
                path,
                expect,
                level,
                message,
                ..
            } => (
                Check::SchemaType {
                    selector: selector(path)?,
                    expected: *expect,
                },
                level.unwrap_or(Severity::Error),
                message,
            ),
        };
        let rule = BuiltinRule::new(name.clone(), level, check);
        Ok(match message {
            Some(m) => rule.with_message(m.clone()),
            None => rule,
        })
    }

    fn finding(&self, node: &DocumentNode, default_message: String) -> Diagnostic {
        let message = self.message.clone().unwrap_or(default_message);
        Diagnostic::at(node, self.name.clone(), self.severity, message)
    }

    fn eval_required(
        &self,
        root: &DocumentNode,
        selector: &Selector,
        predicate: Option<Predicate>,
    ) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for sel in selector.select(root) {
            match sel {
                Selected::Missing { parent, error } => out.push(self.finding(
                    parent,
                    format!("required path {} is missing", error.path),
                )),
                Selected::Found(node) => {
                    let (Some(pred), Some(value)) = (predicate, node.value()) else {
                        continue;
                    };
                    if !satisfies(pred, value) {
                        out.push(self.finding(node, format!("{} must be {}", node.path(), pred)));
                    }
                }
            }
        }
        out
    }

    fn eval_forbidden(&self, root: &DocumentNode, selector: &Selector) -> Vec<Diagnostic> {
        selector
            .select(root)
            .into_iter()
            .filter_map(|sel| match sel {
                Selected::Found(node) => {
                    Some(self.finding(node, format!("forbidden path {} is present", node.path())))
                }
                Selected::Missing { .. } => None,
            })
            .collect()
    }

    fn eval_pattern(
        &self,
        nodes: &[&DocumentNode],
        regex: &Regex,
    ) -> Result<Vec<Diagnostic>, RuleError> {
        let mut out = Vec::new();
        let mut skipped = None;
        let mut fitted = false;
        for node in nodes {
            let Some(value) = node.value() else {
                let reason = format!("{} is a {}, expected a scalar", node.path(), node.kind());
                log::debug!("rule {} skips {}", self.name, reason);
                skipped.get_or_insert(reason);
                continue;
            };
            fitted = true;
            match value.as_str() {
                Some(s) if regex.is_match(s) => {}
                Some(s) => out.push(self.finding(
                    node,
                    format!("'{}' at {} does not match pattern '{}'", s, node.path(), regex.as_str()),
                )),
                None => out.push(self.finding(
                    node,
                    format!("{} must be a string matching '{}', found {}", node.path(), regex.as_str(), value.type_name()),
                )),
            }
        }
        settle(out, fitted, skipped)
    }

    fn eval_ordering(
        &self,
        nodes: &[&DocumentNode],
        order: &[String],
        by: Option<&str>,
    ) -> Result<Vec<Diagnostic>, RuleError> {
        let mut out = Vec::new();
        let mut skipped = None;
        let mut fitted = false;
        for node in nodes {
            let labelled: Vec<(String, &DocumentNode)> = match node.kind() {
                NodeKind::Scalar => {
                    let reason = format!("{} is a scalar, ordering needs a sequence or mapping", node.path());
                    log::debug!("rule {} skips {}", self.name, reason);
                    skipped.get_or_insert(reason);
                    continue;
                }
                NodeKind::Mapping => node.entries().iter().map(|(k, n)| (k.clone(), n)).collect(),
                NodeKind::Sequence => node
                    .items()
                    .iter()
                    .filter_map(|item| item_label(item, by).map(|l| (l, item)))
                    .collect(),
            };
            let mut latest: Option<(usize, String)> = None;
            for (label, child) in labelled {
                let Some(rank) = rank_of(&label, order) else {
                    continue;
                };
                if let Some((top, prev)) = &latest {
                    if rank < *top {
                        out.push(self.finding(
                            child,
                            format!("'{}' must appear before '{}'", label, prev),
                        ));
                        continue;
                    }
                }
                latest = Some((rank, label));
            }
            fitted = true;
        }
        settle(out, fitted, skipped)
    }

    fn eval_type(&self, nodes: &[&DocumentNode], expected: ExpectedType) -> Vec<Diagnostic> {
        nodes
            .iter()
            .filter(|node| !matches_type(node, expected))
            .map(|node| {
                let found = node
                    .value()
                    .map(|v| v.type_name().to_string())
                    .unwrap_or_else(|| node.kind().to_string());
                self.finding(node, format!("{} must be {}, found {}", node.path(), expected, found))
            })
            .collect()
    }
}

/// Matched nodes of a selector; a selector that matched nothing because a
/// step is missing makes the rule inapplicable to this document.
fn found_nodes<'a>(selector: &Selector, root: &'a DocumentNode) -> Result<Vec<&'a DocumentNode>, RuleError> {
    let mut found = Vec::new();
    let mut first_missing = None;
    for sel in selector.select(root) {
        match sel {
            Selected::Found(node) => found.push(node),
            Selected::Missing { error, .. } => {
                first_missing.get_or_insert(error);
            }
        }
    }
    match first_missing {
        Some(error) if found.is_empty() => Err(error.into()),
        _ => Ok(found),
    }
}

/// Findings of a per-node check. Nodes of the wrong shape are skipped one by
/// one; the rule is inapplicable only when none of the matched nodes fit.
fn settle(out: Vec<Diagnostic>, fitted: bool, skipped: Option<String>) -> Result<Vec<Diagnostic>, RuleError> {
    match skipped {
        Some(reason) if !fitted => Err(RuleError::Inapplicable(reason)),
        _ => Ok(out),
    }
}

fn satisfies(predicate: Predicate, value: &Scalar) -> bool {
    match (predicate, value) {
        (_, Scalar::Null) => false,
        (Predicate::NonEmpty, Scalar::String(s)) => !s.trim().is_empty(),
        _ => true,
    }
}

fn matches_type(node: &DocumentNode, expected: ExpectedType) -> bool {
    match (expected, node.value()) {
        (ExpectedType::Mapping, _) => node.kind() == NodeKind::Mapping,
        (ExpectedType::Sequence, _) => node.kind() == NodeKind::Sequence,
        (ExpectedType::Scalar, v) => v.is_some(),
        (_, None) => false,
        (ExpectedType::String, Some(v)) => matches!(v, Scalar::String(_)),
        (ExpectedType::Integer, Some(v)) => v.type_name() == "integer",
        (ExpectedType::Number, Some(v)) => matches!(v, Scalar::Number(_)),
        (ExpectedType::Boolean, Some(v)) => matches!(v, Scalar::Bool(_)),
        (ExpectedType::Null, Some(v)) => matches!(v, Scalar::Null),
    }
}

fn item_label(item: &DocumentNode, by: Option<&str>) -> Option<String> {
    let node = match by {
        Some(field) => item.get(&PathSegment::Key(field.to_string())).ok()?,
        None => item,
    };
    node.value().map(|v| v.to_string())
}

/// Index of the longest declared entry that prefixes `label`.
fn rank_of(label: &str, order: &[String]) -> Option<usize> {
    order
        .iter()
        .enumerate()
        .filter(|(_, entry)| label.starts_with(entry.as_str()))
        .max_by_key(|(_, entry)| entry.len())
        .map(|(i, _)| i)
}

impl Rule for BuiltinRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate(&self, root: &DocumentNode) -> Result<Vec<Diagnostic>, RuleError> {
        match &self.check {
            Check::RequiredPath { selector, predicate } => {
                Ok(self.eval_required(root, selector, *predicate))
            }
            Check::ForbiddenPath { selector } => Ok(self.eval_forbidden(root, selector)),
            Check::Pattern { selector, regex } => {
                self.eval_pattern(&found_nodes(selector, root)?, regex)
            }
            Check::Ordering {
                selector,
                order,
                by,
            } => self.eval_ordering(&found_nodes(selector, root)?, order, by.as_deref()),
            Check::SchemaType { selector, expected } => {
                Ok(self.eval_type(&found_nodes(selector, root)?, *expected))
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.check.family(), self.check.selector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use serde_json::json;

    fn rule(toml_src: &str) -> BuiltinRule {
        let policy = crate::models::policy::Policy::from_toml_str(toml_src, std::path::Path::new("t.toml")).unwrap();
        BuiltinRule::from_spec(&policy.rules[0]).unwrap()
    }

    fn spec_doc() -> Document {
        Document::from_value(json!({
            "title": "Linter",
            "sections": [
                {"title": "1. Intro"},
                {"title": "3. Design"},
                {"title": "2. background"}
            ]
        }))
    }

    #[test]
    fn test_selector_parse_forms() {
        let s = Selector::parse("$.sections[*][\"odd key\"]").unwrap();
        assert_eq!(
            s.steps(),
            [
                SelectorStep::Key("sections".into()),
                SelectorStep::Any,
                SelectorStep::Key("odd key".into())
            ]
        );
        let s = Selector::parse("sections.2.title").unwrap();
        assert_eq!(s.steps()[1], SelectorStep::Index(2));
        assert!(Selector::parse("$").unwrap().steps().is_empty());
        assert!(Selector::parse("a..b").is_err());
        assert!(Selector::parse("a[x]").is_err());
        assert!(Selector::parse("a[\"x").is_err());
    }

    #[test]
    fn test_required_missing_reports_at_parent() {
        let r = rule("[[rules]]\nkind = \"required\"\nname = \"summary-required\"\npath = \"summary\"\n");
        let doc = spec_doc();
        let out = r.evaluate(doc.root()).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].path.is_root());
        assert_eq!(out[0].severity, Severity::Error);
        assert_eq!(out[0].message, "required path $.summary is missing");
    }

    #[test]
    fn test_required_predicate_non_empty() {
        let r = rule("[[rules]]\nkind = \"required\"\nname = \"t\"\npath = \"sections.*.title\"\npredicate = \"non-empty\"\n");
        let doc = Document::from_value(json!({"sections": [{"title": "  "}, {"title": "ok"}, {}]}));
        let out = r.evaluate(doc.root()).unwrap();
        let paths: Vec<_> = out.iter().map(|d| d.path.to_string()).collect();
        assert_eq!(paths, ["$.sections[0].title", "$.sections[2]"]);
    }

    #[test]
    fn test_forbidden_path() {
        let r = rule("[[rules]]\nkind = \"forbidden\"\nname = \"no-draft\"\npath = \"draft\"\n");
        assert!(r.evaluate(spec_doc().root()).unwrap().is_empty());
        let doc = Document::from_value(json!({"draft": true}));
        let out = r.evaluate(doc.root()).unwrap();
        assert_eq!(out[0].path.to_string(), "$.draft");
    }

    #[test]
    fn test_pattern_flags_lowercase_titles_only() {
        let r = rule("[[rules]]\nkind = \"pattern\"\nname = \"Pattern:title-case\"\npath = \"sections.*.title\"\nregex = \"^[0-9]+\\\\. [A-Z]\"\n");
        let out = r.evaluate(spec_doc().root()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].severity, Severity::Warning);
        assert_eq!(out[0].path.to_string(), "$.sections[2].title");
    }

    #[test]
    fn test_pattern_on_container_is_inapplicable() {
        let r = rule("[[rules]]\nkind = \"pattern\"\nname = \"p\"\npath = \"sections\"\nregex = \"x\"\n");
        assert!(matches!(r.evaluate(spec_doc().root()), Err(RuleError::Inapplicable(_))));
        let r = rule("[[rules]]\nkind = \"pattern\"\nname = \"p\"\npath = \"nope\"\nregex = \"x\"\n");
        assert!(matches!(r.evaluate(spec_doc().root()), Err(RuleError::Inapplicable(_))));
    }

    #[test]
    fn test_pattern_skips_only_the_odd_shaped_nodes() {
        let r = rule("[[rules]]\nkind = \"pattern\"\nname = \"Pattern:title-case\"\npath = \"sections.*.title\"\nregex = \"^[A-Z]\"\n");
        let doc = Document::from_value(json!({
            "sections": [{"title": "background"}, {"title": {"en": "Intro"}}]
        }));
        let out = r.evaluate(doc.root()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "$.sections[0].title");

        let doc = Document::from_value(json!({"sections": [{"title": {"en": "Intro"}}, {"title": []}]}));
        assert!(matches!(r.evaluate(doc.root()), Err(RuleError::Inapplicable(_))));
    }

    #[test]
    fn test_ordering_skips_scalar_matches() {
        let r = rule("[[rules]]\nkind = \"order\"\nname = \"o\"\npath = \"parts.*\"\norder = [\"a\", \"b\"]\n");
        let doc = Document::from_value(json!({"parts": ["loose", {"b": 1, "a": 2}]}));
        let out = r.evaluate(doc.root()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "$.parts[1].a");
    }

    #[test]
    fn test_ordering_by_label_prefix() {
        let r = rule("[[rules]]\nkind = \"order\"\nname = \"section-order\"\npath = \"sections\"\nby = \"title\"\norder = [\"1.\", \"2.\", \"3.\"]\n");
        let out = r.evaluate(spec_doc().root()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "$.sections[2]");
        assert_eq!(out[0].message, "'2. background' must appear before '3. Design'");
    }

    #[test]
    fn test_ordering_mapping_keys_and_scalar_inapplicable() {
        let r = rule("[[rules]]\nkind = \"order\"\nname = \"top-order\"\npath = \"$\"\norder = [\"title\", \"sections\"]\n");
        let doc = Document::from_value(json!({"sections": [], "extra": 1, "title": "x"}));
        let out = r.evaluate(doc.root()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "$.title");

        let r = rule("[[rules]]\nkind = \"order\"\nname = \"o\"\npath = \"title\"\norder = [\"a\"]\n");
        assert!(matches!(r.evaluate(spec_doc().root()), Err(RuleError::Inapplicable(_))));
    }

    #[test]
    fn test_schema_type() {
        let r = rule("[[rules]]\nkind = \"type\"\nname = \"version-int\"\npath = \"version\"\nexpect = \"integer\"\n");
        let doc = Document::from_value(json!({"version": "1"}));
        let out = r.evaluate(doc.root()).unwrap();
        assert_eq!(out[0].message, "$.version must be integer, found string");

        let doc = Document::from_value(json!({"version": 2}));
        assert!(r.evaluate(doc.root()).unwrap().is_empty());

        let r = rule("[[rules]]\nkind = \"type\"\nname = \"n\"\npath = \"v\"\nexpect = \"number\"\n");
        let doc = Document::from_value(json!({"v": 2}));
        assert!(r.evaluate(doc.root()).unwrap().is_empty());
    }

    #[test]
    fn test_custom_message_and_invalid_regex() {
        let r = rule("[[rules]]\nkind = \"forbidden\"\nname = \"no-draft\"\npath = \"draft\"\nmessage = \"remove the draft flag\"\n");
        let doc = Document::from_value(json!({"draft": true}));
        assert_eq!(r.evaluate(doc.root()).unwrap()[0].message, "remove the draft flag");

        let policy = crate::models::policy::Policy::from_toml_str(
            "[[rules]]\nkind = \"pattern\"\nname = \"bad\"\npath = \"a\"\nregex = \"(\"\n",
            std::path::Path::new("t.toml"),
        )
        .unwrap();
        assert!(matches!(
            BuiltinRule::from_spec(&policy.rules[0]),
            Err(LintError::InvalidPattern { .. })
        ));
    }
}
