//! End-to-end tests for the lint pipeline: policy -> registry -> evaluator -> report -> text.

use pretty_assertions::assert_eq;
use serde_json::json;
use speclint::checks::BuiltinRule;
use speclint::models::policy::Policy;
use speclint::models::{PathSegment, Position, EXIT_FAILED, EXIT_INTERNAL, EXIT_PASSED};
use speclint::output::render_text;
use speclint::parse::{load_json, parse_json};
use speclint::report::{aggregate, SeverityOverrides};
use speclint::rule::FnRule;
use speclint::{
    CancellationToken, Diagnostic, Document, DocumentNode, Evaluator, LintError, Rule, RuleError,
    RuleRegistry, Severity,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn policy(src: &str) -> Policy {
    Policy::from_toml_str(src, Path::new("inline.toml")).unwrap()
}

fn lint(registry: RuleRegistry, doc: &Document) -> speclint::Report {
    Evaluator::new(registry)
        .lint(doc, &CancellationToken::new())
        .unwrap()
}

const TITLE_CASE: &str = r#"
[[rules]]
kind = "pattern"
name = "Pattern:title-case"
path = "sections.*.title"
regex = "^[A-Z]"
"#;

const SECTIONS_DOC: &str = r#"{
  "title": "Spec",
  "sections": [
    {"title": "Intro"},
    {"title": "background"}
  ]
}"#;

#[test]
fn test_missing_required_title_fails_at_document_root() {
    let registry = RuleRegistry::from_policy(&policy(
        "[[rules]]\nkind = \"required\"\nname = \"title-required\"\npath = \"title\"\n",
    ))
    .unwrap();
    let doc = parse_json("{\n  \"name\": \"x\"\n}", "spec.json").unwrap();
    let report = lint(registry, &doc);

    assert_eq!(report.diagnostics.len(), 1);
    let d = &report.diagnostics[0];
    assert_eq!(d.severity, Severity::Error);
    assert!(d.path.is_root());
    assert_eq!(d.position, doc.root().position());
    assert!(!report.passed);
    assert_eq!(report.exit_code(), EXIT_FAILED);
}

#[test]
fn test_duplicate_rule_names_abort_before_evaluation() {
    let err = RuleRegistry::from_policy(&policy(
        r#"
[[rules]]
kind = "required"
name = "title-required"
path = "title"

[[rules]]
kind = "forbidden"
name = "title-required"
path = "draft"
"#,
    ))
    .err()
    .unwrap();
    assert!(matches!(err, LintError::DuplicateRuleName(ref n) if n == "title-required"));
    assert_eq!(err.exit_code(), EXIT_INTERNAL);
}

#[test]
fn test_pattern_warning_does_not_fail_the_run() {
    let doc = parse_json(SECTIONS_DOC, "spec.json").unwrap();
    let report = lint(RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap(), &doc);

    assert_eq!(report.diagnostics.len(), 1);
    let d = &report.diagnostics[0];
    assert_eq!(d.severity, Severity::Warning);
    assert_eq!(d.path.to_string(), "$.sections[1].title");
    let node = doc.resolve(d.path.segments()).unwrap();
    assert_eq!(d.position, node.position());
    assert_eq!(d.position.start_line, 5);
    assert!(report.passed);
    assert_eq!(report.exit_code(), EXIT_PASSED);
}

#[test]
fn test_mixed_shapes_under_wildcard_keep_real_findings() {
    let doc = parse_json(
        r#"{"sections": [{"title": "background"}, {"title": {"en": "Intro"}}]}"#,
        "mixed.json",
    )
    .unwrap();
    let report = lint(RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap(), &doc);

    assert_eq!(report.warning_count, 1);
    assert_eq!(report.diagnostics[0].path.to_string(), "$.sections[0].title");
    assert_ne!(render_text(&report), "0 error(s), 0 warning(s), 0 info\n");
}

#[test]
fn test_multiline_title_renders_on_one_line() {
    let doc = parse_json(
        r#"{"sections": [{"title": "bad\nerror: fake (x) at $ [1:1]"}]}"#,
        "forged.json",
    )
    .unwrap();
    let report = lint(RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap(), &doc);
    let text = render_text(&report);

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().all(|l| !l.starts_with("error:")));
}

#[test]
fn test_severity_override_escalates_pattern_to_error() {
    let doc = parse_json(SECTIONS_DOC, "spec.json").unwrap();
    let mut overrides = SeverityOverrides::new();
    overrides.set("Pattern:title-case", Severity::Error);
    overrides.set("rule-that-does-not-exist", Severity::Info);
    let report = Evaluator::new(RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap())
        .with_overrides(overrides.clone())
        .lint(&doc, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].severity, Severity::Error);
    assert!(!report.passed);
    let again = aggregate(report.diagnostics.clone(), &overrides, report.rules_evaluated);
    assert_eq!(again, report);
}

fn strict_sections() -> Arc<dyn Rule> {
    Arc::new(FnRule::new(
        "sections-are-mappings",
        Severity::Warning,
        |name: &str, sev, root: &DocumentNode| {
            let Ok(sections) = root.resolve(&[PathSegment::from("sections")]) else {
                return Err(RuleError::Inapplicable("no sections".into()));
            };
            let mut out = Vec::new();
            for item in sections.items() {
                let title = item
                    .resolve(&[PathSegment::from("title")])
                    .map_err(|e| RuleError::Internal(format!("malformed sequence: {}", e)))?;
                if title.value().is_none() {
                    out.push(Diagnostic::at(title, name, sev, "title must be a scalar"));
                }
            }
            Ok(out)
        },
    ))
}

#[test]
fn test_faulty_rule_is_isolated_from_the_rest() {
    let mut registry = RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap();
    registry.register(strict_sections()).unwrap();
    let doc = Document::from_value(json!({
        "sections": [{"title": "lower"}, "not a mapping"]
    }));
    let report = lint(registry, &doc);

    let names: Vec<_> = report.diagnostics.iter().map(|d| d.rule_name.as_str()).collect();
    assert_eq!(names, ["Pattern:title-case", "sections-are-mappings:internal-error"]);
    assert_eq!(report.diagnostics[1].severity, Severity::Error);
    assert_eq!(report.diagnostics[1].position, Position::start());
    assert_eq!(report.rules_evaluated, 2);
}

#[test]
fn test_isolation_keeps_verdict_when_internal_error_is_downgraded() {
    let mut registry = RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap();
    registry.register(strict_sections()).unwrap();
    let doc = Document::from_value(json!({"sections": ["oops", {"title": "Fine"}]}));
    let mut overrides = SeverityOverrides::new();
    overrides.set("sections-are-mappings:internal-error", Severity::Warning);
    let report = Evaluator::new(registry)
        .with_overrides(overrides)
        .lint(&doc, &CancellationToken::new())
        .unwrap();
    assert!(report.passed);
    assert_eq!(report.warning_count, 1);
}

fn fixture_rules() -> Vec<Arc<dyn Rule>> {
    let policy = Policy::load(&fixtures_path().join("policy.toml")).unwrap();
    policy
        .rules
        .iter()
        .map(|spec| Arc::new(BuiltinRule::from_spec(spec).unwrap()) as Arc<dyn Rule>)
        .chain(std::iter::once(strict_sections()))
        .collect()
}

#[test]
fn test_output_is_identical_across_runs_and_registration_orders() {
    let doc = load_json(&fixtures_path().join("spec.json")).unwrap();
    let render = |rules: Vec<Arc<dyn Rule>>, parallel: bool| {
        let mut registry = RuleRegistry::new();
        for r in rules {
            registry.register(r).unwrap();
        }
        let report = Evaluator::new(registry)
            .with_parallel(parallel)
            .lint(&doc, &CancellationToken::new())
            .unwrap();
        render_text(&report)
    };

    let baseline = render(fixture_rules(), true);
    assert_eq!(render(fixture_rules(), true), baseline);

    let mut reversed = fixture_rules();
    reversed.reverse();
    assert_eq!(render(reversed, false), baseline);

    let mut rotated = fixture_rules();
    rotated.rotate_left(2);
    assert_eq!(render(rotated, true), baseline);

    assert_eq!(
        baseline,
        "warning: 'background' at $.sections[1].title does not match pattern '^[A-Z]' (Pattern:title-case) at $.sections[1].title [6:6]\n\
         0 error(s), 1 warning(s), 0 info\n"
    );
}

#[test]
fn test_clean_pass_renders_differently_from_empty_registry() {
    let doc = parse_json("{\"title\": \"Spec\", \"sections\": [{\"title\": \"Intro\"}]}", "ok.json").unwrap();
    let clean = lint(RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap(), &doc);
    let empty = lint(RuleRegistry::new(), &doc);

    assert!(clean.passed && clean.diagnostics.is_empty());
    assert!(empty.passed && empty.diagnostics.is_empty());
    assert_eq!(render_text(&clean), "0 error(s), 0 warning(s), 0 info\n");
    assert_ne!(render_text(&clean), render_text(&empty));
}

#[test]
fn test_disabled_rule_is_removed_from_profile() {
    let mut registry = RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap();
    registry.unregister("Pattern:title-case");
    registry.unregister("Pattern:title-case");
    let doc = parse_json(SECTIONS_DOC, "spec.json").unwrap();
    let report = lint(registry, &doc);
    assert!(report.no_rules_ran());
}

#[test]
fn test_cancelled_batch_produces_no_reports() {
    let docs = vec![parse_json(SECTIONS_DOC, "a.json").unwrap(); 3];
    let cancel = CancellationToken::new();
    cancel.cancel();
    let eval = Evaluator::new(RuleRegistry::from_policy(&policy(TITLE_CASE)).unwrap());
    for outcome in eval.lint_batch(&docs, &cancel) {
        let err = outcome.unwrap_err();
        assert!(matches!(err, LintError::Cancelled));
        assert_eq!(err.exit_code(), EXIT_INTERNAL);
    }
}
