//! speclint CLI binary entry point.
//! Resolves configuration, builds the rule registry, lints and prints results.

mod cli;
mod utils;

use clap::Parser;
use cli::{Cli, Commands};
use speclint::config::{self, Effective};
use speclint::lint::{CancellationToken, Evaluator};
use speclint::models::policy::Policy;
use speclint::models::{Document, Report, EXIT_INTERNAL, EXIT_PASSED};
use speclint::output;
use speclint::parse;
use speclint::registry::RuleRegistry;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let code = match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            EXIT_PASSED
        }
        Commands::Lint {
            files,
            repo_root,
            policy,
            output,
            severity,
            sequential,
        } => run_lint(
            &files,
            repo_root.as_deref(),
            policy.as_deref(),
            output.as_deref(),
            &severity,
            sequential,
        ),
        Commands::Rules { repo_root, policy } => run_rules(repo_root.as_deref(), policy.as_deref()),
    };
    std::process::exit(code);
}

fn fail(msg: impl Display) -> i32 {
    eprintln!("{} {}", utils::error_prefix(), msg);
    EXIT_INTERNAL
}

fn effective(
    repo_root: Option<&str>,
    policy: Option<&str>,
    output: Option<&str>,
    severity: &[String],
    sequential: bool,
) -> Result<Effective, String> {
    let flags = severity
        .iter()
        .map(|s| config::parse_severity_flag(s))
        .collect::<Result<Vec<_>, _>>()?;
    let eff = config::resolve_effective(repo_root, policy, output, sequential, &flags)?;
    if !eff.config_found {
        eprintln!("{} No speclint.toml found; using defaults.", utils::note_prefix());
    }
    Ok(eff)
}

/// Load the policy and build the registry; any configuration error
/// surfaces here, before a single document is read.
fn build_registry(eff: &Effective) -> Result<RuleRegistry, String> {
    let policy_path = eff
        .policy
        .as_ref()
        .ok_or("Policy is not configured. Pass --policy or add speclint.toml.")?;
    let policy = Policy::load(policy_path).map_err(|e| e.to_string())?;
    let mut registry = RuleRegistry::from_policy(&policy).map_err(|e| e.to_string())?;
    for name in &eff.disable {
        registry.unregister(name);
    }
    Ok(registry)
}

/// Expand globs into a sorted, de-duplicated file list. Plain paths are kept
/// as given so a missing file is reported instead of silently skipped.
fn expand_targets(patterns: &[String], base: Option<&Path>) -> Result<Vec<PathBuf>, String> {
    let mut out = BTreeSet::new();
    for pat in patterns {
        let full = match base {
            Some(b) if Path::new(pat).is_relative() => b.join(pat),
            _ => PathBuf::from(pat),
        };
        let pattern = full.to_string_lossy().to_string();
        if !pattern.contains(['*', '?', '[']) {
            out.insert(full);
            continue;
        }
        let entries = glob::glob(&pattern).map_err(|e| format!("bad glob pattern '{}': {}", pat, e))?;
        for entry in entries.flatten() {
            out.insert(entry);
        }
    }
    Ok(out.into_iter().collect())
}

fn run_lint(
    files: &[String],
    repo_root: Option<&str>,
    policy: Option<&str>,
    output: Option<&str>,
    severity: &[String],
    sequential: bool,
) -> i32 {
    let eff = match effective(repo_root, policy, output, severity, sequential) {
        Ok(e) => e,
        Err(e) => return fail(e),
    };
    let registry = match build_registry(&eff) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let targets = if files.is_empty() {
        expand_targets(&eff.patterns, Some(&eff.repo_root))
    } else {
        expand_targets(files, None)
    };
    let targets = match targets {
        Ok(t) if t.is_empty() => return fail("No input files. Pass files or set `patterns` in speclint.toml."),
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    let mut exit = EXIT_PASSED;
    let mut names: Vec<String> = Vec::new();
    let mut docs: Vec<Document> = Vec::new();
    for path in &targets {
        match parse::load_json(path) {
            Ok(doc) => {
                names.push(path.to_string_lossy().to_string());
                docs.push(doc);
            }
            Err(e) => exit = exit.max(fail(e)),
        }
    }

    log::debug!("linting {} document(s) with {} rule(s)", docs.len(), registry.len());
    let evaluator = Evaluator::new(registry)
        .with_overrides(eff.overrides.clone())
        .with_parallel(eff.parallel);
    let cancel = CancellationToken::new();
    let mut results: Vec<(String, Report)> = Vec::new();
    for (name, outcome) in names.into_iter().zip(evaluator.lint_batch(&docs, &cancel)) {
        match outcome {
            Ok(report) => {
                exit = exit.max(report.exit_code());
                results.push((name, report));
            }
            Err(e) => exit = exit.max(fail(format!("{}: {}", name, e))),
        }
    }
    if let Err(e) = output::print_lint(&results, &eff.output) {
        return fail(e);
    }
    exit
}

fn run_rules(repo_root: Option<&str>, policy: Option<&str>) -> i32 {
    let eff = match effective(repo_root, policy, None, &[], false) {
        Ok(e) => e,
        Err(e) => return fail(e),
    };
    let registry = match build_registry(&eff) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    for rule in registry.rules() {
        println!("{:<32} {:<8} {}", rule.name(), rule.severity(), rule.describe());
    }
    EXIT_PASSED
}
