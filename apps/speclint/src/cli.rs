//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "speclint",
    version,
    about = "Lint structured specification documents against a rule policy",
    long_about = "speclint — validate JSON specification documents against required paths, naming patterns, ordering and type rules.\n\nConfiguration precedence: CLI > speclint.toml > defaults.",
    after_help = "Examples:\n  speclint lint specs/api.json --policy lint/policy.toml\n  speclint lint 'specs/*.json' --output json\n  speclint rules --policy lint/policy.toml",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version
    Version,
    /// Lint documents
    #[command(
        about = "Run lint rules",
        long_about = "Evaluate every rule of the policy against each document. Exit status: 0 passed, 1 errors found, 2 configuration error or cancelled.",
        after_help = "Examples:\n  speclint lint spec.json --policy policy.toml\n  speclint lint 'specs/**/*.json' --severity Pattern:title-case=error"
    )]
    Lint {
        #[arg(help = "Files or glob patterns (default: `patterns` from speclint.toml)")]
        files: Vec<String>,
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Path to the policy file")]
        policy: Option<String>,
        #[arg(long, help = "Output mode: human|text|json (default: human)")]
        output: Option<String>,
        #[arg(long = "severity", value_name = "RULE=LEVEL", help = "Override a rule's severity (repeatable)")]
        severity: Vec<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Evaluate rules one at a time")]
        sequential: bool,
    },
    /// List the rules of a policy
    #[command(about = "List registered rules")]
    Rules {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Path to the policy file")]
        policy: Option<String>,
    },
}
