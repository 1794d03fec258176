//! Configuration discovery and effective settings resolution.
//!
//! speclint reads `speclint.toml|yaml|yml` from the repository root (or the
//! closest ancestor) and merges it with CLI flags into an `Effective` config.
//! Defaults:
//! - `policy`: none (required)
//! - `output`: `human`
//! - `parallel`: true
//! - `patterns`: none
//!
//! Overrides precedence: CLI > config file > defaults. For `[severity]`,
//! CLI `--severity rule=level` entries win over the file's entries.

use crate::models::Severity;
use crate::report::SeverityOverrides;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `speclint.toml|yaml`.
pub struct SpeclintConfig {
    pub policy: Option<String>,
    pub output: Option<String>,
    pub parallel: Option<bool>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub severity: HashMap<String, Severity>, // [severity] rule = "error"
    #[serde(default)]
    pub disable: Vec<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub policy: Option<PathBuf>,
    pub output: String,
    pub parallel: bool,
    pub patterns: Vec<String>,
    pub overrides: SeverityOverrides,
    pub disable: Vec<String>,
    /// Whether a `speclint.toml|yaml|yml` was found at `repo_root`.
    pub config_found: bool,
}

const CONFIG_NAMES: [&str; 3] = ["speclint.toml", "speclint.yaml", "speclint.yml"];

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `speclint.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `SpeclintConfig` from `speclint.toml` or `speclint.yaml|yml` if present.
///
/// A present but unreadable or invalid file is an error, not a silent default.
pub fn load_config(root: &Path) -> Result<Option<SpeclintConfig>, String> {
    let toml_path = root.join("speclint.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).map_err(|e| format!("{}: {}", toml_path.display(), e))?;
        let cfg: SpeclintConfig =
            toml::from_str(&s).map_err(|e| format!("{}: {}", toml_path.display(), e))?;
        return Ok(Some(cfg));
    }
    for yml in ["speclint.yaml", "speclint.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).map_err(|e| format!("{}: {}", p.display(), e))?;
            let cfg: SpeclintConfig =
                serde_yaml::from_str(&s).map_err(|e| format!("{}: {}", p.display(), e))?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

/// Parse a CLI `rule=level` override.
pub fn parse_severity_flag(flag: &str) -> Result<(String, Severity), String> {
    let (rule, level) = flag
        .rsplit_once('=')
        .ok_or_else(|| format!("expected rule=level, got '{}'", flag))?;
    let rule = rule.trim();
    if rule.is_empty() {
        return Err(format!("missing rule name in '{}'", flag));
    }
    Ok((rule.to_string(), level.parse()?))
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_policy: Option<&str>,
    cli_output: Option<&str>,
    cli_sequential: bool,
    cli_severity: &[(String, Severity)],
) -> Result<Effective, String> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let policy = cli_policy
        .map(PathBuf::from)
        .or_else(|| cfg.policy.as_ref().map(|p| repo_root.join(p)));

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    if !matches!(output.as_str(), "human" | "text" | "json") {
        return Err(format!("unknown output mode '{}' (expected human|text|json)", output));
    }

    let parallel = if cli_sequential {
        false
    } else {
        cfg.parallel.unwrap_or(true)
    };

    let mut overrides = SeverityOverrides::from(cfg.severity);
    let cli_overrides: SeverityOverrides = cli_severity.iter().cloned().collect();
    overrides.merge(&cli_overrides);

    Ok(Effective {
        repo_root,
        policy,
        output,
        parallel,
        patterns: cfg.patterns,
        overrides,
        disable: cfg.disable,
        config_found,
    })
}
