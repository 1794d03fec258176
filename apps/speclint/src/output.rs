//! Report rendering.
//!
//! - `text`: stable, uncolored, one line per diagnostic plus a summary line;
//!   suitable for piping and CI diffs. The CLI prefixes each line with the file.
//! - `human` (default): the same lines, colored unless `NO_COLOR` is set,
//!   under a per-file header.
//! - `json`: the serialized `Report`, with the file name added.
//!
//! An empty registry renders an extra warning line so it never looks like a
//! clean pass.

use crate::models::{Diagnostic, Report, Severity};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value as JsonVal;
use std::borrow::Cow;

const NO_RULES_LINE: &str = "warning: no rules were evaluated (the lint profile is empty)";

fn use_colors(output: &str) -> bool {
    output == "human" && std::env::var_os("NO_COLOR").is_none()
}

/// Escape control characters so document text never breaks a line apart.
fn one_line(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn line_body(d: &Diagnostic, severity: &str) -> String {
    format!(
        "{}: {} ({}) at {} [{}:{}]",
        severity,
        one_line(&d.message),
        one_line(&d.rule_name),
        one_line(&d.path.to_string()),
        d.position.start_line,
        d.position.start_column
    )
}

/// `<severity>: <message> (<rule-name>) at <path> [line:col]`
pub fn diagnostic_line(d: &Diagnostic) -> String {
    line_body(d, &d.severity.to_string())
}

pub fn summary_line(report: &Report) -> String {
    format!(
        "{} error(s), {} warning(s), {} info",
        report.error_count, report.warning_count, report.info_count
    )
}

/// Render a report in the stable text form, newline terminated.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    for d in &report.diagnostics {
        out.push_str(&diagnostic_line(d));
        out.push('\n');
    }
    if report.no_rules_ran() {
        out.push_str(NO_RULES_LINE);
        out.push('\n');
    }
    out.push_str(&summary_line(report));
    out.push('\n');
    out
}

/// Text form of one file's report with every line prefixed by `<file>: `,
/// so multi-file output stays attributable line by line.
pub fn render_file_text(file: &str, report: &Report) -> String {
    let file = one_line(file);
    render_text(report)
        .lines()
        .map(|line| format!("{}: {}\n", file, line))
        .collect()
}

#[derive(Serialize)]
/// Report of one file as emitted by `--output json`.
pub struct FileReport<'a> {
    pub file: &'a str,
    #[serde(flatten)]
    pub report: &'a Report,
}

/// Compose the JSON array emitted for a multi-file run.
pub fn compose_batch_json(results: &[(String, Report)]) -> Result<JsonVal, serde_json::Error> {
    let items: Vec<FileReport<'_>> = results
        .iter()
        .map(|(file, report)| FileReport { file, report })
        .collect();
    serde_json::to_value(items)
}

fn colored_severity(sev: Severity, color: bool) -> String {
    let label = sev.to_string();
    if !color {
        return label;
    }
    match sev {
        Severity::Error => label.red().bold().to_string(),
        Severity::Warning => label.yellow().bold().to_string(),
        Severity::Info => label.blue().bold().to_string(),
    }
}

/// Print the reports of a run in the requested mode.
pub fn print_lint(results: &[(String, Report)], output: &str) -> Result<(), serde_json::Error> {
    match output {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&compose_batch_json(results)?)?);
        }
        "text" => {
            for (file, report) in results {
                print!("{}", render_file_text(file, report));
            }
        }
        _ => {
            let color = use_colors(output);
            for (file, report) in results {
                if color {
                    println!("{}", file.bold());
                } else {
                    println!("{}", file);
                }
                for d in &report.diagnostics {
                    println!("  {}", line_body(d, &colored_severity(d.severity, color)));
                }
                if report.no_rules_ran() {
                    if color {
                        println!("  {}", NO_RULES_LINE.yellow());
                    } else {
                        println!("  {}", NO_RULES_LINE);
                    }
                }
                let summary = summary_line(report);
                if color {
                    println!("  {}", summary.bold());
                } else {
                    println!("  {}", summary);
                }
            }
        }
    }
    Ok(())
}
