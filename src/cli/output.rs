//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! run results to the user in various formats.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};
use uuid::Uuid;

use crate::apply::{ApplyOutcome, ApplyStatus, BatchResult};
use crate::cluster::{CheckFinding, ValidationReport};
use crate::config::ValidationIssue;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Outcome row for table display.
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Stanza")]
    title: String,
    #[tabled(rename = "App")]
    app: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Failed check row for table display.
#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Member")]
    member: String,
    #[tabled(rename = "Stanza")]
    stanza: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// JSON document describing one run.
#[derive(Serialize)]
struct RunJson<'a> {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    outcomes: &'a [ApplyOutcome],
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationJson<'a>>,
}

/// JSON view of a validation report with its tally.
#[derive(Serialize)]
struct ValidationJson<'a> {
    summary: String,
    stanzas_verified: usize,
    stanzas_checked: usize,
    checks_passed: usize,
    checks_total: usize,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

/// JSON view of one validation issue.
#[derive(Serialize)]
struct IssueJson {
    index: usize,
    title: String,
    error: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of an apply run, with its validation report if any.
    #[must_use]
    pub fn format_run(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        batch: &BatchResult,
        validation: Option<&ValidationReport>,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let doc = RunJson {
                    run_id,
                    started_at,
                    succeeded: batch.succeeded(),
                    failed: batch.failed(),
                    skipped: batch.skipped(),
                    outcomes: &batch.outcomes,
                    validation: validation.map(ValidationJson::from),
                };
                serde_json::to_string_pretty(&doc).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = Self::format_batch_text(batch);
                if let Some(report) = validation {
                    output.push_str(&Self::format_validation_text(report));
                }
                output
            }
        }
    }

    /// Formats a batch as text.
    fn format_batch_text(batch: &BatchResult) -> String {
        if batch.outcomes.is_empty() {
            return String::from("\nNo stanzas to apply.\n");
        }

        let mut output = String::from("\nApplied stanzas\n\n");

        let rows: Vec<OutcomeRow> = batch
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| OutcomeRow {
                index: i + 1,
                title: Self::truncate(&o.item.title, 40),
                app: o.item.app.clone().unwrap_or_else(|| String::from("-")),
                status: Self::format_status(o.status),
                detail: Self::truncate(&o.detail, 60),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nComplete: {} succeeded, {} failed, {} skipped\n",
            batch.succeeded().to_string().green(),
            batch.failed().to_string().red(),
            batch.skipped().to_string().yellow()
        );

        output
    }

    /// Formats a validation report as text.
    fn format_validation_text(report: &ValidationReport) -> String {
        let mut output = String::from("\nCluster validation\n\n");

        if report.is_aborted() {
            let _ = writeln!(
                output,
                "{} Aborted: {}",
                "⚠".yellow(),
                report.abort_reason.as_deref().unwrap_or("unknown reason")
            );
            return output;
        }

        let failed: Vec<CheckRow> = report
            .results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| CheckRow {
                member: r.member.clone(),
                stanza: Self::truncate(&r.stanza, 40),
                result: r.finding.label().red().to_string(),
                detail: Self::truncate(&Self::finding_detail(&r.finding), 60),
            })
            .collect();

        if !failed.is_empty() {
            output.push_str(&Table::new(failed).to_string());
            output.push('\n');
        }

        let mark = if report.all_passed() {
            "✓".green()
        } else {
            "✗".red()
        };
        let _ = writeln!(output, "{mark} {report}");

        output
    }

    /// Formats the result of an offline validation.
    #[must_use]
    pub fn format_issues(&self, total: usize, issues: &[ValidationIssue]) -> String {
        match self.format {
            OutputFormat::Json => {
                let doc: Vec<IssueJson> = issues
                    .iter()
                    .map(|i| IssueJson {
                        index: i.index,
                        title: i.title.clone(),
                        error: i.error.to_string(),
                    })
                    .collect();
                serde_json::to_string_pretty(&serde_json::json!({
                    "items": total,
                    "issues": doc,
                }))
                .unwrap_or_default()
            }
            OutputFormat::Text => {
                if issues.is_empty() {
                    return format!("{} {total} stanza(s) are valid.\n", "✓".green());
                }

                let mut output = format!(
                    "{} {}/{total} stanza(s) have problems:\n\n",
                    "✗".red(),
                    issues.len()
                );
                for issue in issues {
                    let _ = writeln!(output, "   - {issue}");
                }
                output
            }
        }
    }

    fn format_status(status: ApplyStatus) -> String {
        match status {
            ApplyStatus::Created => status.to_string().green().to_string(),
            ApplyStatus::Updated => status.to_string().cyan().to_string(),
            ApplyStatus::Skipped => status.to_string().yellow().to_string(),
            ApplyStatus::Failed => status.to_string().red().to_string(),
        }
    }

    fn finding_detail(finding: &CheckFinding) -> String {
        match finding {
            CheckFinding::Pass | CheckFinding::Missing => String::new(),
            CheckFinding::Drift { mismatches } => mismatches
                .iter()
                .map(|m| format!("{}: expected={:?}, got={:?}", m.key, m.expected, m.actual))
                .collect::<Vec<_>>()
                .join("; "),
            CheckFinding::Error { message } | CheckFinding::Unreachable { message } => {
                message.clone()
            }
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

impl<'a> From<&'a ValidationReport> for ValidationJson<'a> {
    fn from(report: &'a ValidationReport) -> Self {
        Self {
            summary: report.to_string(),
            stanzas_verified: report.stanzas_verified(),
            stanzas_checked: report.stanzas_checked(),
            checks_passed: report.checks_passed(),
            checks_total: report.checks_total(),
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ValidationPhase, VerificationResult};
    use crate::config::ChangeItem;
    use crate::splunk::ResolvedTarget;

    fn batch() -> BatchResult {
        let item = ChangeItem::new("my_search").with_setting("search", "index=main");
        let target = ResolvedTarget {
            stanza_path: String::from("/servicesNS/nobody/search/configs/conf-savedsearches/my_search"),
            collection_path: String::from("/servicesNS/nobody/search/configs/conf-savedsearches"),
        };
        BatchResult {
            outcomes: vec![
                ApplyOutcome::updated(&item, target, "HTTP 200"),
                ApplyOutcome::failed(&ChangeItem::new("broken"), None, "Status: 500, Body: oops"),
            ],
        }
    }

    #[test]
    fn test_json_run_document() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let out = formatter.format_run(Uuid::new_v4(), Utc::now(), &batch(), None);
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(doc["succeeded"], 1);
        assert_eq!(doc["failed"], 1);
        assert_eq!(doc["outcomes"][0]["status"], "updated");
        assert_eq!(doc["outcomes"][0]["item"]["configs"]["search"], "index=main");
        assert!(doc.get("validation").is_none());
    }

    #[test]
    fn test_json_includes_validation_tally() {
        let report = ValidationReport {
            phase: ValidationPhase::Done,
            captain: Some(String::from("sh1")),
            members: Vec::new(),
            results: vec![VerificationResult::new("my_search", "/p", "sh2", CheckFinding::Missing)],
            abort_reason: None,
        };
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let out = formatter.format_run(Uuid::new_v4(), Utc::now(), &batch(), Some(&report));
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(doc["validation"]["checks_total"], 1);
        assert_eq!(doc["validation"]["phase"], "done");
        assert_eq!(doc["validation"]["results"][0]["finding"]["kind"], "missing");
    }

    #[test]
    fn test_text_run_contains_summary() {
        colored::control::set_override(false);
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let out = formatter.format_run(Uuid::new_v4(), Utc::now(), &batch(), None);
        assert!(out.contains("my_search"));
        assert!(out.contains("Complete: 1 succeeded, 1 failed, 0 skipped"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("abcdefghij", 8), "abcde...");
    }
}
