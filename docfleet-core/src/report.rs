//! Report types and formatting for DocFleet outputs.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::domain::{Issue, IssueKind, RepoStatus, Severity};
use crate::snapshot::RepoSnapshot;

/// Health report for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Repository identifier.
    pub repo: String,
    /// Issues in detection order.
    pub issues: Vec<Issue>,
    /// Number of documentation files in the snapshot.
    pub doc_count: usize,
    /// Total line count across documentation files.
    pub total_lines: usize,
    /// Aggregate health score, 0-100.
    pub score: u8,
    /// Derived repository status.
    pub status: RepoStatus,
}

impl Report {
    /// Build a report from a snapshot and its detected issues.
    ///
    /// The score and status are derived from the issues, so a report is
    /// consistent by construction.
    pub fn from_issues(snapshot: &RepoSnapshot, issues: Vec<Issue>) -> Self {
        let score = compute_score(&issues);
        let status = derive_status(&issues);
        Self {
            repo: snapshot.name.clone(),
            doc_count: snapshot.doc_count(),
            total_lines: snapshot.total_doc_lines(),
            issues,
            score,
            status,
        }
    }

    /// Append an issue found by a fleet-level pass and re-derive the
    /// score and status.
    pub(crate) fn push_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
        self.score = compute_score(&self.issues);
        self.status = derive_status(&self.issues);
    }

    /// Whether this report is the single-issue configuration failure case.
    pub fn is_config_error(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.kind == IssueKind::ConfigError)
    }
}

/// Compute the health score for a set of issues.
///
/// Starts at 100, subtracts a per-severity penalty per issue, floors at 0.
/// The fold is order-independent even though issue enumeration order is
/// fixed for display.
pub fn compute_score(issues: &[Issue]) -> u8 {
    let penalty: i64 = issues
        .iter()
        .map(|issue| i64::from(issue.severity.penalty()))
        .sum();
    let score = 100 - penalty;
    score.clamp(0, 100) as u8
}

/// Derive the repository status from its issues.
///
/// Only critical and warning issues affect status; info issues never do.
pub fn derive_status(issues: &[Issue]) -> RepoStatus {
    if issues
        .iter()
        .any(|issue| issue.severity == Severity::Critical)
    {
        return RepoStatus::Broken;
    }
    if issues
        .iter()
        .any(|issue| issue.severity == Severity::Warning)
    {
        return RepoStatus::Degraded;
    }
    RepoStatus::Healthy
}

/// Cross-repo statistics derived after all reports exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    /// Documentation file count per repository.
    pub doc_counts: BTreeMap<String, usize>,
    /// Fleet median doc count, absent when no repository was comparable.
    pub median_doc_count: Option<f64>,
    /// Repositories whose doc count deviates beyond the imbalance ratio.
    pub outliers: Vec<String>,
    /// Total critical issues across the fleet.
    pub critical_issues: usize,
    /// Total warning issues across the fleet.
    pub warning_issues: usize,
    /// Total info issues across the fleet.
    pub info_issues: usize,
}

/// All reports for one run plus the cross-repo statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    /// Per-repository reports, in evaluation order.
    pub reports: Vec<Report>,
    /// Cross-repo statistics.
    pub stats: FleetStats,
}

impl FleetSummary {
    /// Whether any repository in the fleet is broken.
    pub fn has_broken(&self) -> bool {
        self.reports
            .iter()
            .any(|report| report.status == RepoStatus::Broken)
    }
}

/// Render a fleet summary as Markdown.
pub fn render_fleet_markdown(summary: &FleetSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Documentation Health Report\n");
    for report in &summary.reports {
        let _ = writeln!(output, "## {}\n", report.repo);
        let _ = writeln!(output, "- Status: {}", status_label(report.status));
        let _ = writeln!(output, "- Score: {}", report.score);
        let _ = writeln!(
            output,
            "- Docs: {} files, {} lines\n",
            report.doc_count, report.total_lines
        );
        append_issues(&mut output, &report.issues);
        let _ = writeln!(output);
    }
    append_stats(&mut output, &summary.stats);
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

/// Short lowercase label for a repository status.
pub fn status_label(status: RepoStatus) -> &'static str {
    match status {
        RepoStatus::Healthy => "healthy",
        RepoStatus::Degraded => "degraded",
        RepoStatus::Broken => "broken",
    }
}

/// Short lowercase label for an issue severity.
pub fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "critical",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}

/// One-line rendering of an issue.
pub fn format_issue(issue: &Issue) -> String {
    let kind = issue_label(issue.kind);
    match &issue.path {
        Some(path) => format!(
            "[{}] {kind}: {path} ({})",
            severity_label(issue.severity),
            issue.message
        ),
        None => format!(
            "[{}] {kind}: {}",
            severity_label(issue.severity),
            issue.message
        ),
    }
}

fn issue_label(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::Stub => "stub file",
        IssueKind::MissingFile => "missing file",
        IssueKind::BrokenLink => "broken link",
        IssueKind::UnverifiedDomain => "unverified domain",
        IssueKind::Stale => "stale",
        IssueKind::DocCountImbalance => "doc count imbalance",
        IssueKind::AnalysisSkipped => "analysis skipped",
        IssueKind::ConfigError => "config error",
    }
}

fn append_issues(output: &mut String, issues: &[Issue]) {
    if issues.is_empty() {
        let _ = writeln!(output, "### Issues\nNo issues found.\n");
        return;
    }
    let _ = writeln!(output, "### Issues");
    for issue in issues {
        let _ = writeln!(output, "- {}", format_issue(issue));
    }
    let _ = writeln!(output);
}

fn append_stats(output: &mut String, stats: &FleetStats) {
    let _ = writeln!(output, "## Fleet\n");
    let _ = writeln!(
        output,
        "- Totals: {} critical, {} warning, {} info",
        stats.critical_issues, stats.warning_issues, stats.info_issues
    );
    match stats.median_doc_count {
        Some(median) => {
            let _ = writeln!(output, "- Median doc count: {median}");
        }
        None => {
            let _ = writeln!(output, "- Median doc count: n/a");
        }
    }
    if stats.outliers.is_empty() {
        let _ = writeln!(output, "- Doc counts balanced across the fleet");
    } else {
        let _ = writeln!(output, "- Outliers: {}", stats.outliers.join(", "));
    }
}
