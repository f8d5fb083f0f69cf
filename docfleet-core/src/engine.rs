//! Fleet evaluation: per-repo checks plus the cross-repo balance pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::check::{Check, CheckContext};
use crate::checks::build_checks;
use crate::config::{FleetConfig, RepoConfig, Thresholds, UpstreamState};
use crate::domain::{Issue, IssueKind, Severity};
use crate::report::{FleetStats, FleetSummary, Report};
use crate::snapshot::RepoSnapshot;

/// Known upstream state per repository, keyed by repo name.
pub type UpstreamMap = BTreeMap<String, UpstreamState>;

/// Evaluates repository snapshots into health reports.
///
/// Evaluation is pure: the engine reads wall-clock time from the caller and
/// never mutates a snapshot, so re-running over identical inputs yields an
/// identical summary, issue order included.
pub struct HealthEngine {
    thresholds: Thresholds,
    checks: Vec<Arc<dyn Check + Send + Sync>>,
}

impl HealthEngine {
    /// Create an engine with the built-in checks.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            checks: build_checks(),
        }
    }

    /// Create an engine with a custom check set.
    pub fn with_checks(thresholds: Thresholds, checks: Vec<Arc<dyn Check + Send + Sync>>) -> Self {
        Self { thresholds, checks }
    }

    /// Evaluate one repository against its declared configuration.
    ///
    /// A missing or invalid configuration yields a report with a single
    /// critical configuration issue; it never aborts the run. A failing
    /// check degrades to an informational skip issue.
    pub fn evaluate_repo(
        &self,
        snapshot: &RepoSnapshot,
        config: Option<&RepoConfig>,
        upstream: Option<&UpstreamState>,
        now: DateTime<Utc>,
    ) -> Report {
        let Some(config) = config else {
            return config_error_report(snapshot, "no configuration record for repository");
        };
        if let Err(reason) = config.validate() {
            return config_error_report(snapshot, &format!("invalid configuration: {reason}"));
        }

        let ctx = CheckContext {
            thresholds: &self.thresholds,
            upstream,
            now,
        };

        let mut issues = Vec::new();
        for check in &self.checks {
            match check.run(snapshot, config, &ctx) {
                Ok(mut found) => issues.append(&mut found),
                Err(err) => issues.push(Issue::for_repo(
                    IssueKind::AnalysisSkipped,
                    Severity::Info,
                    &snapshot.name,
                    format!("check {} skipped: {err}", check.id()),
                )),
            }
        }

        Report::from_issues(snapshot, issues)
    }

    /// Evaluate every snapshot, then run the fleet-relative balance pass.
    pub fn evaluate_fleet(
        &self,
        snapshots: &[RepoSnapshot],
        configs: &FleetConfig,
        upstream: &UpstreamMap,
        now: DateTime<Utc>,
    ) -> FleetSummary {
        let mut reports: Vec<Report> = snapshots
            .iter()
            .map(|snapshot| {
                self.evaluate_repo(
                    snapshot,
                    configs.get(&snapshot.name),
                    upstream.get(&snapshot.name),
                    now,
                )
            })
            .collect();

        let (median, outliers) =
            apply_balance_pass(&mut reports, self.thresholds.imbalance_ratio);
        let stats = fleet_stats(&reports, median, outliers);

        FleetSummary { reports, stats }
    }
}

fn config_error_report(snapshot: &RepoSnapshot, message: &str) -> Report {
    Report::from_issues(
        snapshot,
        vec![Issue::for_repo(
            IssueKind::ConfigError,
            Severity::Critical,
            &snapshot.name,
            message,
        )],
    )
}

/// Flag repositories whose doc count deviates from the fleet median by more
/// than the configured ratio. Configuration-failure reports are excluded so
/// their single-issue contract holds.
fn apply_balance_pass(reports: &mut [Report], ratio: f64) -> (Option<f64>, Vec<String>) {
    let counts: Vec<usize> = reports
        .iter()
        .filter(|report| !report.is_config_error())
        .map(|report| report.doc_count)
        .collect();
    let Some(median) = median(&counts) else {
        return (None, Vec::new());
    };

    let mut outliers = Vec::new();
    for report in reports.iter_mut() {
        if report.is_config_error() {
            continue;
        }
        let deviation = (report.doc_count as f64 - median).abs();
        if deviation > ratio * median {
            let issue = Issue::for_repo(
                IssueKind::DocCountImbalance,
                Severity::Info,
                report.repo.clone(),
                format!("{} docs vs fleet median {median}", report.doc_count),
            );
            report.push_issue(issue);
            outliers.push(report.repo.clone());
        }
    }

    (Some(median), outliers)
}

fn median(counts: &[usize]) -> Option<f64> {
    if counts.is_empty() {
        return None;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid] as f64)
    } else {
        Some((sorted[mid - 1] + sorted[mid]) as f64 / 2.0)
    }
}

fn fleet_stats(reports: &[Report], median: Option<f64>, outliers: Vec<String>) -> FleetStats {
    let mut doc_counts = BTreeMap::new();
    let mut critical = 0usize;
    let mut warning = 0usize;
    let mut info = 0usize;

    for report in reports {
        doc_counts.insert(report.repo.clone(), report.doc_count);
        for issue in &report.issues {
            match issue.severity {
                Severity::Critical => critical += 1,
                Severity::Warning => warning += 1,
                Severity::Info => info += 1,
            }
        }
    }

    FleetStats {
        doc_counts,
        median_doc_count: median,
        outliers,
        critical_issues: critical,
        warning_issues: warning,
        info_issues: info,
    }
}

#[cfg(test)]
mod tests {
    use super::{HealthEngine, UpstreamMap, median};
    use crate::check::{Check, CheckContext};
    use crate::config::{FleetConfig, RepoConfig, Thresholds};
    use crate::domain::{Issue, IssueKind, RepoStatus, Severity};
    use crate::error::{DocFleetError, Result};
    use crate::snapshot::{FileRecord, RepoSnapshot};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap()
    }

    fn complete_doc() -> String {
        (0..20).map(|i| format!("line {i}\n")).collect()
    }

    fn healthy_snapshot(name: &str) -> RepoSnapshot {
        let mut snapshot = RepoSnapshot::new(name);
        for doc in crate::config::STANDARD_DOCS {
            snapshot.insert(*doc, FileRecord::new(complete_doc(), None));
        }
        snapshot
    }

    fn snapshot_with_docs(name: &str, count: usize) -> RepoSnapshot {
        let mut snapshot = RepoSnapshot::new(name);
        for index in 0..count {
            snapshot.insert(
                format!("docs/page-{index:02}.md"),
                FileRecord::new(complete_doc(), None),
            );
        }
        snapshot
    }

    fn permissive_config() -> RepoConfig {
        RepoConfig {
            expected_docs: vec!["docs/page-00.md".to_string()],
            ..RepoConfig::default()
        }
    }

    #[test]
    fn clean_repo_is_healthy_with_full_score() {
        let engine = HealthEngine::new(Thresholds::default());
        let snapshot = healthy_snapshot("GeminiDocs");
        let report =
            engine.evaluate_repo(&snapshot, Some(&RepoConfig::default()), None, fixed_now());

        assert_eq!(report.status, RepoStatus::Healthy);
        assert_eq!(report.score, 100);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn missing_config_produces_single_critical_issue() {
        let engine = HealthEngine::new(Thresholds::default());
        let snapshot = healthy_snapshot("Orphan");
        let report = engine.evaluate_repo(&snapshot, None, None, fixed_now());

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::ConfigError);
        assert_eq!(report.status, RepoStatus::Broken);
        assert_eq!(report.score, 80);
    }

    #[test]
    fn invalid_config_produces_single_critical_issue() {
        let engine = HealthEngine::new(Thresholds::default());
        let snapshot = healthy_snapshot("Empty");
        let config = RepoConfig {
            expected_docs: Vec::new(),
            ..RepoConfig::default()
        };
        let report = engine.evaluate_repo(&snapshot, Some(&config), None, fixed_now());

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::ConfigError);
        assert!(report.issues[0].message.contains("expected document list"));
    }

    #[test]
    fn missing_standard_doc_breaks_repo() {
        let engine = HealthEngine::new(Thresholds::default());
        let mut snapshot = healthy_snapshot("GeminiDocs");
        snapshot.files.remove("docs/official-links.md");

        let report =
            engine.evaluate_repo(&snapshot, Some(&RepoConfig::default()), None, fixed_now());

        assert_eq!(report.status, RepoStatus::Broken);
        assert!(report.issues.iter().any(|issue| {
            issue.kind == IssueKind::MissingFile
                && issue.path.as_deref() == Some("docs/official-links.md")
        }));
    }

    #[test]
    fn issues_follow_fixed_check_order() {
        let engine = HealthEngine::new(Thresholds::default());
        let mut snapshot = healthy_snapshot("GeminiDocs");
        snapshot.files.remove("docs/official-links.md");
        snapshot.insert(
            "docs/thin.md",
            FileRecord::new("short\n[x](./gone.md)\n", None),
        );
        let config = RepoConfig {
            last_crawl: Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()),
            ..RepoConfig::default()
        };

        let report = engine.evaluate_repo(&snapshot, Some(&config), None, fixed_now());

        let kinds: Vec<IssueKind> = report.issues.iter().map(|issue| issue.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::Stub,
                IssueKind::MissingFile,
                IssueKind::BrokenLink,
                IssueKind::Stale,
            ]
        );
    }

    #[test]
    fn evaluation_is_deterministic_and_does_not_mutate_snapshots() {
        let engine = HealthEngine::new(Thresholds::default());
        let mut snapshot = healthy_snapshot("GeminiDocs");
        snapshot.insert("docs/thin.md", FileRecord::new("short\n", None));
        let before = snapshot.clone();
        let config = RepoConfig::default();

        let first = engine.evaluate_repo(&snapshot, Some(&config), None, fixed_now());
        let second = engine.evaluate_repo(&snapshot, Some(&config), None, fixed_now());

        assert_eq!(first, second);
        assert_eq!(snapshot, before);
    }

    #[test]
    fn failing_check_degrades_to_skip_issue() {
        struct FailingCheck;
        impl Check for FailingCheck {
            fn id(&self) -> &str {
                "fails"
            }
            fn run(
                &self,
                _snapshot: &RepoSnapshot,
                _config: &RepoConfig,
                _ctx: &CheckContext<'_>,
            ) -> Result<Vec<Issue>> {
                Err(DocFleetError::Other("boom".to_string()))
            }
        }

        let engine =
            HealthEngine::with_checks(Thresholds::default(), vec![Arc::new(FailingCheck)]);
        let snapshot = healthy_snapshot("GeminiDocs");
        let report =
            engine.evaluate_repo(&snapshot, Some(&RepoConfig::default()), None, fixed_now());

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::AnalysisSkipped);
        assert_eq!(report.issues[0].severity, Severity::Info);
        assert_eq!(report.status, RepoStatus::Healthy);
        assert_eq!(report.score, 99);
    }

    #[test]
    fn balance_pass_flags_doc_count_outliers() {
        let engine = HealthEngine::new(Thresholds::default());
        let snapshots = vec![
            snapshot_with_docs("A", 10),
            snapshot_with_docs("B", 11),
            snapshot_with_docs("C", 2),
        ];
        let mut configs = FleetConfig::new();
        for name in ["A", "B", "C"] {
            configs.insert(name.to_string(), permissive_config());
        }

        let summary =
            engine.evaluate_fleet(&snapshots, &configs, &UpstreamMap::new(), fixed_now());

        let outlier = summary
            .reports
            .iter()
            .find(|report| report.repo == "C")
            .expect("report for C");
        assert!(outlier
            .issues
            .iter()
            .any(|issue| issue.kind == IssueKind::DocCountImbalance));

        for name in ["A", "B"] {
            let report = summary
                .reports
                .iter()
                .find(|report| report.repo == name)
                .expect("report");
            assert!(report
                .issues
                .iter()
                .all(|issue| issue.kind != IssueKind::DocCountImbalance));
        }

        assert_eq!(summary.stats.median_doc_count, Some(10.0));
        assert_eq!(summary.stats.outliers, vec!["C".to_string()]);
    }

    #[test]
    fn balance_pass_excludes_config_error_reports() {
        let engine = HealthEngine::new(Thresholds::default());
        let snapshots = vec![
            snapshot_with_docs("A", 10),
            snapshot_with_docs("B", 10),
            snapshot_with_docs("Orphan", 0),
        ];
        let mut configs = FleetConfig::new();
        configs.insert("A".to_string(), permissive_config());
        configs.insert("B".to_string(), permissive_config());

        let summary =
            engine.evaluate_fleet(&snapshots, &configs, &UpstreamMap::new(), fixed_now());

        let orphan = summary
            .reports
            .iter()
            .find(|report| report.repo == "Orphan")
            .expect("orphan report");
        assert_eq!(orphan.issues.len(), 1);
        assert_eq!(orphan.issues[0].kind, IssueKind::ConfigError);
        assert_eq!(summary.stats.median_doc_count, Some(10.0));
    }

    #[test]
    fn fleet_summary_counts_issue_totals() {
        let engine = HealthEngine::new(Thresholds::default());
        let mut snapshot = healthy_snapshot("GeminiDocs");
        snapshot.files.remove("docs/changelog.md");
        snapshot.insert("docs/thin.md", FileRecord::new("short\n", None));

        let mut configs = FleetConfig::new();
        configs.insert("GeminiDocs".to_string(), RepoConfig::default());

        let summary =
            engine.evaluate_fleet(&[snapshot], &configs, &UpstreamMap::new(), fixed_now());

        assert_eq!(summary.stats.critical_issues, 1);
        assert_eq!(summary.stats.warning_issues, 1);
        assert!(summary.has_broken());
    }

    #[test]
    fn fleet_run_always_returns_a_report_per_snapshot() {
        let engine = HealthEngine::new(Thresholds::default());
        let snapshots = vec![snapshot_with_docs("A", 1), snapshot_with_docs("B", 1)];
        let configs = FleetConfig::new();

        let summary =
            engine.evaluate_fleet(&snapshots, &configs, &UpstreamMap::new(), fixed_now());

        assert_eq!(summary.reports.len(), 2);
        assert!(summary.reports.iter().all(|report| report.is_config_error()));
    }

    #[test]
    fn median_handles_odd_even_and_empty() {
        assert_eq!(median(&[2, 10, 11]), Some(10.0));
        assert_eq!(median(&[2, 10]), Some(6.0));
        assert_eq!(median(&[]), None);
    }
}
