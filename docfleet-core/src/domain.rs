//! Domain entities for DocFleet findings.

use serde::{Deserialize, Serialize};

/// How badly a finding affects a repository.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational finding; never changes the repository status.
    Info,
    /// Quality problem worth fixing; degrades the repository.
    Warning,
    /// Structural problem that blocks automated maintenance.
    Critical,
}

impl Severity {
    /// Score penalty applied per issue of this severity.
    pub fn penalty(self) -> u32 {
        match self {
            Self::Critical => 20,
            Self::Warning => 5,
            Self::Info => 1,
        }
    }
}

/// The category of a detected problem.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A documentation file too short or placeholder-only to be complete.
    Stub,
    /// An expected standard document is absent from the repository.
    MissingFile,
    /// A relative link points at a file that does not exist.
    BrokenLink,
    /// An external link points outside the declared official domains.
    UnverifiedDomain,
    /// The recorded crawl or version lags the known upstream state.
    Stale,
    /// The repository's doc count deviates sharply from the fleet median.
    DocCountImbalance,
    /// A check could not run against a file and was skipped.
    AnalysisSkipped,
    /// The repository's declared configuration is missing or invalid.
    ConfigError,
}

/// One detected problem in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Category of the problem.
    pub kind: IssueKind,
    /// How badly the problem affects the repository.
    pub severity: Severity,
    /// File the problem concerns, when it concerns one.
    pub path: Option<String>,
    /// Human-readable detail.
    pub message: String,
    /// Name of the repository the issue belongs to.
    pub repo: String,
}

impl Issue {
    /// Create an issue tied to a specific file.
    pub fn for_path(
        kind: IssueKind,
        severity: Severity,
        repo: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            path: Some(path.into()),
            message: message.into(),
            repo: repo.into(),
        }
    }

    /// Create a repository-level issue with no associated file.
    pub fn for_repo(
        kind: IssueKind,
        severity: Severity,
        repo: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            path: None,
            message: message.into(),
            repo: repo.into(),
        }
    }
}

/// Derived health of a repository.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    /// No critical or warning issues.
    Healthy,
    /// At least one warning and no critical issues.
    Degraded,
    /// At least one critical issue.
    Broken,
}
