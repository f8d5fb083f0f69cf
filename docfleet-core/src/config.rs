//! Per-repository configuration records and tunable thresholds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard documents every managed repository is expected to carry.
pub const STANDARD_DOCS: &[&str] = &[
    "docs/getting-started.md",
    "docs/features.md",
    "docs/commands.md",
    "docs/changelog.md",
    "docs/official-links.md",
];

/// Central fleet configuration: one record per managed repository.
pub type FleetConfig = BTreeMap<String, RepoConfig>;

/// Declared metadata for one managed repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Expected standard document paths, repository-relative.
    #[serde(default = "default_expected_docs")]
    pub expected_docs: Vec<String>,
    /// Hostnames considered official for external links.
    #[serde(default)]
    pub official_domains: Vec<String>,
    /// Upstream version string recorded at the last crawl.
    #[serde(default)]
    pub recorded_version: Option<String>,
    /// When the upstream documentation was last crawled.
    #[serde(default)]
    pub last_crawl: Option<DateTime<Utc>>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            expected_docs: default_expected_docs(),
            official_domains: Vec::new(),
            recorded_version: None,
            last_crawl: None,
        }
    }
}

impl RepoConfig {
    /// Check the fatal precondition for evaluating a repository.
    pub fn validate(&self) -> Result<(), String> {
        if self.expected_docs.is_empty() {
            return Err("expected document list is empty".to_string());
        }
        Ok(())
    }
}

fn default_expected_docs() -> Vec<String> {
    STANDARD_DOCS.iter().map(|doc| doc.to_string()).collect()
}

/// Tunable detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum non-blank line count before a documentation file is a stub.
    pub stub_min_lines: usize,
    /// Maximum crawl age in days before a repository is stale.
    pub stale_after_days: i64,
    /// Allowed deviation from the fleet median doc count, as a ratio.
    pub imbalance_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stub_min_lines: 15,
            stale_after_days: 14,
            imbalance_ratio: 0.5,
        }
    }
}

/// Caller-supplied knowledge of a repository's upstream project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpstreamState {
    /// Current known upstream version string.
    #[serde(default)]
    pub version: Option<String>,
    /// Timestamp of the newest known upstream release.
    #[serde(default)]
    pub released_at: Option<DateTime<Utc>>,
}
