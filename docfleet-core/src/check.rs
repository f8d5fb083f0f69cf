//! Check trait definitions.

use chrono::{DateTime, Utc};

use crate::config::{RepoConfig, Thresholds, UpstreamState};
use crate::domain::Issue;
use crate::error::Result;
use crate::snapshot::RepoSnapshot;

/// Shared inputs every check evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Detection thresholds for the run.
    pub thresholds: &'a Thresholds,
    /// Known upstream state for the repository, when the caller has it.
    pub upstream: Option<&'a UpstreamState>,
    /// The run's reference clock, supplied by the caller.
    pub now: DateTime<Utc>,
}

/// A detector that inspects one repository snapshot.
pub trait Check {
    /// Returns the unique ID of the check (e.g., "stubs").
    fn id(&self) -> &str;
    /// Inspects the snapshot and returns the issues it finds.
    fn run(
        &self,
        snapshot: &RepoSnapshot,
        config: &RepoConfig,
        ctx: &CheckContext<'_>,
    ) -> Result<Vec<Issue>>;
}
