#![deny(missing_docs)]
//! DocFleet core library.
//!
//! This crate contains the snapshot types and health checks that power the
//! broader DocFleet tooling.

pub mod check;
pub mod checks;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fs;
pub mod report;
pub mod snapshot;

pub use check::{Check, CheckContext};
pub use checks::build_checks;
pub use config::{FleetConfig, RepoConfig, STANDARD_DOCS, Thresholds, UpstreamState};
pub use domain::{Issue, IssueKind, RepoStatus, Severity};
pub use engine::{HealthEngine, UpstreamMap};
pub use error::{DocFleetError, Result};
pub use fs::{FileSystem, StdFileSystem};
pub use report::{
    FleetStats, FleetSummary, Report, compute_score, derive_status, format_issue,
    render_fleet_markdown, render_json, severity_label, status_label,
};
pub use snapshot::{FileRecord, RepoSnapshot, gather_snapshot, is_doc_file};
