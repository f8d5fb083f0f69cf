#![deny(missing_docs)]
//! DocFleet command-line interface.
//!
//! Audits a fleet of managed documentation repositories and reports their
//! health. Exits nonzero when any repository is broken.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use docfleet_core::{
    FleetConfig, FleetSummary, HealthEngine, RepoSnapshot, StdFileSystem, Thresholds, UpstreamMap,
    format_issue, gather_snapshot, render_fleet_markdown, render_json, status_label,
};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "docfleet", version, about = "DocFleet CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct FleetArgs {
    /// Central fleet configuration file (one record per repository).
    #[arg(short, long, default_value = "repos.json")]
    config: PathBuf,
    /// Directory containing one subdirectory per configured repository.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Restrict the run to a single configured repository.
    #[arg(long)]
    repo: Option<String>,
    /// JSON file with the latest known upstream release per repository.
    #[arg(long)]
    releases: Option<PathBuf>,
    /// Reference time for freshness checks (RFC 3339). Defaults to now.
    #[arg(long)]
    now: Option<String>,
    /// Maximum number of concurrent snapshot reads.
    #[arg(short = 'j', long, default_value_t = 5)]
    concurrency: usize,
}

#[derive(Args, Clone)]
struct ThresholdArgs {
    /// Minimum non-blank lines before a documentation file is a stub.
    #[arg(long)]
    stub_min_lines: Option<usize>,
    /// Maximum crawl age in days before a repository is stale.
    #[arg(long)]
    stale_after_days: Option<i64>,
    /// Allowed deviation from the fleet median doc count, as a ratio.
    #[arg(long)]
    imbalance_ratio: Option<f64>,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit the fleet and report repository health.
    Check {
        #[command(flatten)]
        fleet: FleetArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            fleet,
            thresholds,
            report,
        } => {
            let any_broken = run_check(fleet, thresholds, report).await?;
            if any_broken {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

async fn run_check(
    fleet: FleetArgs,
    thresholds: ThresholdArgs,
    output: OutputArgs,
) -> CliResult<bool> {
    let configs = load_fleet_config(&fleet.config).await?;
    let configs = filter_repos(configs, fleet.repo.as_deref())?;
    if configs.is_empty() {
        println!("No repositories configured.");
        return Ok(false);
    }

    let upstream = match &fleet.releases {
        Some(path) => load_releases(path).await?,
        None => UpstreamMap::new(),
    };
    let now = resolve_now(fleet.now.as_deref())?;

    let snapshots = gather_snapshots(&configs, &fleet.root, fleet.concurrency).await?;

    let engine = HealthEngine::new(resolve_thresholds(&thresholds));
    let summary = engine.evaluate_fleet(&snapshots, &configs, &upstream, now);

    emit_summary(&summary, &output).await?;

    Ok(summary.has_broken())
}

async fn load_fleet_config(path: &Path) -> CliResult<FleetConfig> {
    let contents = tokio::fs::read_to_string(path).await?;
    let configs: FleetConfig = serde_json::from_str(&contents)?;
    Ok(configs)
}

async fn load_releases(path: &Path) -> CliResult<UpstreamMap> {
    let contents = tokio::fs::read_to_string(path).await?;
    let releases: UpstreamMap = serde_json::from_str(&contents)?;
    Ok(releases)
}

fn filter_repos(configs: FleetConfig, repo: Option<&str>) -> CliResult<FleetConfig> {
    let Some(repo) = repo else {
        return Ok(configs);
    };
    let mut filtered = FleetConfig::new();
    match configs.get(repo) {
        Some(config) => {
            filtered.insert(repo.to_string(), config.clone());
            Ok(filtered)
        }
        None => Err(format!("unknown repository: {repo}").into()),
    }
}

fn resolve_now(raw: Option<&str>) -> CliResult<DateTime<Utc>> {
    match raw {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(raw.trim())
                .map_err(|err| format!("invalid --now value: {err}"))?;
            Ok(parsed.with_timezone(&Utc))
        }
        None => Ok(Utc::now()),
    }
}

fn resolve_thresholds(args: &ThresholdArgs) -> Thresholds {
    let mut thresholds = Thresholds::default();
    if let Some(stub_min_lines) = args.stub_min_lines {
        thresholds.stub_min_lines = stub_min_lines;
    }
    if let Some(stale_after_days) = args.stale_after_days {
        thresholds.stale_after_days = stale_after_days;
    }
    if let Some(imbalance_ratio) = args.imbalance_ratio {
        thresholds.imbalance_ratio = imbalance_ratio;
    }
    thresholds
}

async fn gather_snapshots(
    configs: &FleetConfig,
    root: &Path,
    concurrency: usize,
) -> CliResult<Vec<RepoSnapshot>> {
    let concurrency = if concurrency == 0 { 1 } else { concurrency };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for name in configs.keys() {
        let permit = semaphore.clone().acquire_owned().await?;
        let name = name.clone();
        let repo_dir = root.join(&name);
        tasks.spawn(async move {
            let _permit = permit;
            gather_one(name, repo_dir)
        });
    }

    let mut snapshots = Vec::new();
    while let Some(result) = tasks.join_next().await {
        snapshots.push(result?);
    }
    snapshots.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(snapshots)
}

fn gather_one(name: String, repo_dir: PathBuf) -> RepoSnapshot {
    if !repo_dir.is_dir() {
        log::warn!(
            "repository directory not found: {}",
            repo_dir.display()
        );
        return RepoSnapshot::new(name);
    }
    match gather_snapshot(&StdFileSystem::new(), &name, &repo_dir) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            log::warn!("failed to read {}: {err}", repo_dir.display());
            RepoSnapshot::new(name)
        }
    }
}

async fn emit_summary(summary: &FleetSummary, output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_fleet_text(summary),
        OutputFormat::Markdown => render_fleet_markdown(summary),
        OutputFormat::Json => render_json(summary)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_fleet_text(summary: &FleetSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Documentation Health Report");
    let _ = writeln!(output);

    for report in &summary.reports {
        let marker = match report.status {
            docfleet_core::RepoStatus::Healthy => "OK  ",
            docfleet_core::RepoStatus::Degraded => "WARN",
            docfleet_core::RepoStatus::Broken => "FAIL",
        };
        let _ = writeln!(
            output,
            "{marker} {} (score {}, {})",
            report.repo,
            report.score,
            status_label(report.status)
        );
        let _ = writeln!(
            output,
            "     {} docs, {} total lines",
            report.doc_count, report.total_lines
        );
        for issue in &report.issues {
            let _ = writeln!(output, "     - {}", format_issue(issue));
        }
        let _ = writeln!(output);
    }

    let stats = &summary.stats;
    let _ = writeln!(
        output,
        "Summary: {} critical, {} warning, {} info",
        stats.critical_issues, stats.warning_issues, stats.info_issues
    );
    if !stats.outliers.is_empty() {
        let _ = writeln!(
            output,
            "Doc count imbalance: {}",
            stats.outliers.join(", ")
        );
    }

    output
}
