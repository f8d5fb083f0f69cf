//! Check registry and the built-in detectors.

use std::sync::Arc;

use chrono::Duration;

use crate::check::{Check, CheckContext};
use crate::config::RepoConfig;
use crate::domain::{Issue, IssueKind, Severity};
use crate::error::Result;
use crate::snapshot::RepoSnapshot;

/// Placeholder tokens that mark a documentation file as unfinished.
const STUB_MARKERS: &[&str] = &["pending", "todo", "placeholder", "stub", "coming soon", "tbd"];

/// Build the per-repository checks in their fixed evaluation order.
pub fn build_checks() -> Vec<Arc<dyn Check + Send + Sync>> {
    vec![
        Arc::new(StubCheck),
        Arc::new(MissingDocCheck),
        Arc::new(LinkCheck),
        Arc::new(FreshnessCheck),
    ]
}

/// Flags documentation files that are too short or placeholder-only.
struct StubCheck;

impl Check for StubCheck {
    fn id(&self) -> &str {
        "stubs"
    }

    fn run(
        &self,
        snapshot: &RepoSnapshot,
        _config: &RepoConfig,
        ctx: &CheckContext<'_>,
    ) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for (path, record) in snapshot.doc_files() {
            let non_blank = non_blank_lines(&record.content);
            if non_blank == 0 || non_blank < ctx.thresholds.stub_min_lines {
                issues.push(Issue::for_path(
                    IssueKind::Stub,
                    Severity::Warning,
                    &snapshot.name,
                    path,
                    format!("{non_blank} non-blank lines"),
                ));
                continue;
            }
            if let Some(marker) = first_stub_marker(&record.content) {
                issues.push(Issue::for_path(
                    IssueKind::Stub,
                    Severity::Warning,
                    &snapshot.name,
                    path,
                    format!("placeholder marker '{marker}'"),
                ));
            }
        }
        Ok(issues)
    }
}

/// Flags expected standard documents that are absent from the snapshot.
struct MissingDocCheck;

impl Check for MissingDocCheck {
    fn id(&self) -> &str {
        "missing-docs"
    }

    fn run(
        &self,
        snapshot: &RepoSnapshot,
        config: &RepoConfig,
        _ctx: &CheckContext<'_>,
    ) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for expected in &config.expected_docs {
            if !snapshot.contains(expected) {
                issues.push(Issue::for_path(
                    IssueKind::MissingFile,
                    Severity::Critical,
                    &snapshot.name,
                    expected.as_str(),
                    "expected standard document is missing",
                ));
            }
        }
        Ok(issues)
    }
}

/// Validates relative links against the snapshot and external links against
/// the declared official domains. No network access.
struct LinkCheck;

impl Check for LinkCheck {
    fn id(&self) -> &str {
        "links"
    }

    fn run(
        &self,
        snapshot: &RepoSnapshot,
        config: &RepoConfig,
        _ctx: &CheckContext<'_>,
    ) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for (path, record) in snapshot.doc_files() {
            for target in extract_links(&record.content) {
                match classify_link(&target) {
                    LinkTarget::Anchor | LinkTarget::OtherScheme => {}
                    LinkTarget::External => match hostname(&target) {
                        Some(host) => {
                            if !config.official_domains.is_empty()
                                && !config
                                    .official_domains
                                    .iter()
                                    .any(|domain| domain.eq_ignore_ascii_case(&host))
                            {
                                issues.push(Issue::for_path(
                                    IssueKind::UnverifiedDomain,
                                    Severity::Warning,
                                    &snapshot.name,
                                    path,
                                    format!("{host} is not an official domain ({target})"),
                                ));
                            }
                        }
                        None => {
                            issues.push(Issue::for_path(
                                IssueKind::AnalysisSkipped,
                                Severity::Info,
                                &snapshot.name,
                                path,
                                format!("could not extract hostname from {target}"),
                            ));
                        }
                    },
                    LinkTarget::Relative => {
                        let resolved = resolve_relative(path, &target);
                        let exists = resolved
                            .as_deref()
                            .map(|resolved| snapshot.contains(resolved))
                            .unwrap_or(false);
                        if !exists {
                            issues.push(Issue::for_path(
                                IssueKind::BrokenLink,
                                Severity::Critical,
                                &snapshot.name,
                                path,
                                target.clone(),
                            ));
                        }
                    }
                }
            }
        }
        Ok(issues)
    }
}

/// Compares recorded crawl state against the caller-supplied upstream state.
struct FreshnessCheck;

impl Check for FreshnessCheck {
    fn id(&self) -> &str {
        "freshness"
    }

    fn run(
        &self,
        snapshot: &RepoSnapshot,
        config: &RepoConfig,
        ctx: &CheckContext<'_>,
    ) -> Result<Vec<Issue>> {
        let window = Duration::days(ctx.thresholds.stale_after_days);

        let reason = crawl_age_reason(config, ctx, window)
            .or_else(|| version_mismatch_reason(config, ctx))
            .or_else(|| release_gap_reason(config, ctx));

        Ok(reason
            .map(|reason| {
                vec![Issue::for_repo(
                    IssueKind::Stale,
                    Severity::Warning,
                    &snapshot.name,
                    reason,
                )]
            })
            .unwrap_or_default())
    }
}

fn crawl_age_reason(
    config: &RepoConfig,
    ctx: &CheckContext<'_>,
    window: Duration,
) -> Option<String> {
    let last_crawl = config.last_crawl?;
    let age = ctx.now.signed_duration_since(last_crawl);
    if age > window {
        Some(format!(
            "last crawl is {} days old (window {} days)",
            age.num_days(),
            window.num_days()
        ))
    } else {
        None
    }
}

fn version_mismatch_reason(config: &RepoConfig, ctx: &CheckContext<'_>) -> Option<String> {
    let recorded = config.recorded_version.as_deref()?;
    let current = ctx.upstream?.version.as_deref()?;
    if recorded != current {
        Some(format!(
            "recorded version {recorded} differs from upstream {current}"
        ))
    } else {
        None
    }
}

fn release_gap_reason(config: &RepoConfig, ctx: &CheckContext<'_>) -> Option<String> {
    let last_crawl = config.last_crawl?;
    let released_at = ctx.upstream?.released_at?;
    if released_at > last_crawl {
        Some(format!(
            "upstream release at {} post-dates last crawl",
            released_at.to_rfc3339()
        ))
    } else {
        None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LinkTarget {
    Relative,
    External,
    Anchor,
    OtherScheme,
}

fn classify_link(target: &str) -> LinkTarget {
    if target.starts_with('#') {
        return LinkTarget::Anchor;
    }
    if target.starts_with("http://") || target.starts_with("https://") {
        return LinkTarget::External;
    }
    if has_scheme(target) {
        return LinkTarget::OtherScheme;
    }
    LinkTarget::Relative
}

fn has_scheme(target: &str) -> bool {
    let Some(colon) = target.find(':') else {
        return false;
    };
    if let Some(slash) = target.find('/') {
        if slash < colon {
            return false;
        }
    }
    target[..colon]
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '+' || ch == '-' || ch == '.')
        && colon > 0
}

/// Extract Markdown inline-link targets in textual appearance order.
///
/// Fenced code blocks and image links are skipped. This is a lightweight
/// scanner, not a CommonMark parser; exotic syntax may be missed.
fn extract_links(body: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        extract_link_targets_from_line(line, &mut links);
    }

    links
}

fn extract_link_targets_from_line(line: &str, out: &mut Vec<String>) {
    let bytes = line.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'[' || (i > 0 && bytes[i - 1] == b'!') {
            i += 1;
            continue;
        }

        let Some(label_end) = find_byte(bytes, b']', i + 1) else {
            break;
        };
        if bytes.get(label_end + 1) != Some(&b'(') {
            i = label_end + 1;
            continue;
        }
        let Some(target_end) = find_byte(bytes, b')', label_end + 2) else {
            break;
        };

        let raw_target = &line[label_end + 2..target_end];
        let mut target = raw_target.trim().to_string();
        if target.contains(' ') && !target.starts_with('<') {
            if let Some((before, _)) = target.split_once(' ') {
                target = before.to_string();
            }
        }
        if target.starts_with('<') && target.ends_with('>') && target.len() >= 2 {
            target = target[1..target.len() - 1].to_string();
        }
        if !target.is_empty() {
            out.push(target);
        }
        i = target_end + 1;
    }
}

fn find_byte(bytes: &[u8], target: u8, start: usize) -> Option<usize> {
    bytes[start..]
        .iter()
        .position(|b| *b == target)
        .map(|offset| start + offset)
}

/// Resolve a relative link target against its source file's directory.
///
/// Anchors are stripped before resolution. Returns `None` when the target
/// walks out of the repository root.
fn resolve_relative(source: &str, target: &str) -> Option<String> {
    let target = target.split('#').next().unwrap_or_default();
    if target.is_empty() {
        return None;
    }

    let mut segments: Vec<&str> = source.split('/').collect();
    segments.pop();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

fn hostname(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

fn non_blank_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

fn first_stub_marker(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    STUB_MARKERS
        .iter()
        .copied()
        .find(|marker| lowered.contains(marker))
}
