//! Immutable repository snapshots consumed by the health engine.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::fs::FileSystem;

/// One file captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full text content of the file.
    pub content: String,
    /// Total line count of the content.
    pub lines: usize,
    /// Last-modified timestamp, when known.
    pub modified: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Create a record, deriving the line count from the content.
    pub fn new(content: impl Into<String>, modified: Option<DateTime<Utc>>) -> Self {
        let content = content.into();
        let lines = content.lines().count();
        Self {
            content,
            lines,
            modified,
        }
    }
}

/// Read-only view of one repository's file tree at a point in time.
///
/// Paths are repository-relative with `/` separators. The map is ordered so
/// evaluation walks files in a stable order regardless of how the snapshot
/// was gathered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    /// Repository identifier.
    pub name: String,
    /// Relative file path to captured record.
    pub files: BTreeMap<String, FileRecord>,
}

impl RepoSnapshot {
    /// Create an empty snapshot for a repository.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    /// Add a file to the snapshot.
    pub fn insert(&mut self, path: impl Into<String>, record: FileRecord) {
        self.files.insert(path.into(), record);
    }

    /// Whether the snapshot contains the given relative path.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Iterate over the documentation files in path order.
    pub fn doc_files(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.files
            .iter()
            .filter(|(path, _)| is_doc_file(path))
            .map(|(path, record)| (path.as_str(), record))
    }

    /// Number of documentation files in the snapshot.
    pub fn doc_count(&self) -> usize {
        self.doc_files().count()
    }

    /// Total line count across documentation files.
    pub fn total_doc_lines(&self) -> usize {
        self.doc_files().map(|(_, record)| record.lines).sum()
    }
}

/// Whether a relative path names a documentation file.
pub fn is_doc_file(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    matches!(ext.as_str(), "md" | "mdx" | "rst" | "adoc")
}

/// Build a snapshot of a repository directory.
///
/// Files that cannot be read as text are skipped; the snapshot reflects what
/// was readable. A missing modification timestamp is recorded as `None`.
pub fn gather_snapshot<F: FileSystem>(fs: &F, name: &str, root: &Path) -> Result<RepoSnapshot> {
    let mut snapshot = RepoSnapshot::new(name);

    for path in fs.list_files(root)? {
        let Some(relative) = relative_path(root, &path) else {
            continue;
        };
        let Ok(content) = fs.read_to_string(&path) else {
            continue;
        };
        let modified = fs.modified(&path).unwrap_or(None);
        snapshot.insert(relative, FileRecord::new(content, modified));
    }

    Ok(snapshot)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<&str> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()?;
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
