//! Filesystem abstractions used for snapshot gathering.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Abstraction over filesystem access for testability.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// List all files reachable from the root path.
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>>;
    /// Read a file into a string.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Last-modified timestamp of a file, when the platform reports one.
    fn modified(&self, path: &Path) -> Result<Option<DateTime<Utc>>>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a new standard filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if is_hidden(&path) {
                    continue;
                }
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn modified(&self, path: &Path) -> Result<Option<DateTime<Utc>>> {
        let metadata = std::fs::metadata(path)?;
        match metadata.modified() {
            Ok(time) => Ok(Some(DateTime::<Utc>::from(time))),
            Err(_) => Ok(None),
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
