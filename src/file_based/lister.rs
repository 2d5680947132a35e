//! File listing
//!
//! A `FileLister` enumerates the files of a source and reads their content.
//! `LocalFileLister` walks a local directory.

use super::types::RemoteFile;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of files for a file-based stream
#[async_trait]
pub trait FileLister: Send + Sync {
    /// List every file matching the source's configuration
    async fn list_files(&self) -> Result<Vec<RemoteFile>>;

    /// Read a file's content
    async fn read_file(&self, file: &RemoteFile) -> Result<String>;
}

/// Translate a glob (`*`, `**`, `?`) into an anchored regex
pub fn glob_to_regex(glob: &str) -> Result<Regex> {
    let escaped = regex::escape(glob);
    let pattern = escaped
        .replace(r"\*\*/", "(?:.*/)?")
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", "[^/]");
    Ok(Regex::new(&format!("^{pattern}$"))?)
}

/// Lists files below a local directory
#[derive(Debug, Clone)]
pub struct LocalFileLister {
    root: PathBuf,
    pattern: Option<Regex>,
}

impl LocalFileLister {
    /// Create a lister for every file below `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pattern: None,
        }
    }

    /// Only list files whose relative path matches the glob
    pub fn with_glob(mut self, glob: &str) -> Result<Self> {
        self.pattern = Some(glob_to_regex(glob)?);
        Ok(self)
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn matches(&self, uri: &str) -> bool {
        self.pattern.as_ref().map_or(true, |p| p.is_match(uri))
    }

    fn relative_uri(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl FileLister for LocalFileLister {
    async fn list_files(&self) -> Result<Vec<RemoteFile>> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Err(Error::FileNotFound {
                path: self.root.display().to_string(),
            });
        }

        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let Some(uri) = self.relative_uri(&path) else {
                    continue;
                };
                if !self.matches(&uri) {
                    continue;
                }

                // Persisted timestamps carry microseconds
                let modified = DateTime::<Utc>::from(entry.metadata().await?.modified()?);
                files.push(RemoteFile::new(uri, modified.trunc_subsecs(6)));
            }
        }

        files.sort_by(|a, b| (a.last_modified, &a.uri).cmp(&(b.last_modified, &b.uri)));
        debug!(root = %self.root.display(), count = files.len(), "Listed files");
        Ok(files)
    }

    async fn read_file(&self, file: &RemoteFile) -> Result<String> {
        let path = self.root.join(&file.uri);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })
    }
}
