use super::checksum;
use crate::error::{Result, SyncError};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// One regular file discovered under a sync root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Root-relative path with `/` separators
    pub relative_path: String,
    pub size: u64,
    pub modified: SystemTime,
    /// BLAKE3 hex digest, only filled in by checksum comparison
    pub content_hash: Option<String>,
}

/// Point-in-time view of every regular file under a root
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    root: PathBuf,
    files: HashMap<String, FileRecord>,
}

impl DirectorySnapshot {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.files.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains_key(relative_path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    /// Absolute path of a snapshot key on disk
    pub fn absolute(&self, relative_path: &str) -> PathBuf {
        join_relative(&self.root, relative_path)
    }

    /// Content hash for a path, computed on first use and cached in the record.
    /// Returns `None` if the path is not part of the snapshot.
    pub fn content_hash(&mut self, relative_path: &str) -> Result<Option<&str>> {
        let path = self.absolute(relative_path);
        let Some(record) = self.files.get_mut(relative_path) else {
            return Ok(None);
        };

        if record.content_hash.is_none() {
            record.content_hash = Some(checksum::hash_file(&path)?);
        }

        Ok(record.content_hash.as_deref())
    }
}

pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk the root and record size + mtime of every regular file.
    ///
    /// The first unreadable entry aborts the scan; a failed scan means the
    /// state of the tree is unknown, never that it is empty.
    pub fn scan(&self) -> Result<DirectorySnapshot> {
        let root_meta = fs::metadata(&self.root).map_err(|e| SyncError::ReadDirError {
            path: self.root.clone(),
            source: e,
        })?;
        if !root_meta.is_dir() {
            return Err(SyncError::InvalidRoot {
                path: self.root.clone(),
            });
        }

        let mut files = HashMap::new();

        let walker = WalkDir::new(&self.root).follow_links(false);

        for result in walker {
            let entry = result.map_err(|e| walk_error(&self.root, e))?;

            // Symlinks, directories and special files are not part of a snapshot
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| walk_error(&self.root, e))?;
            let modified = metadata.modified().map_err(|e| SyncError::ReadDirError {
                path: path.to_path_buf(),
                source: e,
            })?;

            let relative = path
                .strip_prefix(&self.root)
                .map_err(|_| SyncError::InvalidPath {
                    path: path.to_path_buf(),
                })?;
            let relative_path = normalize(relative)?;

            tracing::trace!("Scanned {} ({} bytes)", relative_path, metadata.len());

            files.insert(
                relative_path.clone(),
                FileRecord {
                    relative_path,
                    size: metadata.len(),
                    modified,
                    content_hash: None,
                },
            );
        }

        tracing::debug!("Scanned {}: {} files", self.root.display(), files.len());

        Ok(DirectorySnapshot {
            root: self.root.clone(),
            files,
        })
    }
}

/// Snapshot a directory tree
pub fn collect(root: &Path) -> Result<DirectorySnapshot> {
    Scanner::new(root).scan()
}

/// Join a `/`-separated snapshot key onto a root
pub fn join_relative(root: &Path, relative_path: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in relative_path.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}

fn normalize(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| SyncError::InvalidPath {
                    path: relative.to_path_buf(),
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(SyncError::InvalidPath {
                    path: relative.to_path_buf(),
                })
            }
        }
    }
    Ok(parts.join("/"))
}

fn walk_error(root: &Path, err: walkdir::Error) -> SyncError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    SyncError::ReadDirError { path, source }
}
