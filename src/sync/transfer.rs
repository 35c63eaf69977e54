use crate::error::{Result, SyncError};
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Handling of entries that block a copy target: a symlink or file where a
/// parent directory should be, or a directory where the file should land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Obstruction {
    /// Remove the blocking entry
    Replace,
    /// Fail with a `CopyError` and leave it in place
    Fail,
}

/// Filesystem effects for classified paths.
///
/// Every operation is idempotent with respect to the final state of the
/// tree; none of them is transactional across files.
#[derive(Debug, Default, Clone, Copy)]
pub struct Propagator;

impl Propagator {
    pub fn new() -> Self {
        Self
    }

    /// Copy `from` over `to`, creating missing parents of `to`.
    ///
    /// Data is staged in a temp file beside `to` and renamed into place, so
    /// an interrupted copy never leaves a truncated `to`. The source mtime is
    /// carried over so the next snapshot sees both sides as identical.
    pub fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        let copy_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| SyncError::CopyError { path, source }
        };

        let parent = match to.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        self.make_dir(parent)?;

        let source_meta = fs::metadata(from).map_err(copy_err(from))?;
        let mut reader = fs::File::open(from).map_err(copy_err(from))?;

        let mut staged = NamedTempFile::new_in(parent).map_err(copy_err(to))?;
        let bytes_written = io::copy(&mut reader, staged.as_file_mut()).map_err(copy_err(to))?;
        staged.as_file().sync_all().map_err(copy_err(to))?;
        // Temp files are created 0600
        fs::set_permissions(staged.path(), source_meta.permissions()).map_err(copy_err(to))?;

        staged
            .persist(to)
            .map_err(|e| SyncError::CopyError {
                path: to.to_path_buf(),
                source: e.error,
            })?;

        let mtime = source_meta.modified().map_err(copy_err(from))?;
        filetime::set_file_mtime(to, FileTime::from_system_time(mtime)).map_err(copy_err(to))?;

        tracing::debug!(
            "Copied: {} -> {} ({} bytes)",
            from.display(),
            to.display(),
            bytes_written
        );
        Ok(bytes_written)
    }

    /// Make `relative_path` under `root` writable as a plain file.
    ///
    /// Parents are only ever created as real directories inside `root`: a
    /// symlinked parent would send the copy outside the tree, where the next
    /// snapshot never sees it.
    pub fn clear_target(&self, root: &Path, relative_path: &str, obstruction: Obstruction) -> Result<()> {
        let parts: Vec<&str> = relative_path.split('/').filter(|p| !p.is_empty()).collect();
        let Some((name, parents)) = parts.split_last() else {
            return Ok(());
        };

        let mut current = root.to_path_buf();
        for part in parents {
            current.push(part);
            match entry_kind(&current)? {
                None => return Ok(()),
                Some(meta) if meta.is_dir() => {}
                Some(meta) => return self.clear(&current, &meta, obstruction, "not a directory"),
            }
        }

        current.push(name);
        match entry_kind(&current)? {
            Some(meta) if meta.is_dir() => self.clear(&current, &meta, obstruction, "is a directory"),
            _ => Ok(()),
        }
    }

    fn clear(&self, path: &Path, meta: &fs::Metadata, obstruction: Obstruction, reason: &str) -> Result<()> {
        if obstruction == Obstruction::Fail {
            return Err(SyncError::CopyError {
                path: path.to_path_buf(),
                source: io::Error::other(format!("blocked: {}", reason)),
            });
        }

        let removed = if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        removed.map_err(|e| SyncError::RemoveError {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!("Cleared {} ({})", path.display(), reason);
        Ok(())
    }

    /// Delete the file at `path`; a missing file is not an error
    pub fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!("Removed: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::RemoveError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Create `path` and any missing ancestors
    pub fn make_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| SyncError::CreateDirError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// `lstat` of `path`; `None` when nothing is there
fn entry_kind(path: &Path) -> Result<Option<fs::Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::CopyError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
