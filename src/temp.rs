//! Temporary file management module
//!
//! This module provides RAII-based temporary file handling with automatic cleanup.
//! Thumbnails are written through a temporary sibling file and moved into place,
//! so a concurrent reader never observes a partially written image.

use std::fs::{self, File};
use std::io::{self, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Guard for temporary resources that automatically cleans up on drop
#[derive(Debug)]
pub(crate) enum TempGuard {
    /// Temporary file that will be deleted when dropped
    File(PathBuf),
    /// Temporary directory that will be deleted recursively when dropped
    #[cfg(test)]
    Directory(PathBuf),
}

impl TempGuard {
    /// Get the path to the temporary resource
    pub(crate) fn path(&self) -> &Path {
        match self {
            TempGuard::File(path) => path,
            #[cfg(test)]
            TempGuard::Directory(path) => path,
        }
    }

    /// Moves the temporary file onto `destination`, replacing whatever is there
    ///
    /// On failure the temporary file is removed when the guard drops. On
    /// success the drop-time removal finds nothing at the old path.
    pub(crate) fn persist(self, destination: &Path) -> io::Result<()> {
        fs::rename(self.path(), destination)
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        match self {
            TempGuard::File(path) => {
                // Silently ignore errors during cleanup
                let _ = fs::remove_file(path);
            }
            #[cfg(test)]
            TempGuard::Directory(path) => {
                let _ = fs::remove_dir_all(path);
            }
        }
    }
}

impl Deref for TempGuard {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

/// Writes `contents` to a fresh temporary file inside `directory`
///
/// The file name is `<prefix>.<ulid>.tmp`, so concurrent writers targeting the
/// same final name never share a temporary file. The returned guard deletes
/// the file unless it is persisted.
///
/// # Examples
///
/// ```ignore
/// let temp = write_temp_file_in(&dir, "cover", &bytes)?;
/// temp.persist(&dir.join("cover.png"))?;
/// ```
pub(crate) fn write_temp_file_in(
    directory: &Path,
    prefix: &str,
    contents: &[u8],
) -> io::Result<TempGuard> {
    // Create a unique filename using ULID (monotonic and sortable)
    let ulid = ulid::Ulid::new();
    let path = directory.join(format!("{}.{}.tmp", prefix, ulid));

    let guard = TempGuard::File(path);
    let mut file = File::create(guard.path())?;
    file.write_all(contents)?;
    file.sync_all()?;

    Ok(guard)
}

/// Creates a scratch directory under the system temp dir
#[cfg(test)]
pub(crate) fn create_temp_dir(prefix: &str) -> io::Result<TempGuard> {
    let path = std::env::temp_dir().join(format!("{}_{}", prefix, ulid::Ulid::new()));
    fs::create_dir_all(&path)?;
    Ok(TempGuard::Directory(path))
}
