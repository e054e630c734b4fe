//! Local thumbnail storage module
//!
//! This module materializes remote cover images into a local directory. File
//! names are derived from a hash of the remote URL, so a thumbnail is
//! downloaded once and every later lookup is a plain existence check.

use crate::fetcher::{FetchError, Fetcher};
use crate::temp::write_temp_file_in;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Extension used when the remote URL has none; Libsyn serves PNG covers
/// from extensionless URLs.
const DEFAULT_EXTENSION: &str = "png";

/// Errors that can occur while materializing a thumbnail
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Failed to create the destination directory
    #[error("Failed to create thumbnail directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The destination directory exists but cannot be written to
    #[error("Thumbnail directory {path} is not writable")]
    DirectoryNotWritable { path: PathBuf },

    /// The remote image could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The remote host answered with a non-success status
    #[error("HTTP {status} while downloading thumbnail from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Failed to write the image to disk
    #[error("Failed to write thumbnail {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Content-addressed store for remote thumbnails
///
/// Files are named `<blake3 hex of the URL>.<extension>`. Existing files are
/// never refreshed or removed.
pub struct ThumbnailCache<F>
where
    F: Fetcher,
{
    /// The directory where thumbnails are stored
    directory: PathBuf,
    /// Used to download missing thumbnails
    fetcher: F,
}

impl<F> ThumbnailCache<F>
where
    F: Fetcher,
{
    /// Creates a thumbnail cache rooted at `directory`
    ///
    /// The directory is created lazily on the first download.
    pub fn new(directory: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            directory: directory.into(),
            fetcher,
        }
    }

    /// Returns the directory thumbnails are stored in
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Computes the local path for a remote thumbnail, whether or not it exists
    pub fn local_path(&self, remote_url: &str) -> PathBuf {
        let hash = blake3::hash(remote_url.as_bytes());
        self.directory
            .join(format!("{}.{}", hash.to_hex(), url_extension(remote_url)))
    }

    /// Returns the local path of a remote thumbnail, downloading it if needed
    ///
    /// Returns `None` without touching the network or the filesystem when no
    /// URL is given. Download and storage problems are logged as warnings and
    /// also yield `None`; a missing thumbnail never blocks the caller.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let thumbnails = ThumbnailCache::new("/srv/files/libsyn", HttpFetcher::new()?);
    /// if let Some(path) = thumbnails.local_thumbnail_path(metadata.thumbnail_url.as_deref()) {
    ///     println!("Cover cached at {}", path.display());
    /// }
    /// ```
    pub fn local_thumbnail_path(&self, remote_url: Option<&str>) -> Option<PathBuf> {
        let remote_url = remote_url.filter(|url| !url.is_empty())?;

        match self.materialize(remote_url) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url = %remote_url, error = %e, "Could not store remote thumbnail locally");
                None
            }
        }
    }

    /// Like `local_thumbnail_path`, but reports why a thumbnail is unavailable
    #[instrument(level = "debug", skip(self))]
    pub fn materialize(&self, remote_url: &str) -> Result<PathBuf, ThumbnailError> {
        let local_path = self.local_path(remote_url);

        // Existing files are final; never refetch them
        if local_path.exists() {
            return Ok(local_path);
        }

        prepare_directory(&self.directory)?;

        let response = self.fetcher.get(remote_url)?;
        if !response.is_success() {
            return Err(ThumbnailError::HttpStatus {
                url: remote_url.to_string(),
                status: response.status,
            });
        }

        let prefix = local_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("thumbnail");

        // Write next to the target and rename, so readers never see partial files
        write_temp_file_in(&self.directory, prefix, &response.body)
            .and_then(|temp| temp.persist(&local_path))
            .map_err(|e| ThumbnailError::WriteFailed {
                path: local_path.clone(),
                source: e,
            })?;

        debug!(
            path = %local_path.display(),
            size = %humansize::format_size(response.body.len(), humansize::DECIMAL),
            "Stored thumbnail"
        );

        Ok(local_path)
    }
}

/// Creates `directory` (and its parents) and makes sure it is writable
///
/// On Unix a read-only directory is switched to mode 0775 so the web server
/// serving the files can read them.
fn prepare_directory(directory: &Path) -> Result<(), ThumbnailError> {
    fs::create_dir_all(directory).map_err(|e| ThumbnailError::DirectoryCreationFailed {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let not_writable = || ThumbnailError::DirectoryNotWritable {
        path: directory.to_path_buf(),
    };

    let mut permissions = fs::metadata(directory)
        .map_err(|_| not_writable())?
        .permissions();

    if permissions.readonly() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            permissions.set_mode(0o775);
        }
        #[cfg(not(unix))]
        permissions.set_readonly(false);

        fs::set_permissions(directory, permissions).map_err(|_| not_writable())?;
    }

    Ok(())
}

/// Returns the file extension of the URL's last path segment, or `png`
///
/// Only short alphanumeric extensions are taken over verbatim; anything else
/// falls back to the default.
fn url_extension(remote_url: &str) -> String {
    let path = match url::Url::parse(remote_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => remote_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let last_segment = path.rsplit('/').next().unwrap_or_default();

    Path::new(last_segment)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchResponse;
    use crate::fetcher::testing::{StubFetcher, UnreachableFetcher};
    use crate::temp::create_temp_dir;

    const COVER: &str = "https://assets.libsyn.com/secure/content/5555";

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://cdn.example/cover.jpg"), "jpg");
        assert_eq!(url_extension("https://cdn.example/a.b/cover.webp"), "webp");
        assert_eq!(url_extension(COVER), "png");
        assert_eq!(url_extension("https://cdn.example/dir.v2/cover"), "png");
        assert_eq!(url_extension("https://cdn.example/"), "png");
        assert_eq!(url_extension("relative/cover.gif?x=1"), "gif");
    }

    #[test]
    fn test_local_path_is_content_addressed() {
        let thumbnails = ThumbnailCache::new("/srv/thumbs", StubFetcher::new());

        let path = thumbnails.local_path("https://cdn.example/cover.jpg");
        let again = thumbnails.local_path("https://cdn.example/cover.jpg");
        let other = thumbnails.local_path("https://cdn.example/other.jpg");

        assert_eq!(path, again);
        assert_ne!(path, other);
        assert_eq!(path.parent().unwrap(), Path::new("/srv/thumbs"));

        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + ".jpg".len());
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_unset_url_does_nothing() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let target = dir.join("thumbs");
        let fetcher = StubFetcher::new();
        let thumbnails = ThumbnailCache::new(&target, &fetcher);

        assert_eq!(thumbnails.local_thumbnail_path(None), None);
        assert_eq!(thumbnails.local_thumbnail_path(Some("")), None);

        assert_eq!(fetcher.call_count(), 0);
        assert!(!target.exists());
    }

    #[test]
    fn test_second_lookup_skips_fetch() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let target = dir.join("nested").join("thumbs");
        let fetcher = StubFetcher::new().with(COVER, 200, b"\x89PNG fake".to_vec());
        let thumbnails = ThumbnailCache::new(&target, &fetcher);

        let first = thumbnails.local_thumbnail_path(Some(COVER)).unwrap();
        let second = thumbnails.local_thumbnail_path(Some(COVER)).unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.call_count(), 1);
        assert!(first.starts_with(&target));
        assert_eq!(first.extension().unwrap(), "png");
        assert_eq!(fs::read(&first).unwrap(), b"\x89PNG fake");
    }

    #[test]
    fn test_existing_file_returned_without_fetch() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let fetcher = StubFetcher::new();
        let thumbnails = ThumbnailCache::new(dir.path(), &fetcher);

        let expected = thumbnails.local_path(COVER);
        fs::write(&expected, b"already here").unwrap();

        assert_eq!(thumbnails.local_thumbnail_path(Some(COVER)), Some(expected));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let fetcher = StubFetcher::new().with(COVER, 200, b"img".to_vec());
        let thumbnails = ThumbnailCache::new(dir.path(), &fetcher);

        thumbnails.local_thumbnail_path(Some(COVER)).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn test_non_success_status() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let fetcher = StubFetcher::new().with(COVER, 403, b"denied".to_vec());
        let thumbnails = ThumbnailCache::new(dir.path(), &fetcher);

        assert_eq!(thumbnails.local_thumbnail_path(Some(COVER)), None);
        assert!(matches!(
            thumbnails.materialize(COVER),
            Err(ThumbnailError::HttpStatus { status: 403, .. })
        ));
        assert!(!thumbnails.local_path(COVER).exists());
    }

    #[test]
    fn test_transport_failure() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let thumbnails = ThumbnailCache::new(dir.path(), UnreachableFetcher);

        assert_eq!(thumbnails.local_thumbnail_path(Some(COVER)), None);
        assert!(matches!(
            thumbnails.materialize(COVER),
            Err(ThumbnailError::Fetch(_))
        ));
    }

    #[test]
    fn test_uncreatable_directory() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let blocker = dir.join("file");
        fs::write(&blocker, b"not a directory").unwrap();

        let fetcher = StubFetcher::new().with(COVER, 200, b"img".to_vec());
        let thumbnails = ThumbnailCache::new(blocker.join("thumbs"), &fetcher);

        assert_eq!(thumbnails.local_thumbnail_path(Some(COVER)), None);
        assert!(matches!(
            thumbnails.materialize(COVER),
            Err(ThumbnailError::DirectoryCreationFailed { .. })
        ));
        assert_eq!(fetcher.call_count(), 0);
    }

    /// Serves an image, but first puts a directory where the image should land
    struct OccupyingFetcher {
        occupied: PathBuf,
    }

    impl Fetcher for OccupyingFetcher {
        fn get(&self, _url: &str) -> Result<FetchResponse, FetchError> {
            fs::create_dir_all(&self.occupied).unwrap();
            fs::write(self.occupied.join("keep"), b"x").unwrap();
            Ok(FetchResponse {
                status: 200,
                body: b"img".to_vec(),
            })
        }
    }

    #[test]
    fn test_write_failure_leaves_no_temp_file() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let occupied = ThumbnailCache::new(dir.path(), StubFetcher::new()).local_path(COVER);
        let thumbnails = ThumbnailCache::new(
            dir.path(),
            OccupyingFetcher {
                occupied: occupied.clone(),
            },
        );

        assert_eq!(thumbnails.local_thumbnail_path(Some(COVER)), None);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
        assert!(occupied.is_dir());
    }

    #[test]
    fn test_write_failure_reported() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let occupied = ThumbnailCache::new(dir.path(), StubFetcher::new()).local_path(COVER);
        let thumbnails = ThumbnailCache::new(dir.path(), OccupyingFetcher { occupied });

        assert!(matches!(
            thumbnails.materialize(COVER),
            Err(ThumbnailError::WriteFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_made_writable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = create_temp_dir("thumbnail_test").unwrap();
        let target = dir.join("thumbs");
        fs::create_dir(&target).unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o555)).unwrap();
        assert!(fs::metadata(&target).unwrap().permissions().readonly());

        prepare_directory(&target).unwrap();

        let permissions = fs::metadata(&target).unwrap().permissions();
        assert!(!permissions.readonly());
        assert_eq!(permissions.mode() & 0o777, 0o775);
    }

    #[test]
    fn test_writable_directory_left_alone() {
        let dir = create_temp_dir("thumbnail_test").unwrap();
        let before = fs::metadata(dir.path()).unwrap().permissions();

        prepare_directory(dir.path()).unwrap();

        assert_eq!(fs::metadata(dir.path()).unwrap().permissions(), before);
    }
}
