//! Configuration for the Libsyn media source
//!
//! Settings are a plain serde record that can be read from a JSON file. Every
//! field has a default, so an empty object (or no file at all) is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Substring identifying the Libsyn player host inside an iframe `src`
pub const DEFAULT_PLAYER_MARKER: &str = "player.libsyn.com";

/// Media record field holding the episode page URL unless configured otherwise
pub const DEFAULT_SOURCE_FIELD: &str = "field_media_libsyn";

/// Errors that can occur while loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file
    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the settings file
    #[error("Failed to parse settings file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read access to the settings the media source depends on
///
/// Hosts with their own configuration store implement this instead of
/// constructing a `Settings` value.
pub trait ConfigReader {
    /// Directory where downloaded thumbnails are stored
    fn thumbnail_destination(&self) -> PathBuf;

    /// Directory holding the bundled media type icons
    fn icon_base(&self) -> PathBuf;
}

/// Settings for extraction, thumbnail caching and record lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory where downloaded thumbnails are stored
    pub thumbnail_destination: PathBuf,
    /// Directory holding the bundled media type icons (`libsyn.png`)
    pub icon_base: PathBuf,
    /// Name of the media record field that stores the episode page URL
    pub source_field: String,
    /// Substring an iframe `src` must contain to count as the player embed
    pub player_marker: String,
    /// Timeout for page and thumbnail requests, in seconds
    pub request_timeout_secs: u64,
    /// How long extracted page metadata is reused, in seconds
    pub cache_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let base = default_data_dir();
        Self {
            thumbnail_destination: base.join("thumbnails"),
            icon_base: base.join("icons"),
            source_field: DEFAULT_SOURCE_FIELD.to_string(),
            player_marker: DEFAULT_PLAYER_MARKER.to_string(),
            request_timeout_secs: 30,
            cache_ttl_secs: 60 * 60,
        }
    }
}

impl Settings {
    /// Loads settings from a JSON file
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let settings = Settings::load(Path::new("libsyn.json"))?;
    /// println!("Thumbnails go to {}", settings.thumbnail_destination.display());
    /// ```
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Metadata cache lifetime as a `Duration`
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl ConfigReader for Settings {
    fn thumbnail_destination(&self) -> PathBuf {
        self.thumbnail_destination.clone()
    }

    fn icon_base(&self) -> PathBuf {
        self.icon_base.clone()
    }
}

/// Returns the platform data directory for this crate
///
/// - Linux: ~/.cache/libsyn_media/
/// - macOS: ~/Library/Caches/fm.libsyn.libsyn_media/
/// - Windows: %LOCALAPPDATA%\libsyn\libsyn_media\cache\
///
/// Falls back to the system temp directory when no home directory is known.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("fm", "libsyn", "libsyn_media")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("libsyn_media"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temp::create_temp_dir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.player_marker, "player.libsyn.com");
        assert_eq!(settings.source_field, "field_media_libsyn");
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.cache_ttl(), Duration::from_secs(3600));
        assert!(settings.thumbnail_destination.ends_with("thumbnails"));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = create_temp_dir("config_test").unwrap();
        let path = dir.join("settings.json");
        fs::write(
            &path,
            r#"{ "thumbnail_destination": "/srv/files/libsyn", "request_timeout_secs": 5 }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings.thumbnail_destination(),
            PathBuf::from("/srv/files/libsyn")
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.player_marker, DEFAULT_PLAYER_MARKER);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = create_temp_dir("config_test").unwrap();
        let err = Settings::load(&dir.join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = create_temp_dir("config_test").unwrap();
        let path = dir.join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }
}
