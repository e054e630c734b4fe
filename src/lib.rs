//! libsyn_media - Libsyn podcast episodes as media
//!
//! This library scrapes a Libsyn episode page for its player embed, episode
//! id, cover image and publish date, keeps cover images in a local
//! content-addressed directory, and exposes the results as the metadata
//! attributes and render data a host media system consumes.

mod attribute;
mod config;
mod extractor;
mod fetcher;
mod formatter;
mod media;
mod temp;
mod thumbnail;

// Re-export error types
pub use attribute::UnknownAttribute;
pub use config::ConfigError;
pub use fetcher::FetchError;
pub use formatter::SettingsError;
pub use thumbnail::ThumbnailError;

pub use attribute::{MetadataAttribute, parse_publish_date};
pub use config::{ConfigReader, DEFAULT_PLAYER_MARKER, DEFAULT_SOURCE_FIELD, Settings};
pub use extractor::{
    CachedExtractor, ExtractedMetadata, LibsynExtractor, PodcastPageSource, episode_id,
    parse_page,
};
pub use fetcher::{DEFAULT_TIMEOUT, FetchResponse, Fetcher, HttpFetcher};
pub use formatter::{EmbedFormatter, EmbedOption, EmbedRender, EmbedSettings, HexColor};
pub use media::{
    ALLOWED_FIELD_TYPES, DEFAULT_NAME_LABEL, DEFAULT_THUMBNAIL_FILENAME, DefaultPageSource,
    LibsynMediaSource, MediaRecord, SOURCE_LABEL, is_allowed_field_type,
};
pub use thumbnail::ThumbnailCache;

use thiserror::Error;

/// Top-level error type for libsyn_media operations
#[derive(Debug, Error)]
pub enum PodcastError {
    /// Error fetching an episode page
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Error loading settings
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid formatter settings
    #[error("Formatter settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Unknown attribute key
    #[error("Attribute error: {0}")]
    Attribute(#[from] UnknownAttribute),

    /// Failed to serialize results for output
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_failure_is_an_output_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = PodcastError::from(source);

        assert!(matches!(error, PodcastError::Output(_)));
        assert!(error.to_string().starts_with("Output error: "));
    }
}
