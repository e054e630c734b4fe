//! Libsyn media source
//!
//! Resolves the metadata attributes of a media record whose source field holds
//! a Libsyn episode page URL.

use crate::attribute::{MetadataAttribute, parse_publish_date};
use crate::config::{ConfigReader, Settings};
use crate::extractor::{CachedExtractor, LibsynExtractor, PodcastPageSource};
use crate::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::thumbnail::ThumbnailCache;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{instrument, warn};

/// Label hosts show for this media type
pub const SOURCE_LABEL: &str = "Libsyn Podcast";

/// Default label for the name of a new media record
pub const DEFAULT_NAME_LABEL: &str = "Podcast";

/// Icon used as the thumbnail when no cover image can be resolved
pub const DEFAULT_THUMBNAIL_FILENAME: &str = "libsyn.png";

/// Field types that may hold the episode page URL
pub const ALLOWED_FIELD_TYPES: &[&str] = &["link", "string", "string_long"];

/// Returns true if a field of type `field_type` can be the source field
pub fn is_allowed_field_type(field_type: &str) -> bool {
    ALLOWED_FIELD_TYPES.contains(&field_type)
}

/// Read access to the stored field values of a media record
pub trait MediaRecord {
    /// Main value of the named field, or `None` if the record has no such
    /// field or it is empty
    fn field_value(&self, field: &str) -> Option<String>;
}

impl MediaRecord for HashMap<String, String> {
    fn field_value(&self, field: &str) -> Option<String> {
        self.get(field).cloned()
    }
}

/// The page source the default constructor wires up
pub type DefaultPageSource = CachedExtractor<LibsynExtractor<HttpFetcher>>;

/// Metadata attribute resolution for Libsyn media records
///
/// Pages are read through `pages`; wrap it in a `CachedExtractor` so that
/// resolving several attributes of one record fetches the page once.
pub struct LibsynMediaSource<S, F>
where
    S: PodcastPageSource,
    F: Fetcher,
{
    /// Where episode pages come from
    pages: S,
    /// Local store for cover images
    thumbnails: ThumbnailCache<F>,
    /// Record field holding the episode page URL
    source_field: String,
    /// Fallback thumbnail
    default_thumbnail: PathBuf,
}

impl LibsynMediaSource<DefaultPageSource, HttpFetcher> {
    /// Builds a media source with HTTP fetching and a per-URL metadata cache
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let source = LibsynMediaSource::from_settings(&Settings::default())?;
    /// let id = source.get_metadata(&record, MetadataAttribute::EpisodeId)?;
    /// ```
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::with_timeout(settings.request_timeout())?;
        let extractor =
            LibsynExtractor::with_player_marker(fetcher.clone(), &settings.player_marker);
        let pages = CachedExtractor::new(extractor, settings.cache_ttl());

        Ok(Self::new(pages, fetcher, &settings.source_field, settings))
    }
}

impl<S, F> LibsynMediaSource<S, F>
where
    S: PodcastPageSource,
    F: Fetcher,
{
    /// Creates a media source
    ///
    /// # Arguments
    ///
    /// * `pages` - Source of extracted episode page metadata
    /// * `fetcher` - Used to download cover images
    /// * `source_field` - Record field holding the episode page URL
    /// * `config` - Supplies the thumbnail directory and icon location
    pub fn new(
        pages: S,
        fetcher: F,
        source_field: impl Into<String>,
        config: &dyn ConfigReader,
    ) -> Self {
        Self {
            pages,
            thumbnails: ThumbnailCache::new(config.thumbnail_destination(), fetcher),
            source_field: source_field.into(),
            default_thumbnail: config.icon_base().join(DEFAULT_THUMBNAIL_FILENAME),
        }
    }

    /// Name of the record field holding the episode page URL
    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    /// All attributes this source provides, with their labels
    pub fn metadata_attributes(&self) -> Vec<(MetadataAttribute, &'static str)> {
        MetadataAttribute::ALL
            .into_iter()
            .map(|attribute| (attribute, attribute.label()))
            .collect()
    }

    /// The episode page URL stored on the record, if any
    pub fn source_url(&self, record: &dyn MediaRecord) -> Option<String> {
        record
            .field_value(&self.source_field)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }

    /// Resolves one metadata attribute of `record`
    ///
    /// `Ok(None)` means the attribute is not available: the record has no
    /// source URL, or the page lacks the facet. Only a failure to fetch the
    /// episode page is an error.
    #[instrument(level = "debug", skip(self, record))]
    pub fn get_metadata(
        &self,
        record: &dyn MediaRecord,
        attribute: MetadataAttribute,
    ) -> Result<Option<String>, FetchError> {
        let Some(url) = self.source_url(record) else {
            return Ok(None);
        };

        let data = self.pages.extract(&url)?;

        let value = match attribute {
            MetadataAttribute::Html => Some(data.embed_markup.unwrap_or_default()),
            MetadataAttribute::EpisodeId => data.episode_id(),
            MetadataAttribute::ThumbnailUri => self
                .thumbnails
                .local_thumbnail_path(data.thumbnail_url.as_deref())
                .map(|path| path.to_string_lossy().into_owned())
                .or(data.thumbnail_url),
            MetadataAttribute::PodcastDate => Some(data.publish_date_text),
            MetadataAttribute::PodcastDateDate => parse_publish_date(&data.publish_date_text)
                .map(|date| date.format("%Y-%m-%d").to_string()),
        };

        Ok(value)
    }

    /// Thumbnail for `record`, falling back to the bundled icon
    ///
    /// Never fails; fetch errors are logged.
    pub fn thumbnail(&self, record: &dyn MediaRecord) -> String {
        match self.get_metadata(record, MetadataAttribute::ThumbnailUri) {
            Ok(Some(uri)) => return uri,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not resolve Libsyn thumbnail"),
        }

        self.default_thumbnail.to_string_lossy().into_owned()
    }
}
