//! Podcast episode page extraction
//!
//! This module provides the `ExtractedMetadata` structure describing what was
//! scraped from one episode page, the `PodcastPageSource` trait for anything
//! that can produce it, and the derivation of the episode id from the player
//! embed markup.
mod cached;
mod libsyn;

pub use cached::CachedExtractor;
pub use libsyn::{LibsynExtractor, parse_page};

use crate::fetcher::FetchError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;

/// Captures the value of the first `src="..."` attribute in a fragment
static SRC_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="([^"]+)""#).expect("src pattern is valid"));

/// Captures the numeric id in a Libsyn player path such as `/embed/episode/id/1234/height/90`
static EPISODE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/episode/id/(\d+)").expect("episode pattern is valid"));

/// Metadata scraped from a single podcast episode page.
///
/// Every field is derived from the page body alone; two pages with the same
/// bytes yield equal values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    /// Serialized markup of the player iframe, if one was found
    pub embed_markup: Option<String>,
    /// Remote cover image URL from `og:image`, without its query string
    pub thumbnail_url: Option<String>,
    /// Text of the page's date paragraph, empty when there is none
    pub publish_date_text: String,
}

impl ExtractedMetadata {
    /// Episode id parsed from the embed markup, if any
    pub fn episode_id(&self) -> Option<String> {
        self.embed_markup.as_deref().and_then(episode_id)
    }
}

/// Trait for anything that can turn an episode page URL into metadata.
///
/// Implementors fail only when the page cannot be fetched at all; missing
/// facets are reported as unset fields.
pub trait PodcastPageSource {
    /// Fetches and parses the episode page at `url`.
    fn extract(&self, url: &str) -> Result<ExtractedMetadata, FetchError>;
}

impl<S: PodcastPageSource + ?Sized> PodcastPageSource for &S {
    fn extract(&self, url: &str) -> Result<ExtractedMetadata, FetchError> {
        (**self).extract(url)
    }
}

/// Derives the episode id from player embed markup
///
/// Takes the first `src` attribute, percent-decodes it and looks for the
/// `/episode/id/<digits>` path segment. Returns `None` when either step
/// finds nothing.
///
/// # Examples
///
/// ```
/// use libsyn_media::episode_id;
///
/// let markup = r#"<iframe src="https://html5-player.libsyn.com/embed/episode/id/1234/height/90"></iframe>"#;
/// assert_eq!(episode_id(markup).as_deref(), Some("1234"));
/// ```
pub fn episode_id(embed_markup: &str) -> Option<String> {
    let src = SRC_ATTRIBUTE.captures(embed_markup)?.get(1)?.as_str();

    // Keep the raw value if the decoded bytes are not UTF-8
    let decoded = urlencoding::decode(src).unwrap_or(Cow::Borrowed(src));

    EPISODE_SEGMENT
        .captures(&decoded)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}
