/// Libsyn episode page extractor implementation.
use super::{ExtractedMetadata, PodcastPageSource};
use crate::config::DEFAULT_PLAYER_MARKER;
use crate::fetcher::{FetchError, Fetcher};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

static IFRAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src]").expect("iframe selector is valid"));

static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("og:image selector is valid")
});

// Class selectors match whole whitespace-separated tokens, so `date` does not
// match `dated` or `update`.
static DATE_PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.date").expect("date selector is valid"));

/// Extractor for public Libsyn episode pages.
///
/// Fetches the page through the given `Fetcher` and scrapes it with
/// `parse_page`.
pub struct LibsynExtractor<F>
where
    F: Fetcher,
{
    fetcher: F,
    player_marker: String,
}

impl<F> LibsynExtractor<F>
where
    F: Fetcher,
{
    /// Creates an extractor that recognizes the standard Libsyn player host.
    pub fn new(fetcher: F) -> Self {
        Self::with_player_marker(fetcher, DEFAULT_PLAYER_MARKER)
    }

    /// Creates an extractor that treats iframes whose `src` contains
    /// `player_marker` as the player embed.
    pub fn with_player_marker(fetcher: F, player_marker: impl Into<String>) -> Self {
        Self {
            fetcher,
            player_marker: player_marker.into(),
        }
    }
}

impl<F> PodcastPageSource for LibsynExtractor<F>
where
    F: Fetcher,
{
    #[instrument(level = "info", skip(self))]
    fn extract(&self, url: &str) -> Result<ExtractedMetadata, FetchError> {
        let response = self.fetcher.get(url)?;

        // Parse whatever came back; error pages may still carry the embed
        if !response.is_success() {
            warn!(status = response.status, "Episode page returned a non-success status");
        }

        let metadata = parse_page(&response.text(), &self.player_marker);

        debug!(
            embed = metadata.embed_markup.is_some(),
            thumbnail = metadata.thumbnail_url.is_some(),
            date = %metadata.publish_date_text,
            "Extracted episode page metadata"
        );

        Ok(metadata)
    }
}

/// Scrapes an episode page body.
///
/// The parser is lenient: unclosed tags, stray `<` and unknown entities are
/// recovered the way browsers do. When a facet occurs more than once the last
/// occurrence in document order wins.
///
/// # Examples
///
/// ```
/// use libsyn_media::parse_page;
///
/// let html = r#"<meta property="og:image" content="https://cdn.example/cover.jpg?v=2">"#;
/// let metadata = parse_page(html, "player.libsyn.com");
/// assert_eq!(metadata.thumbnail_url.as_deref(), Some("https://cdn.example/cover.jpg"));
/// ```
pub fn parse_page(html: &str, player_marker: &str) -> ExtractedMetadata {
    let document = Html::parse_document(html);

    let embed_markup = document
        .select(&IFRAME)
        .filter(|iframe| {
            iframe
                .value()
                .attr("src")
                .is_some_and(|src| src.contains(player_marker))
        })
        .last()
        .map(|iframe| iframe.html());

    let thumbnail_url = document
        .select(&OG_IMAGE)
        .last()
        .and_then(|meta| meta.value().attr("content"))
        .and_then(strip_query);

    let publish_date_text = document
        .select(&DATE_PARAGRAPH)
        .last()
        .map(|p| p.text().collect::<String>())
        .unwrap_or_default();

    ExtractedMetadata {
        embed_markup,
        thumbnail_url,
        publish_date_text,
    }
}

/// Drops everything from the first `?` on; an empty remainder counts as no URL
fn strip_query(url: &str) -> Option<String> {
    let base = url.split('?').next().unwrap_or_default().trim();
    (!base.is_empty()).then(|| base.to_string())
}
