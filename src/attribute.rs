//! Metadata attributes exposed for a Libsyn media record
//!
//! The set of attributes is closed. Hosts that address attributes by their
//! string keys go through `FromStr`/`Display`.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Matches an ordinal suffix directly after a day number (`1st`, `22nd`)
static ORDINAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("ordinal pattern is valid")
});

/// Date layouts seen on episode pages, tried in order
const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%B %d %Y",
    "%A, %B %d, %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// An unrecognized attribute key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown metadata attribute: {0}")]
pub struct UnknownAttribute(pub String);

/// A metadata attribute of a Libsyn media record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataAttribute {
    /// Publish date as shown on the page
    PodcastDate,
    /// Publish date as `YYYY-MM-DD`
    PodcastDateDate,
    /// Numeric episode id from the player embed
    EpisodeId,
    /// Player embed markup
    Html,
    /// Local thumbnail path, or the remote image URL
    ThumbnailUri,
}

impl MetadataAttribute {
    /// All attributes, in the order hosts list them
    pub const ALL: [MetadataAttribute; 5] = [
        MetadataAttribute::PodcastDate,
        MetadataAttribute::PodcastDateDate,
        MetadataAttribute::EpisodeId,
        MetadataAttribute::Html,
        MetadataAttribute::ThumbnailUri,
    ];

    /// The attribute's string key
    pub fn key(self) -> &'static str {
        match self {
            MetadataAttribute::PodcastDate => "podcast_date",
            MetadataAttribute::PodcastDateDate => "podcast_date_date",
            MetadataAttribute::EpisodeId => "episode_id",
            MetadataAttribute::Html => "html",
            MetadataAttribute::ThumbnailUri => "thumbnail_uri",
        }
    }

    /// Human readable description for administration screens
    pub fn label(self) -> &'static str {
        match self {
            MetadataAttribute::PodcastDate => "Date of the podcast as a string",
            MetadataAttribute::PodcastDateDate => "Date of the podcast for date fields",
            MetadataAttribute::EpisodeId => "The episode id",
            MetadataAttribute::Html => "HTML embed code",
            MetadataAttribute::ThumbnailUri => "URI of the thumbnail",
        }
    }
}

impl fmt::Display for MetadataAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MetadataAttribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetadataAttribute::ALL
            .into_iter()
            .find(|attribute| attribute.key() == s)
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}

/// Parses the free-form publish date text of an episode page
///
/// Accepts month-name dates (`March 1, 2020`, `Mar 1st, 2020`,
/// `1 March 2020`), ISO and US numeric dates, and RFC 3339 / RFC 2822
/// timestamps. Returns `None` for anything else.
pub fn parse_publish_date(text: &str) -> Option<NaiveDate> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&collapsed) {
        return Some(timestamp.date_naive());
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc2822(&collapsed) {
        return Some(timestamp.date_naive());
    }

    let normalized = ORDINAL_SUFFIX.replace_all(&collapsed, "$1");

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&normalized, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_attribute_keys_round_trip() {
        for attribute in MetadataAttribute::ALL {
            assert_eq!(attribute.key().parse::<MetadataAttribute>(), Ok(attribute));
            assert_eq!(attribute.to_string(), attribute.key());
        }
    }

    #[test]
    fn test_unknown_attribute() {
        let err = "thumbnail_url".parse::<MetadataAttribute>().unwrap_err();
        assert_eq!(err, UnknownAttribute("thumbnail_url".to_string()));
        assert_eq!(err.to_string(), "Unknown metadata attribute: thumbnail_url");
    }

    #[test]
    fn test_attribute_serde_uses_keys() {
        let json = serde_json::to_string(&MetadataAttribute::PodcastDateDate).unwrap();
        assert_eq!(json, "\"podcast_date_date\"");
    }

    #[test]
    fn test_parse_month_name_dates() {
        assert_eq!(parse_publish_date("March 1, 2020"), ymd(2020, 3, 1));
        assert_eq!(parse_publish_date("Mar 1, 2020"), ymd(2020, 3, 1));
        assert_eq!(parse_publish_date("December 25 2019"), ymd(2019, 12, 25));
        assert_eq!(parse_publish_date("1 March 2020"), ymd(2020, 3, 1));
        assert_eq!(parse_publish_date("Sunday, March 1, 2020"), ymd(2020, 3, 1));
    }

    #[test]
    fn test_parse_ordinals_and_whitespace() {
        assert_eq!(parse_publish_date("  Mar 1st,\n   2020 "), ymd(2020, 3, 1));
        assert_eq!(parse_publish_date("June 22nd, 2021"), ymd(2021, 6, 22));
    }

    #[test]
    fn test_parse_numeric_and_timestamps() {
        assert_eq!(parse_publish_date("2020-03-01"), ymd(2020, 3, 1));
        assert_eq!(parse_publish_date("03/01/2020"), ymd(2020, 3, 1));
        assert_eq!(parse_publish_date("2020-03-01T10:30:00+02:00"), ymd(2020, 3, 1));
        assert_eq!(
            parse_publish_date("Sun, 01 Mar 2020 10:30:00 +0000"),
            ymd(2020, 3, 1)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_publish_date(""), None);
        assert_eq!(parse_publish_date("   "), None);
        assert_eq!(parse_publish_date("sometime last week"), None);
        assert_eq!(parse_publish_date("February 30, 2020"), None);
    }
}
