//! Embed formatter
//!
//! Turns a media record into the data a host template needs to render the
//! Libsyn player: the episode id plus the administrator's display settings.

use crate::attribute::MetadataAttribute;
use crate::extractor::PodcastPageSource;
use crate::fetcher::Fetcher;
use crate::media::{LibsynMediaSource, MediaRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Errors in formatter settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The custom color is not a six digit hex code
    #[error("Invalid custom color {0:?}: expected a 6-character hex code")]
    InvalidColor(String),

    /// Width or height is zero
    #[error("{0} must be at least 1")]
    ZeroDimension(&'static str),

    /// A required text setting is empty
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// A player color as six upper-case hex digits, without `#`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Parses `87a93a` or `#87A93A`
    pub fn parse(value: &str) -> Result<Self, SettingsError> {
        let digits = value.trim().trim_start_matches('#');
        if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(digits.to_ascii_uppercase()))
        } else {
            Err(SettingsError::InvalidColor(value.to_string()))
        }
    }

    /// The hex digits
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Player behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedOption {
    #[serde(rename = "autonext")]
    AutoNext,
    Thumbnail,
    Autoplay,
    Preload,
    NoAddthis,
    RenderPlaylist,
}

impl EmbedOption {
    /// All options, in the order they are offered
    pub const ALL: [EmbedOption; 6] = [
        EmbedOption::AutoNext,
        EmbedOption::Thumbnail,
        EmbedOption::Autoplay,
        EmbedOption::Preload,
        EmbedOption::NoAddthis,
        EmbedOption::RenderPlaylist,
    ];

    /// The option's settings key
    pub fn key(self) -> &'static str {
        match self {
            EmbedOption::AutoNext => "autonext",
            EmbedOption::Thumbnail => "thumbnail",
            EmbedOption::Autoplay => "autoplay",
            EmbedOption::Preload => "preload",
            EmbedOption::NoAddthis => "no_addthis",
            EmbedOption::RenderPlaylist => "render_playlist",
        }
    }

    /// Label shown next to the checkbox
    pub fn label(self) -> &'static str {
        match self {
            EmbedOption::AutoNext => "Auto Next",
            EmbedOption::Thumbnail => "Show thumbnail",
            EmbedOption::Autoplay => "Autoplay",
            EmbedOption::Preload => "Preload",
            EmbedOption::NoAddthis => "No Addthis",
            EmbedOption::RenderPlaylist => "Render playlist",
        }
    }
}

/// Display settings for the embedded player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    /// Player width; 700 suits most layouts
    pub width: u32,
    /// Player height; 90 is the compact player
    pub height: u32,
    /// Player theme name
    pub theme: String,
    /// Accent color used by the `custom` theme
    pub custom_color: HexColor,
    /// Playlist direction
    pub direction: String,
    /// Enabled player switches
    pub options: BTreeSet<EmbedOption>,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self {
            width: 700,
            height: 90,
            theme: "custom".to_string(),
            custom_color: HexColor("87A93A".to_string()),
            direction: "forward".to_string(),
            options: BTreeSet::new(),
        }
    }
}

impl EmbedSettings {
    /// Checks the settings an administrator must fill in
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.width == 0 {
            return Err(SettingsError::ZeroDimension("Width"));
        }
        if self.height == 0 {
            return Err(SettingsError::ZeroDimension("Height"));
        }
        if self.theme.trim().is_empty() {
            return Err(SettingsError::Empty("Theme"));
        }
        if self.direction.trim().is_empty() {
            return Err(SettingsError::Empty("Direction"));
        }
        Ok(())
    }

    /// Short description of the settings for administration screens
    ///
    /// # Examples
    ///
    /// ```
    /// use libsyn_media::EmbedSettings;
    ///
    /// let summary = EmbedSettings::default().settings_summary();
    /// assert_eq!(summary, vec!["Width: 700", "Height: 90"]);
    /// ```
    pub fn settings_summary(&self) -> Vec<String> {
        let mut summary = vec![
            format!("Width: {}", self.width),
            format!("Height: {}", self.height),
        ];

        if !self.options.is_empty() {
            let labels: Vec<_> = self.options.iter().map(|option| option.label()).collect();
            summary.push(format!("Options: {}", labels.join(", ")));
        }

        summary
    }
}

/// Everything a template needs to render one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedRender {
    /// Position of the field item this player belongs to
    pub delta: usize,
    pub episode_id: String,
    pub width: u32,
    pub height: u32,
    pub embed_theme: String,
    pub custom_color: HexColor,
    pub direction: String,
    pub options: BTreeSet<EmbedOption>,
}

/// Formatter rendering a Libsyn source field as an embedded player
pub struct EmbedFormatter {
    settings: EmbedSettings,
}

impl EmbedFormatter {
    /// Creates a formatter after validating `settings`
    pub fn new(settings: EmbedSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// The formatter's settings
    pub fn settings(&self) -> &EmbedSettings {
        &self.settings
    }

    /// Builds one render bundle per field item
    ///
    /// Returns nothing when the episode id cannot be resolved; fetch errors
    /// are logged and never reach the caller.
    pub fn view_elements<S, F>(
        &self,
        source: &LibsynMediaSource<S, F>,
        record: &dyn MediaRecord,
        item_count: usize,
    ) -> Vec<EmbedRender>
    where
        S: PodcastPageSource,
        F: Fetcher,
    {
        if item_count == 0 {
            return Vec::new();
        }

        let episode_id = match source.get_metadata(record, MetadataAttribute::EpisodeId) {
            Ok(Some(id)) => id,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Could not load Libsyn episode page for rendering");
                return Vec::new();
            }
        };

        (0..item_count)
            .map(|delta| EmbedRender {
                delta,
                episode_id: episode_id.clone(),
                width: self.settings.width,
                height: self.settings.height,
                embed_theme: self.settings.theme.clone(),
                custom_color: self.settings.custom_color.clone(),
                direction: self.settings.direction.clone(),
                options: self.settings.options.clone(),
            })
            .collect()
    }
}
