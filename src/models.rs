// Common data models for the resolution and download engine

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Opaque platform-specific media identifier.
///
/// Produced by the URL classifier (or round-tripped back in from a caller
/// that obtained it from an earlier `info` response). Never interpreted
/// beyond string identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounded quality vocabulary. Anything upstream reports outside this set
/// collapses to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityLabel {
    #[serde(rename = "2160p")]
    P2160,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "144p")]
    P144,
    #[serde(rename = "unknown")]
    #[default]
    Unknown,
}

impl QualityLabel {
    /// Parse a label like `"720p"`. Unrecognized input is `Unknown`,
    /// which also doubles as "no preference" when requesting a resolve.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "2160p" => Self::P2160,
            "1440p" => Self::P1440,
            "1080p" => Self::P1080,
            "720p" => Self::P720,
            "480p" => Self::P480,
            "360p" => Self::P360,
            "240p" => Self::P240,
            "144p" => Self::P144,
            _ => Self::Unknown,
        }
    }

    /// Map a pixel height to the closest label at or below it.
    pub fn from_height(height: u32) -> Self {
        match height {
            h if h >= 2160 => Self::P2160,
            h if h >= 1440 => Self::P1440,
            h if h >= 1080 => Self::P1080,
            h if h >= 720 => Self::P720,
            h if h >= 480 => Self::P480,
            h if h >= 360 => Self::P360,
            h if h >= 240 => Self::P240,
            h if h >= 144 => Self::P144,
            _ => Self::Unknown,
        }
    }

    /// Canonical rank: 0 is the widest quality, `Unknown` sorts last.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::P2160 => 0,
            Self::P1440 => 1,
            Self::P1080 => 2,
            Self::P720 => 3,
            Self::P480 => 4,
            Self::P360 => 5,
            Self::P240 => 6,
            Self::P144 => 7,
            Self::Unknown => 8,
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::P2160 => "2160p",
            Self::P1440 => "1440p",
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::P360 => "360p",
            Self::P240 => "240p",
            Self::P144 => "144p",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One concrete playable/downloadable rendition.
///
/// `media_url`, when present, is an absolute http(s) URL. Placeholder
/// variants (total-failure fallback, metadata-only providers) carry no URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamVariant {
    pub quality_label: QualityLabel,
    pub media_url: Option<String>,
    pub approx_byte_length: Option<u64>,
    pub container: String,
}

impl StreamVariant {
    pub fn placeholder(quality: QualityLabel) -> Self {
        Self {
            quality_label: quality,
            media_url: None,
            approx_byte_length: None,
            container: "mp4".to_string(),
        }
    }
}

/// Fixed quality set advertised when no provider could resolve real streams.
pub const PLACEHOLDER_QUALITIES: [QualityLabel; 3] =
    [QualityLabel::P720, QualityLabel::P480, QualityLabel::P360];

/// Deterministic thumbnail fallback, keyed by id.
pub fn thumbnail_fallback_url(id: &MediaId) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id)
}

/// Resolved metadata plus the ranked stream list for one playable item.
/// Never mutated after creation; a new request re-resolves from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    pub id: MediaId,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_seconds: Option<u64>,
    pub uploader: String,
    pub view_count: u64,
    pub upload_date: Option<String>,
    pub description: Option<String>,
    pub streams: Vec<StreamVariant>,
}

impl MediaDescriptor {
    /// Synthetic fallback used when every provider fails, so the caller
    /// always receives a renderable result.
    pub fn placeholder(id: &MediaId) -> Self {
        Self {
            id: id.clone(),
            title: "Video (unavailable)".to_string(),
            thumbnail_url: thumbnail_fallback_url(id),
            duration_seconds: None,
            uploader: "YouTube".to_string(),
            view_count: 0,
            upload_date: None,
            description: Some("Video information temporarily unavailable.".to_string()),
            streams: PLACEHOLDER_QUALITIES
                .iter()
                .map(|q| StreamVariant::placeholder(*q))
                .collect(),
        }
    }

    /// Whether any variant carries a real downloadable URL.
    pub fn has_playable_stream(&self) -> bool {
        self.streams.iter().any(|s| s.media_url.is_some())
    }
}

/// Playlist metadata plus its independently resolved members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDescriptor {
    pub id: MediaId,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub uploader: String,
    pub members: Vec<MediaDescriptor>,
}

/// One finished download, derived from the stored file at listing time.
/// The downloads directory itself is the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: String,
    pub title: String,
    pub filename: String,
    pub byte_size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Format a duration in seconds as `M:SS` or `H:MM:SS` for display.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_label_round_trips() {
        for s in ["2160p", "1440p", "1080p", "720p", "480p", "360p", "240p", "144p"] {
            assert_eq!(QualityLabel::parse(s).to_string(), s);
        }
        assert_eq!(QualityLabel::parse("hd720"), QualityLabel::Unknown);
        assert_eq!(QualityLabel::parse(""), QualityLabel::Unknown);
    }

    #[test]
    fn quality_label_serializes_as_string() {
        let json = serde_json::to_string(&QualityLabel::P720).unwrap();
        assert_eq!(json, "\"720p\"");
        let back: QualityLabel = serde_json::from_str("\"480p\"").unwrap();
        assert_eq!(back, QualityLabel::P480);
    }

    #[test]
    fn ordinal_orders_widest_first() {
        assert!(QualityLabel::P1080.ordinal() < QualityLabel::P720.ordinal());
        assert!(QualityLabel::P144.ordinal() < QualityLabel::Unknown.ordinal());
    }

    #[test]
    fn from_height_maps_to_nearest_label() {
        assert_eq!(QualityLabel::from_height(1080), QualityLabel::P1080);
        assert_eq!(QualityLabel::from_height(1088), QualityLabel::P1080);
        assert_eq!(QualityLabel::from_height(100), QualityLabel::Unknown);
    }

    #[test]
    fn placeholder_has_fixed_qualities_and_no_urls() {
        let id = MediaId::new("ABC123");
        let d = MediaDescriptor::placeholder(&id);

        assert!(d.title.contains("(unavailable)"));
        assert_eq!(d.thumbnail_url, "https://img.youtube.com/vi/ABC123/maxresdefault.jpg");
        let labels: Vec<QualityLabel> = d.streams.iter().map(|s| s.quality_label).collect();
        assert_eq!(labels, vec![QualityLabel::P720, QualityLabel::P480, QualityLabel::P360]);
        assert!(d.streams.iter().all(|s| s.media_url.is_none()));
        assert!(!d.has_playable_stream());
    }

    #[test]
    fn format_duration_matches_display_convention() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(253), "4:13");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3725), "1:02:05");
    }
}
