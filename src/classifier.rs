// URL classifier - pure pattern matching, no I/O
//
// Recognizes the five canonical shapes (watch, short-link, embed, /v/,
// playlist) with or without scheme and `www.`. A `list=` parameter always
// wins over a `v=` parameter: a watch URL inside a playlist classifies as
// the playlist.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::EngineError;
use crate::models::MediaId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Video,
    Playlist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedUrl {
    pub kind: UrlKind,
    pub id: MediaId,
}

lazy_static! {
    static ref SHAPE_RES: Vec<Regex> = vec![
        Regex::new(r"^(https?://)?(www\.)?youtube\.com/watch\?v=").unwrap(),
        Regex::new(r"^(https?://)?(www\.)?youtube\.com/playlist\?list=").unwrap(),
        Regex::new(r"^(https?://)?(www\.)?youtu\.be/").unwrap(),
        Regex::new(r"^(https?://)?(www\.)?youtube\.com/embed/").unwrap(),
        Regex::new(r"^(https?://)?(www\.)?youtube\.com/v/").unwrap(),
    ];
    static ref PLAYLIST_ID_RE: Regex = Regex::new(r"[?&]list=([^&\n?#]+)").unwrap();
    // Priority-ordered; first match wins.
    static ref VIDEO_ID_RES: Vec<Regex> = vec![
        Regex::new(r"youtube\.com/watch\?v=([^&\n?#]+)").unwrap(),
        Regex::new(r"youtu\.be/([^&\n?#]+)").unwrap(),
        Regex::new(r"youtube\.com/embed/([^&\n?#]+)").unwrap(),
        Regex::new(r"youtube\.com/v/([^&\n?#]+)").unwrap(),
        Regex::new(r"youtube\.com/watch\?.*&v=([^&\n?#]+)").unwrap(),
    ];
}

/// Classify an input string into a video or playlist id.
///
/// Deterministic and side-effect free. Returns `InvalidUrl` for anything
/// that does not match a recognized shape.
pub fn classify(url: &str) -> Result<ClassifiedUrl, EngineError> {
    let url = url.trim();

    if !SHAPE_RES.iter().any(|re| re.is_match(url)) {
        return Err(EngineError::InvalidUrl(url.to_string()));
    }

    // Playlist parameter short-circuits video patterns.
    if let Some(caps) = PLAYLIST_ID_RE.captures(url) {
        return Ok(ClassifiedUrl {
            kind: UrlKind::Playlist,
            id: MediaId::new(&caps[1]),
        });
    }

    for re in VIDEO_ID_RES.iter() {
        if let Some(caps) = re.captures(url) {
            return Ok(ClassifiedUrl {
                kind: UrlKind::Video,
                id: MediaId::new(&caps[1]),
            });
        }
    }

    Err(EngineError::InvalidUrl(url.to_string()))
}
