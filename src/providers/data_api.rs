// Metadata provider - the platform's public data API
//
// Authoritative for title, uploader, view count and upload date, but never
// resolves playable stream URLs. The coordinator keeps this adapter's
// output as the metadata candidate and merges it into whichever adapter
// wins the stream race.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::models::{MediaDescriptor, MediaId, QualityLabel, StreamVariant};

use super::{Provider, ProviderError};

const NAME: &str = "data-api";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Quality list advertised for API-resolved items. The data API knows
/// nothing about actual renditions; this mirrors the origin's fixed set.
const API_QUALITIES: [QualityLabel; 4] = [
    QualityLabel::P1080,
    QualityLabel::P720,
    QualityLabel::P480,
    QualityLabel::P360,
];

pub struct DataApiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl DataApiProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Provider for DataApiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(
        &self,
        id: &MediaId,
        _requested: QualityLabel,
    ) -> Result<MediaDescriptor, ProviderError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ProviderError::permanent(NAME, "API key not configured"));
        };

        let response = self
            .client
            .get(VIDEOS_URL)
            .query(&[
                ("id", id.as_str()),
                ("part", "snippet,contentDetails,statistics"),
                ("key", key),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_http(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::FORBIDDEN && body.contains("quota") {
                return Err(ProviderError::quota(NAME, "daily API quota exhausted"));
            }
            return Err(ProviderError::from_status(NAME, status));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("bad JSON body: {e}")))?;

        let Some(item) = payload["items"].as_array().and_then(|items| items.first()) else {
            return Err(ProviderError::permanent(NAME, "video not found"));
        };

        Ok(parse_video_item(id, item))
    }
}

/// Parse one `items[]` entry of a `videos` response.
pub(crate) fn parse_video_item(id: &MediaId, item: &Value) -> MediaDescriptor {
    let snippet = &item["snippet"];

    MediaDescriptor {
        id: id.clone(),
        title: snippet["title"].as_str().unwrap_or("Unknown Title").to_string(),
        thumbnail_url: best_thumbnail(&snippet["thumbnails"])
            .unwrap_or_else(|| crate::models::thumbnail_fallback_url(id)),
        duration_seconds: item["contentDetails"]["duration"]
            .as_str()
            .and_then(parse_iso8601_duration),
        uploader: snippet["channelTitle"].as_str().unwrap_or("YouTube").to_string(),
        view_count: item["statistics"]["viewCount"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        upload_date: snippet["publishedAt"]
            .as_str()
            .map(|ts| ts.split('T').next().unwrap_or(ts).to_string()),
        description: snippet["description"].as_str().map(str::to_string),
        streams: API_QUALITIES
            .iter()
            .map(|q| StreamVariant::placeholder(*q))
            .collect(),
    }
}

/// Largest thumbnail the API offers: maxres, then high, then default.
pub(crate) fn best_thumbnail(thumbnails: &Value) -> Option<String> {
    ["maxres", "high", "default"]
        .iter()
        .find_map(|size| thumbnails[size]["url"].as_str())
        .map(str::to_string)
}

lazy_static! {
    static ref ISO8601_DURATION_RE: Regex =
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").unwrap();
}

/// Parse an ISO 8601 duration like `PT4M13S` into seconds.
pub(crate) fn parse_iso8601_duration(duration: &str) -> Option<u64> {
    let caps = ISO8601_DURATION_RE.captures(duration)?;
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    Some(part(1) * 3600 + part(2) * 60 + part(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_iso8601_durations() {
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT1H2M5S"), Some(3725));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT2H"), Some(7200));
        assert_eq!(parse_iso8601_duration("garbage"), None);
    }

    #[test]
    fn parses_video_item_without_stream_urls() {
        let id = MediaId::new("ABC123");
        let item = json!({
            "id": "ABC123",
            "snippet": {
                "title": "API Title",
                "channelTitle": "API Channel",
                "publishedAt": "2023-06-01T12:00:00Z",
                "description": "hello",
                "thumbnails": {
                    "default": { "url": "https://i.ytimg.com/default.jpg" },
                    "high": { "url": "https://i.ytimg.com/high.jpg" },
                    "maxres": { "url": "https://i.ytimg.com/maxres.jpg" }
                }
            },
            "contentDetails": { "duration": "PT4M13S" },
            "statistics": { "viewCount": "98765" }
        });

        let d = parse_video_item(&id, &item);
        assert_eq!(d.title, "API Title");
        assert_eq!(d.uploader, "API Channel");
        assert_eq!(d.upload_date.as_deref(), Some("2023-06-01"));
        assert_eq!(d.duration_seconds, Some(253));
        assert_eq!(d.view_count, 98765);
        assert_eq!(d.thumbnail_url, "https://i.ytimg.com/maxres.jpg");
        // Metadata only: fixed quality list, nothing downloadable.
        assert_eq!(d.streams.len(), 4);
        assert!(!d.has_playable_stream());
    }

    #[test]
    fn thumbnail_preference_falls_back() {
        let thumbs = json!({ "default": { "url": "https://i.ytimg.com/default.jpg" } });
        assert_eq!(
            best_thumbnail(&thumbs).as_deref(),
            Some("https://i.ytimg.com/default.jpg")
        );
        assert_eq!(best_thumbnail(&json!({})), None);
    }

    #[tokio::test]
    async fn missing_api_key_is_permanent() {
        let provider = DataApiProvider::new(reqwest::Client::new(), None);
        let err = provider
            .resolve(&MediaId::new("ABC123"), QualityLabel::Unknown)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Permanent { .. }));
    }
}
