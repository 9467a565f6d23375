// Extraction service B - alternate actor with a different request schema
//
// Only consulted when service A fails. Takes `videoUrls` instead of
// `videos`, and reports renditions under `videoFiles[0].url`,
// `downloadUrl` or plain `url` depending on actor version.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{MediaDescriptor, MediaId, QualityLabel, StreamVariant};

use super::{watch_url, Provider, ProviderError};

const NAME: &str = "actor-ytdl";
const ACTOR_URL: &str =
    "https://api.apify.com/v2/acts/drobnikj~youtube-dl-actor/run-sync-get-dataset-items";

pub struct YtdlActorProvider {
    client: reqwest::Client,
    token: Option<String>,
}

impl YtdlActorProvider {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl Provider for YtdlActorProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(
        &self,
        id: &MediaId,
        requested: QualityLabel,
    ) -> Result<MediaDescriptor, ProviderError> {
        let Some(token) = self.token.as_deref() else {
            return Err(ProviderError::permanent(NAME, "extraction token not configured"));
        };

        let body = json!({
            "videoUrls": [ watch_url(id) ],
            "downloadSubtitles": false,
            "convertToMp3": false,
            "subtitlesLanguage": "en"
        });

        let response = self
            .client
            .post(ACTOR_URL)
            .query(&[("token", token)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_http(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(NAME, status));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("bad JSON body: {e}")))?;

        parse_ytdl_payload(id, requested, &payload)
    }
}

/// Parse the alternate actor's dataset items.
pub(crate) fn parse_ytdl_payload(
    id: &MediaId,
    requested: QualityLabel,
    payload: &Value,
) -> Result<MediaDescriptor, ProviderError> {
    let item = match payload {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| ProviderError::transient(NAME, "empty dataset"))?,
        other => other,
    };

    let url = item["videoFiles"]
        .as_array()
        .and_then(|files| files.first())
        .and_then(|f| f["url"].as_str().or_else(|| f["downloadUrl"].as_str()))
        .or_else(|| item["downloadUrl"].as_str())
        .or_else(|| item["url"].as_str())
        .filter(|u| u.starts_with("http"));

    let Some(url) = url else {
        return Err(ProviderError::transient(NAME, "no download URL in dataset item"));
    };

    let byte_length = item["fileSize"].as_u64().or_else(|| item["contentLength"].as_u64());

    Ok(MediaDescriptor {
        id: id.clone(),
        title: item["title"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Video {id}")),
        thumbnail_url: crate::models::thumbnail_fallback_url(id),
        duration_seconds: None,
        uploader: item["uploader"].as_str().unwrap_or("YouTube").to_string(),
        view_count: 0,
        upload_date: None,
        description: None,
        // This schema does not tag renditions; trust the requested label.
        streams: vec![StreamVariant {
            quality_label: requested,
            media_url: Some(url.to_string()),
            approx_byte_length: byte_length,
            container: "mp4".to_string(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_video_files_over_flat_fields() {
        let id = MediaId::new("ABC123");
        let payload = json!([{
            "title": "Alt Title",
            "videoFiles": [ { "url": "https://cdn.example.com/vf.mp4" } ],
            "downloadUrl": "https://cdn.example.com/flat.mp4",
            "fileSize": 1000u64
        }]);

        let d = parse_ytdl_payload(&id, QualityLabel::P480, &payload).unwrap();
        assert_eq!(d.streams.len(), 1);
        assert_eq!(d.streams[0].media_url.as_deref(), Some("https://cdn.example.com/vf.mp4"));
        assert_eq!(d.streams[0].quality_label, QualityLabel::P480);
        assert_eq!(d.streams[0].approx_byte_length, Some(1000));
    }

    #[test]
    fn falls_back_through_url_fields() {
        let id = MediaId::new("ABC123");

        let flat = json!([{ "downloadUrl": "https://cdn.example.com/flat.mp4" }]);
        let d = parse_ytdl_payload(&id, QualityLabel::Unknown, &flat).unwrap();
        assert_eq!(d.streams[0].media_url.as_deref(), Some("https://cdn.example.com/flat.mp4"));

        let bare = json!([{ "url": "https://cdn.example.com/bare.mp4" }]);
        let d = parse_ytdl_payload(&id, QualityLabel::Unknown, &bare).unwrap();
        assert_eq!(d.streams[0].media_url.as_deref(), Some("https://cdn.example.com/bare.mp4"));
    }

    #[test]
    fn rejects_non_http_and_missing_urls() {
        let id = MediaId::new("ABC123");
        assert!(parse_ytdl_payload(&id, QualityLabel::Unknown, &json!([{}])).is_err());
        assert!(
            parse_ytdl_payload(&id, QualityLabel::Unknown, &json!([{ "url": "file:///x" }]))
                .is_err()
        );
    }
}
