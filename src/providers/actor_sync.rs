// Extraction service A - actor-style run-sync endpoint
//
// Accepts a watch URL plus a target container and answers with dataset
// items carrying either a direct `downloadUrl` or a `videoFiles` list to
// rank. The response schema drifts between actor versions, so parsing is
// defensive throughout.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{MediaDescriptor, MediaId, QualityLabel, StreamVariant};
use crate::quality::parse_loose_quality;

use super::{watch_url, Provider, ProviderError};

const NAME: &str = "actor-sync";
const ACTOR_URL: &str =
    "https://api.apify.com/v2/acts/streamers~youtube-video-downloader/run-sync-get-dataset-items";

pub struct SyncActorProvider {
    client: reqwest::Client,
    token: Option<String>,
}

impl SyncActorProvider {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl Provider for SyncActorProvider {
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
            "videos": [ { "url": watch_url(id) } ],
            "format": "mp4"
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
            let body = response.text().await.unwrap_or_default();
            if body.contains("insufficient credit") {
                return Err(ProviderError::quota(NAME, "account has insufficient credits"));
            }
            return Err(ProviderError::from_status(NAME, status));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("bad JSON body: {e}")))?;

        parse_sync_payload(id, requested, &payload)
    }
}

/// Parse the dataset items of a run-sync response.
pub(crate) fn parse_sync_payload(
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

    let mut streams = Vec::new();

    // Preferred shape: a single pre-selected rendition.
    if let Some(url) = item["downloadUrl"].as_str().filter(|u| u.starts_with("http")) {
        let quality = item["format"]
            .as_str()
            .map(parse_loose_quality)
            .filter(|q| *q != QualityLabel::Unknown)
            .unwrap_or(requested);
        streams.push(StreamVariant {
            quality_label: quality,
            media_url: Some(url.to_string()),
            approx_byte_length: item["fileSize"].as_u64(),
            container: "mp4".to_string(),
        });
    }

    // Alternate shape: the full rendition list.
    if streams.is_empty() {
        if let Some(files) = item["videoFiles"].as_array() {
            streams.extend(files.iter().filter_map(parse_video_file));
        }
    }

    // Last-ditch single-field shape.
    if streams.is_empty() {
        if let Some(url) = item["videoUrl"].as_str().filter(|u| u.starts_with("http")) {
            streams.push(StreamVariant {
                quality_label: requested,
                media_url: Some(url.to_string()),
                approx_byte_length: None,
                container: "mp4".to_string(),
            });
        }
    }

    if streams.is_empty() {
        return Err(ProviderError::transient(
            NAME,
            "no download URL in dataset item",
        ));
    }

    Ok(MediaDescriptor {
        id: id.clone(),
        title: item["title"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Video {id}")),
        thumbnail_url: item["thumbnailUrl"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| crate::models::thumbnail_fallback_url(id)),
        duration_seconds: item["durationSeconds"].as_u64(),
        uploader: item["channelName"].as_str().unwrap_or("YouTube").to_string(),
        view_count: item["viewCount"].as_u64().unwrap_or(0),
        upload_date: None,
        description: None,
        streams,
    })
}

fn parse_video_file(file: &Value) -> Option<StreamVariant> {
    let url = file["url"].as_str().filter(|u| u.starts_with("http"))?;

    Some(StreamVariant {
        quality_label: file["quality"]
            .as_str()
            .map(parse_loose_quality)
            .unwrap_or(QualityLabel::Unknown),
        media_url: Some(url.to_string()),
        approx_byte_length: file["contentLength"].as_u64(),
        container: file["format"].as_str().unwrap_or("mp4").to_string(),
    })
}
