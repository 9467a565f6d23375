// Primary provider - direct extraction against the platform's internal
// player endpoint
//
// Posts an Android-client innertube payload; that client still receives
// direct (uncphered) stream URLs for most videos. Only muxed formats
// (video+audio) are kept, matching what the engine can hand to a single
// byte-copy download.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{MediaDescriptor, MediaId, QualityLabel, StreamVariant};
use crate::quality::parse_loose_quality;

use super::{Provider, ProviderError};

const NAME: &str = "player-api";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const ANDROID_CLIENT_VERSION: &str = "19.09.37";

pub struct PlayerApiProvider {
    client: reqwest::Client,
}

impl PlayerApiProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request_body(id: &MediaId) -> Value {
        json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": ANDROID_CLIENT_VERSION,
                    "androidSdkVersion": 30,
                    "hl": "en"
                }
            },
            "videoId": id.as_str(),
            "contentCheckOk": true,
            "racyCheckOk": true
        })
    }
}

#[async_trait]
impl Provider for PlayerApiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(
        &self,
        id: &MediaId,
        _requested: QualityLabel,
    ) -> Result<MediaDescriptor, ProviderError> {
        let response = self
            .client
            .post(PLAYER_URL)
            .json(&Self::request_body(id))
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

        parse_player_response(id, &payload)
    }
}

/// Parse an innertube player response into a descriptor.
pub(crate) fn parse_player_response(
    id: &MediaId,
    payload: &Value,
) -> Result<MediaDescriptor, ProviderError> {
    let playability = payload["playabilityStatus"]["status"].as_str().unwrap_or("");
    if playability != "OK" {
        let reason = payload["playabilityStatus"]["reason"]
            .as_str()
            .unwrap_or(playability);
        // Unplayable is a fact about the video, not about us.
        return Err(ProviderError::permanent(
            NAME,
            format!("not playable: {reason}"),
        ));
    }

    let details = &payload["videoDetails"];
    let title = details["title"].as_str().unwrap_or("").to_string();
    if title.is_empty() {
        return Err(ProviderError::transient(NAME, "response carries no videoDetails"));
    }

    let thumbnail_url = details["thumbnail"]["thumbnails"]
        .as_array()
        .and_then(|t| t.last())
        .and_then(|t| t["url"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| crate::models::thumbnail_fallback_url(id));

    let streams = payload["streamingData"]["formats"]
        .as_array()
        .map(|formats| {
            formats
                .iter()
                .filter_map(parse_muxed_format)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(MediaDescriptor {
        id: id.clone(),
        title,
        thumbnail_url,
        duration_seconds: details["lengthSeconds"]
            .as_str()
            .and_then(|s| s.parse().ok()),
        uploader: details["author"].as_str().unwrap_or("YouTube").to_string(),
        view_count: details["viewCount"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        upload_date: None,
        description: details["shortDescription"].as_str().map(str::to_string),
        streams,
    })
}

/// One entry of `streamingData.formats`. Entries without a direct `url`
/// (cipher-protected) are skipped; the chain continues elsewhere.
fn parse_muxed_format(format: &Value) -> Option<StreamVariant> {
    let url = format["url"].as_str()?;
    if !url.starts_with("http") {
        return None;
    }

    let quality = format["qualityLabel"]
        .as_str()
        .map(parse_loose_quality)
        .unwrap_or(QualityLabel::Unknown);

    let container = format["mimeType"]
        .as_str()
        .and_then(|m| m.split(';').next())
        .and_then(|m| m.split('/').nth(1))
        .unwrap_or("mp4")
        .to_string();

    Some(StreamVariant {
        quality_label: quality,
        media_url: Some(url.to_string()),
        approx_byte_length: format["contentLength"].as_str().and_then(|s| s.parse().ok()),
        container,
    })
}
