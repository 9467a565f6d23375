// Page-scrape fallback - last adapter in the chain
//
// Fetches the public watch page with a browser UA and regex-extracts the
// title. Never yields a real stream URL; its value is keeping the result
// renderable (title + synthesized thumbnail + fixed quality list) when
// every real extractor is down.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{
    thumbnail_fallback_url, MediaDescriptor, MediaId, QualityLabel, StreamVariant,
    PLACEHOLDER_QUALITIES,
};

use super::{watch_url, Provider, ProviderError};

const NAME: &str = "page-scrape";

lazy_static! {
    static ref TITLE_RE: Regex = Regex::new(r"<title[^>]*>([^<]+)</title>").unwrap();
}

pub struct PageScrapeProvider {
    client: reqwest::Client,
}

impl PageScrapeProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Provider for PageScrapeProvider {
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
            .get(watch_url(id))
            .send()
            .await
            .map_err(|e| ProviderError::from_http(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(NAME, status));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("body read failed: {e}")))?;

        Ok(descriptor_from_page(id, &html))
    }
}

pub(crate) fn descriptor_from_page(id: &MediaId, html: &str) -> MediaDescriptor {
    MediaDescriptor {
        id: id.clone(),
        title: extract_title(html).unwrap_or_else(|| "Unknown Title".to_string()),
        thumbnail_url: thumbnail_fallback_url(id),
        duration_seconds: None,
        uploader: "YouTube".to_string(),
        view_count: 0,
        upload_date: None,
        description: Some("Video information extracted from the watch page.".to_string()),
        streams: PLACEHOLDER_QUALITIES
            .iter()
            .map(|q| StreamVariant::placeholder(*q))
            .collect(),
    }
}

fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = raw
        .trim()
        .trim_end_matches(" - YouTube")
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}
