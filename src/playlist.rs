// Playlist expansion
//
// Membership comes from the data API (the only adapter that can list a
// playlist); each member is then resolved through the full adapter chain
// independently, a bounded number at a time. A member that fails still
// comes back as a placeholder descriptor, so one broken video never sinks
// the playlist.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{MediaDescriptor, MediaId, PlaylistDescriptor, QualityLabel};
use crate::providers::ProviderError;
use crate::resolver::MediaResolver;

const NAME: &str = "playlist-feed";
const PLAYLISTS_URL: &str = "https://www.googleapis.com/youtube/v3/playlists";
const ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";
const PAGE_SIZE: u32 = 50;

/// Playlist metadata and member ids, before any member is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistListing {
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub uploader: String,
    pub member_ids: Vec<MediaId>,
}

/// Source of playlist membership. The production implementation is the
/// data API; tests substitute a canned listing.
#[async_trait]
pub trait PlaylistFeed: Send + Sync {
    async fn fetch(&self, id: &MediaId) -> Result<PlaylistListing, ProviderError>;
}

pub struct DataApiFeed {
    client: reqwest::Client,
    api_key: Option<String>,
    page_cap: usize,
}

impl DataApiFeed {
    pub fn new(client: reqwest::Client, api_key: Option<String>, page_cap: usize) -> Self {
        Self {
            client,
            api_key,
            page_cap,
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, ProviderError> {
        let response = self
            .client
            .get(url)
            .query(query)
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

        response
            .json()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("bad JSON body: {e}")))
    }
}

#[async_trait]
impl PlaylistFeed for DataApiFeed {
    async fn fetch(&self, id: &MediaId) -> Result<PlaylistListing, ProviderError> {
        let Some(key) = self.api_key.as_deref().map(str::to_string) else {
            return Err(ProviderError::permanent(NAME, "API key not configured"));
        };

        let meta = self
            .get_json(
                PLAYLISTS_URL,
                &[("id", id.as_str()), ("part", "snippet"), ("key", key.as_str())],
            )
            .await?;
        let Some(item) = meta["items"].as_array().and_then(|items| items.first()) else {
            return Err(ProviderError::permanent(NAME, "playlist not found"));
        };
        let mut listing = parse_playlist_snippet(item);

        let page_size = PAGE_SIZE.to_string();
        let mut page_token: Option<String> = None;
        for page in 0..self.page_cap {
            let mut query = vec![
                ("playlistId", id.as_str()),
                ("part", "contentDetails"),
                ("maxResults", page_size.as_str()),
                ("key", key.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let payload = self.get_json(ITEMS_URL, &query).await?;
            let (ids, next) = parse_items_page(&payload);
            debug!(page, count = ids.len(), "playlist page fetched");
            listing.member_ids.extend(ids);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(listing)
    }
}

/// Parse one `items[]` entry of a `playlists` response.
pub(crate) fn parse_playlist_snippet(item: &Value) -> PlaylistListing {
    let snippet = &item["snippet"];
    PlaylistListing {
        title: snippet["title"].as_str().unwrap_or("Unknown Playlist").to_string(),
        description: snippet["description"].as_str().unwrap_or_default().to_string(),
        thumbnail_url: crate::providers::best_thumbnail(&snippet["thumbnails"])
            .unwrap_or_default(),
        uploader: snippet["channelTitle"].as_str().unwrap_or("YouTube").to_string(),
        member_ids: Vec::new(),
    }
}

/// Member ids and continuation token from one `playlistItems` page.
pub(crate) fn parse_items_page(payload: &Value) -> (Vec<MediaId>, Option<String>) {
    let ids = payload["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["contentDetails"]["videoId"].as_str())
                .map(MediaId::new)
                .collect()
        })
        .unwrap_or_default();
    let next = payload["nextPageToken"].as_str().map(str::to_string);
    (ids, next)
}

pub struct PlaylistExpander {
    concurrency: usize,
}

impl PlaylistExpander {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            concurrency: config.playlist_concurrency.max(1),
        }
    }

    /// Resolves every member through the adapter chain, at most
    /// `concurrency` in flight, keeping the playlist's listing order.
    pub async fn expand(
        &self,
        feed: &dyn PlaylistFeed,
        resolver: &MediaResolver,
        id: &MediaId,
        requested: QualityLabel,
    ) -> Result<PlaylistDescriptor, ProviderError> {
        let listing = feed.fetch(id).await?;
        debug!(id = %id, members = listing.member_ids.len(), "expanding playlist");

        let members: Vec<MediaDescriptor> = stream::iter(listing.member_ids)
            .map(|member_id| async move { resolver.resolve(&member_id, requested).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        Ok(PlaylistDescriptor {
            id: id.clone(),
            title: listing.title,
            description: listing.description,
            thumbnail_url: listing.thumbnail_url,
            uploader: listing.uploader,
            members,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::models::StreamVariant;
    use crate::providers::Provider;

    #[test]
    fn items_page_parses_ids_and_token() {
        let payload = json!({
            "items": [
                {"contentDetails": {"videoId": "aaaaaaaaaaa"}},
                {"contentDetails": {"videoId": "bbbbbbbbbbb"}},
                {"contentDetails": {}},
            ],
            "nextPageToken": "CAoQAA",
        });

        let (ids, next) = parse_items_page(&payload);
        assert_eq!(ids, vec![MediaId::new("aaaaaaaaaaa"), MediaId::new("bbbbbbbbbbb")]);
        assert_eq!(next.as_deref(), Some("CAoQAA"));
    }

    #[test]
    fn last_page_has_no_token() {
        let (ids, next) = parse_items_page(&json!({"items": []}));
        assert!(ids.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn playlist_snippet_fills_defaults() {
        let listing = parse_playlist_snippet(&json!({
            "snippet": {
                "title": "Mix",
                "channelTitle": "Someone",
                "thumbnails": {"high": {"url": "https://i.ytimg.com/p/hq.jpg"}},
            }
        }));
        assert_eq!(listing.title, "Mix");
        assert_eq!(listing.uploader, "Someone");
        assert_eq!(listing.thumbnail_url, "https://i.ytimg.com/p/hq.jpg");
        assert_eq!(listing.description, "");
    }

    struct FixedFeed {
        listing: PlaylistListing,
    }

    #[async_trait]
    impl PlaylistFeed for FixedFeed {
        async fn fetch(&self, _id: &MediaId) -> Result<PlaylistListing, ProviderError> {
            Ok(self.listing.clone())
        }
    }

    /// Succeeds for every id except the one it is told to reject.
    struct SelectiveProvider {
        broken_id: MediaId,
    }

    #[async_trait]
    impl Provider for SelectiveProvider {
        fn name(&self) -> &'static str {
            "selective"
        }

        async fn resolve(
            &self,
            id: &MediaId,
            _requested: QualityLabel,
        ) -> Result<MediaDescriptor, ProviderError> {
            if *id == self.broken_id {
                return Err(ProviderError::transient("selective", "boom"));
            }
            Ok(MediaDescriptor {
                title: format!("Video {id}"),
                streams: vec![StreamVariant {
                    quality_label: QualityLabel::P720,
                    media_url: Some(format!("https://cdn.example/{id}.mp4")),
                    approx_byte_length: None,
                    container: "mp4".to_string(),
                }],
                ..MediaDescriptor::placeholder(id)
            })
        }
    }

    #[tokio::test]
    async fn broken_member_becomes_placeholder_in_order() {
        let ids = ["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"];
        let feed = FixedFeed {
            listing: PlaylistListing {
                title: "Mix".to_string(),
                description: String::new(),
                thumbnail_url: String::new(),
                uploader: "Someone".to_string(),
                member_ids: ids.iter().map(|s| MediaId::new(*s)).collect(),
            },
        };
        let resolver = MediaResolver::with_providers(
            vec![Box::new(SelectiveProvider {
                broken_id: MediaId::new("bbbbbbbbbbb"),
            })],
            Duration::from_secs(5),
        );
        let expander = PlaylistExpander { concurrency: 2 };

        let playlist = expander
            .expand(&feed, &resolver, &MediaId::new("PLxyz"), QualityLabel::Unknown)
            .await
            .unwrap();

        assert_eq!(playlist.members.len(), 3);
        assert_eq!(playlist.members[0].title, "Video aaaaaaaaaaa");
        assert_eq!(playlist.members[1].title, "Video (unavailable)");
        assert!(!playlist.members[1].has_playable_stream());
        assert_eq!(playlist.members[2].title, "Video ccccccccccc");
    }
}
