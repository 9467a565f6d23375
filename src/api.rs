// Boundary facade
//
// Typed request/response shapes for whatever transport fronts the engine.
// Wire names are camelCase and stable; a transport layer serializes these
// structs verbatim. Every failure path maps to `ErrorResponse` - nothing
// untyped escapes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::classifier::{classify, UrlKind};
use crate::config::EngineConfig;
use crate::downloader::{DownloadOrchestrator, HttpMediaSource};
use crate::errors::EngineError;
use crate::events::{DownloadEvent, EventBus};
use crate::models::{DownloadRecord, MediaDescriptor, MediaId, PlaylistDescriptor, QualityLabel};
use crate::playlist::{DataApiFeed, PlaylistExpander};
use crate::quality::{parse_loose_quality, select_stream};
use crate::resolver::MediaResolver;
use crate::storage::{sanitize_title, DownloadStore};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: UrlKind,
    pub videos: Vec<MediaDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist: Option<PlaylistDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLinkResponse {
    pub success: bool,
    pub download_url: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    pub is_direct_download: bool,
    pub quality: QualityLabel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFileRequest {
    pub media_id: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFileResponse {
    pub success: bool,
    pub filename: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl From<&EngineError> for ErrorResponse {
    fn from(e: &EngineError) -> Self {
        Self {
            success: false,
            error: e.to_string(),
        }
    }
}

/// The engine: owns the adapter chain, playlist expansion, quality
/// selection, the download pipeline and the record store behind one
/// transport-agnostic surface.
pub struct Engine {
    resolver: MediaResolver,
    feed: DataApiFeed,
    expander: PlaylistExpander,
    orchestrator: DownloadOrchestrator<HttpMediaSource>,
    store: DownloadStore,
    events: EventBus,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = config.http_client()?;
        let events = EventBus::new(config.event_capacity);
        let store = DownloadStore::new(config.downloads_dir.clone());

        Ok(Self {
            resolver: MediaResolver::new(client.clone(), &config),
            feed: DataApiFeed::new(
                client.clone(),
                config.youtube_api_key.clone(),
                config.playlist_page_cap as usize,
            ),
            expander: PlaylistExpander::new(&config),
            orchestrator: DownloadOrchestrator::new(
                store.clone(),
                HttpMediaSource::new(client),
                events.clone(),
            ),
            store,
            events,
        })
    }

    /// Classify a URL and resolve it - one descriptor for a video, the
    /// expanded member list for a playlist.
    pub async fn info(&self, url: &str) -> Result<InfoResponse, EngineError> {
        let classified = classify(url)?;
        match classified.kind {
            UrlKind::Video => {
                let descriptor = self
                    .resolver
                    .resolve(&classified.id, QualityLabel::Unknown)
                    .await;
                info!(id = %classified.id, title = %descriptor.title, "video resolved");
                Ok(InfoResponse {
                    success: true,
                    kind: UrlKind::Video,
                    videos: vec![descriptor],
                    playlist: None,
                })
            }
            UrlKind::Playlist => {
                let playlist = self
                    .expander
                    .expand(
                        &self.feed,
                        &self.resolver,
                        &classified.id,
                        QualityLabel::Unknown,
                    )
                    .await?;
                info!(id = %classified.id, members = playlist.members.len(), "playlist resolved");
                Ok(InfoResponse {
                    success: true,
                    kind: UrlKind::Playlist,
                    videos: playlist.members.clone(),
                    playlist: Some(playlist),
                })
            }
        }
    }

    /// Resolve a direct download URL for one item at the requested
    /// quality. Fails when no adapter produced a real stream URL; a link
    /// that cannot be followed is worse than an error.
    pub async fn download_link(
        &self,
        media_id: &str,
        quality: &str,
    ) -> Result<DownloadLinkResponse, EngineError> {
        let id = MediaId::new(media_id);
        let requested = parse_loose_quality(quality);
        let descriptor = self.resolver.resolve(&id, requested).await;
        let stream = select_stream(&descriptor, requested)?;

        let Some(download_url) = stream.media_url.clone() else {
            return Err(EngineError::Download(
                "no direct stream URL resolved".to_string(),
            ));
        };

        Ok(DownloadLinkResponse {
            success: true,
            download_url,
            filename: format!(
                "{}_{}.mp4",
                sanitize_title(&descriptor.title),
                stream.quality_label
            ),
            filesize: stream.approx_byte_length,
            is_direct_download: true,
            quality: stream.quality_label,
        })
    }

    /// Resolve, select and stream one item into the download store.
    /// `Started` goes out before the resolve even begins; the response
    /// comes after the terminal state. A request that dies before the
    /// transfer (no matching quality, no stream URL) still gets the
    /// `Started` / `Failed` event pair.
    pub async fn download_file(
        &self,
        request: DownloadFileRequest,
    ) -> Result<DownloadFileResponse, EngineError> {
        let id = MediaId::new(request.media_id);
        let requested = parse_loose_quality(&request.quality);

        let title = if request.title.is_empty() {
            format!("Video {id}")
        } else {
            request.title.clone()
        };

        let outcome = self
            .orchestrator
            .begin(&title, || async {
                let descriptor = self.resolver.resolve(&id, requested).await;
                let stream = select_stream(&descriptor, requested)?;
                let media_url = stream.media_url.clone().ok_or_else(|| {
                    EngineError::Download("no direct stream URL resolved".to_string())
                })?;
                Ok((stream.quality_label, media_url))
            })
            .await?;

        Ok(DownloadFileResponse {
            success: true,
            filename: outcome.filename,
            file_path: outcome.file_path.display().to_string(),
        })
    }

    pub fn list_downloads(&self) -> Result<Vec<DownloadRecord>, EngineError> {
        self.store.list()
    }

    /// Filesystem path for a stored download, for the transport to serve.
    pub fn download_path(&self, filename: &str) -> Result<PathBuf, EngineError> {
        self.store.path_for(filename)
    }

    pub fn delete_download(&self, filename: &str) -> Result<(), EngineError> {
        self.store.delete(filename)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.events.subscribe()
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok",
            message: "engine is running",
        }
    }
}
