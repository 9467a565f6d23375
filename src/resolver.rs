// Adapter chain with fallback logic

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::{MediaDescriptor, MediaId, QualityLabel};
use crate::providers::{
    DataApiProvider, PageScrapeProvider, PlayerApiProvider, Provider, SyncActorProvider,
    YtdlActorProvider,
};

pub struct MediaResolver {
    providers: Vec<Box<dyn Provider>>,
    adapter_timeout: Duration,
}

impl MediaResolver {
    /// Builds the standard chain: player API first (direct stream URLs),
    /// Data API next (metadata only), then the two hosted extraction
    /// actors, and the page scrape as the last resort.
    pub fn new(client: reqwest::Client, config: &EngineConfig) -> Self {
        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(PlayerApiProvider::new(client.clone())),
            Box::new(DataApiProvider::new(
                client.clone(),
                config.youtube_api_key.clone(),
            )),
            Box::new(SyncActorProvider::new(
                client.clone(),
                config.apify_token.clone(),
            )),
            Box::new(YtdlActorProvider::new(
                client.clone(),
                config.apify_token.clone(),
            )),
            Box::new(PageScrapeProvider::new(client)),
        ];
        Self {
            providers,
            adapter_timeout: config.adapter_timeout(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_providers(
        providers: Vec<Box<dyn Provider>>,
        adapter_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            adapter_timeout,
        }
    }

    /// Walks the chain in order. The first descriptor carrying a playable
    /// stream URL wins; descriptors without one (Data API, page scrape)
    /// are kept aside and their metadata overrides the winner's. When every
    /// adapter fails the metadata candidate is returned as-is, and when
    /// there is not even that, a placeholder descriptor is synthesized so
    /// the caller always has something to render.
    pub async fn resolve(&self, id: &MediaId, requested: QualityLabel) -> MediaDescriptor {
        let mut metadata_candidate: Option<MediaDescriptor> = None;

        for provider in &self.providers {
            debug!(provider = provider.name(), id = %id, "trying adapter");

            let outcome = timeout(self.adapter_timeout, provider.resolve(id, requested)).await;
            match outcome {
                Ok(Ok(descriptor)) => {
                    if descriptor.has_playable_stream() {
                        debug!(provider = provider.name(), "adapter yielded streams");
                        return merge_metadata(descriptor, metadata_candidate);
                    }
                    debug!(provider = provider.name(), "adapter yielded metadata only");
                    if metadata_candidate.is_none() {
                        metadata_candidate = Some(descriptor);
                    }
                }
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "adapter failed");
                }
                Err(_) => {
                    warn!(
                        provider = provider.name(),
                        timeout_secs = self.adapter_timeout.as_secs(),
                        "adapter timed out"
                    );
                }
            }
        }

        match metadata_candidate {
            Some(descriptor) => descriptor,
            None => {
                warn!(id = %id, "all adapters failed, synthesizing placeholder");
                MediaDescriptor::placeholder(id)
            }
        }
    }
}

/// Overlays an earlier metadata-only result onto the stream-bearing
/// winner. The metadata API is the more reliable source for descriptive
/// fields; streams always come from the winner.
fn merge_metadata(
    mut winner: MediaDescriptor,
    candidate: Option<MediaDescriptor>,
) -> MediaDescriptor {
    let Some(candidate) = candidate else {
        return winner;
    };

    if !candidate.title.is_empty() {
        winner.title = candidate.title;
    }
    if !candidate.uploader.is_empty() {
        winner.uploader = candidate.uploader;
    }
    if !candidate.thumbnail_url.is_empty() {
        winner.thumbnail_url = candidate.thumbnail_url;
    }
    if candidate.duration_seconds.is_some() {
        winner.duration_seconds = candidate.duration_seconds;
    }
    if candidate.upload_date.is_some() {
        winner.upload_date = candidate.upload_date;
    }
    if candidate.description.is_some() {
        winner.description = candidate.description;
    }
    if candidate.view_count > 0 {
        winner.view_count = candidate.view_count;
    }
    winner
}
