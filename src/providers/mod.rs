// Provider adapters - one strategy per upstream extraction service
//
// Every adapter satisfies the same capability trait so the coordinator
// only knows "try next, merge winner". Adapters classify their own
// failures; nothing here panics on upstream misbehavior.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{MediaDescriptor, MediaId, QualityLabel};

pub mod actor_sync;
pub mod actor_ytdl;
pub mod data_api;
pub mod page_scrape;
pub mod player;

pub use actor_sync::SyncActorProvider;
pub(crate) use data_api::best_thumbnail;
pub use actor_ytdl::YtdlActorProvider;
pub use data_api::DataApiProvider;
pub use page_scrape::PageScrapeProvider;
pub use player::PlayerApiProvider;

/// Failure classification drives logging and, for quota errors, surfaces a
/// distinct cause. All kinds fall through the chain - no single adapter is
/// authoritative.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{provider}: transient failure: {message}")]
    Transient {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: permanent failure: {message}")]
    Permanent {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: quota exceeded: {message}")]
    QuotaExceeded {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn transient(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Transient {
            provider,
            message: message.into(),
        }
    }

    pub fn permanent(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Permanent {
            provider,
            message: message.into(),
        }
    }

    pub fn quota(provider: &'static str, message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            provider,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::QuotaExceeded { .. })
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::Transient { provider, .. }
            | Self::Permanent { provider, .. }
            | Self::QuotaExceeded { provider, .. } => provider,
        }
    }

    /// Classify a reqwest failure: timeouts and connection problems are
    /// transient, everything else is unknown enough to retry elsewhere.
    pub fn from_http(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::transient(provider, format!("network failure: {err}"))
        } else {
            Self::transient(provider, err.to_string())
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(provider: &'static str, status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::quota(provider, format!("HTTP {status}"))
        } else if status.is_client_error() {
            Self::permanent(provider, format!("HTTP {status}"))
        } else {
            Self::transient(provider, format!("HTTP {status}"))
        }
    }
}

/// One strategy for turning an id into a `MediaDescriptor`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of the adapter (for logging).
    fn name(&self) -> &'static str;

    /// Resolve canonical metadata and quality-tagged streams for one id.
    ///
    /// `requested` is a hint for services that extract a single rendition;
    /// `QualityLabel::Unknown` means no preference.
    async fn resolve(
        &self,
        id: &MediaId,
        requested: QualityLabel,
    ) -> Result<MediaDescriptor, ProviderError>;
}

/// Canonical watch-page URL for an id.
pub(crate) fn watch_url(id: &MediaId) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}
