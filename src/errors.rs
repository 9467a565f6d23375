// Error taxonomy for the engine

use thiserror::Error;

use crate::providers::ProviderError;

/// Top-level engine errors surfaced to the boundary.
///
/// Provider failures are normally recovered by chain fallthrough and never
/// reach the caller; a `Provider` value here means a hard precondition
/// failed (e.g. the playlist metadata fetch itself).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no stream matches requested quality `{requested}`")]
    NoMatchingQuality { requested: String },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("upstream quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("download failed: {0}")]
    Download(String),
}

impl EngineError {
    /// Whether the failure is the caller's fault (a 4xx-equivalent at the
    /// transport layer) rather than an upstream or storage problem.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::NotFound(_) | Self::NoMatchingQuality { .. }
        )
    }
}
