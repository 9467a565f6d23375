// Resolution and download engine for social-video URLs
//
// Pipeline: classify the URL, resolve it through an ordered chain of
// provider adapters (with placeholder fallback), select a stream by
// quality, stream it into the filesystem-backed download store, and
// fan lifecycle events out over the bus. `api::Engine` ties it together
// for whatever transport sits in front.

pub mod api;
pub mod classifier;
pub mod config;
pub mod downloader;
pub mod errors;
pub mod events;
pub mod models;
pub mod playlist;
pub mod providers;
pub mod quality;
pub mod resolver;
pub mod storage;

pub use api::{
    DownloadFileRequest, DownloadFileResponse, DownloadLinkResponse, Engine, ErrorResponse,
    HealthResponse, InfoResponse,
};
pub use classifier::{classify, ClassifiedUrl, UrlKind};
pub use config::EngineConfig;
pub use errors::EngineError;
pub use events::{DownloadEvent, EventBus};
pub use models::{
    DownloadRecord, MediaDescriptor, MediaId, PlaylistDescriptor, QualityLabel, StreamVariant,
};
