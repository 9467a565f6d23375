// Engine configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::EngineError;

/// Browser UA sent to upstreams that fingerprint plain HTTP clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for the engine and its provider chain.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory that backs the download record store.
    pub downloads_dir: PathBuf,
    /// YouTube Data API key (metadata adapter and playlist feed).
    pub youtube_api_key: Option<String>,
    /// Token for the external extraction services.
    pub apify_token: Option<String>,
    /// SOCKS5/HTTP proxy URL for all upstream calls.
    pub proxy: Option<String>,
    /// Per-HTTP-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Hard cap on one adapter's resolve call; expiry counts as transient.
    pub adapter_timeout_secs: u64,
    /// Maximum playlist member pages fetched before truncating.
    pub playlist_page_cap: u32,
    /// Bounded fan-out for playlist member resolution.
    pub playlist_concurrency: usize,
    /// Event bus ring capacity; laggards drop oldest events.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            downloads_dir: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tubevault"),
            youtube_api_key: std::env::var("YOUTUBE_API_KEY").ok(),
            apify_token: std::env::var("APIFY_API_KEY").ok(),
            proxy: None,
            request_timeout_secs: 20,
            adapter_timeout_secs: 30,
            playlist_page_cap: 10,
            playlist_concurrency: 4,
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn with_downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = dir.into();
        self
    }

    pub fn with_youtube_api_key(mut self, key: Option<String>) -> Self {
        self.youtube_api_key = key;
        self
    }

    pub fn with_apify_token(mut self, token: Option<String>) -> Self {
        self.apify_token = token;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    pub fn with_adapter_timeout(mut self, seconds: u64) -> Self {
        self.adapter_timeout_secs = seconds;
        self
    }

    pub fn with_playlist_page_cap(mut self, pages: u32) -> Self {
        self.playlist_page_cap = pages;
        self
    }

    pub fn with_playlist_concurrency(mut self, workers: usize) -> Self {
        self.playlist_concurrency = workers.max(1);
        self
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    /// Build the shared HTTP client (timeout, UA, optional proxy).
    pub fn http_client(&self) -> Result<reqwest::Client, EngineError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .user_agent(BROWSER_USER_AGENT);

        if let Some(proxy_url) = self.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| EngineError::Download(format!("invalid proxy `{proxy_url}`: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| EngineError::Download(format!("failed to build HTTP client: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = EngineConfig::default()
            .with_downloads_dir("/tmp/dl")
            .with_youtube_api_key(Some("key".into()))
            .with_adapter_timeout(5)
            .with_playlist_page_cap(2)
            .with_playlist_concurrency(0);

        assert_eq!(config.downloads_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(config.youtube_api_key.as_deref(), Some("key"));
        assert_eq!(config.adapter_timeout(), Duration::from_secs(5));
        assert_eq!(config.playlist_page_cap, 2);
        // Zero workers would deadlock the member stream.
        assert_eq!(config.playlist_concurrency, 1);
    }

    #[test]
    fn invalid_proxy_is_an_error() {
        let config = EngineConfig::default().with_proxy(Some("::not a proxy::".into()));
        assert!(config.http_client().is_err());
    }
}
