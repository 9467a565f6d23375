// Download orchestration
//
// Strict lifecycle per attempt: Started goes out immediately, before any
// resolution or byte transfer, then exactly one of Completed or Failed.
// A failed attempt never leaves a partial file behind; completion makes
// the file visible to the record listing atomically enough for a
// filesystem-backed store (the file only matters once fully written).

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::errors::EngineError;
use crate::events::{DownloadEvent, EventBus};
use crate::models::QualityLabel;
use crate::storage::DownloadStore;

pub type ByteStream = BoxStream<'static, Result<Bytes, EngineError>>;

/// Where download bytes come from. Production fetches over HTTP; tests
/// substitute canned or failing streams.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<ByteStream, EngineError>;
}

pub struct HttpMediaSource {
    client: reqwest::Client,
}

impl HttpMediaSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn open(&self, url: &str) -> Result<ByteStream, EngineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::Download(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Download(format!(
                "upstream returned HTTP {status}"
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| EngineError::Download(format!("read failed: {e}"))))
            .boxed())
    }
}

/// A finished download, ready to hand to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub filename: String,
    pub file_path: std::path::PathBuf,
    pub byte_size: u64,
}

pub struct DownloadOrchestrator<S> {
    store: DownloadStore,
    source: S,
    events: EventBus,
}

impl<S: MediaSource> DownloadOrchestrator<S> {
    pub fn new(store: DownloadStore, source: S, events: EventBus) -> Self {
        Self {
            store,
            source,
            events,
        }
    }

    /// Runs one download attempt end to end. `Started` is emitted before
    /// `prepare` is even polled (the optimistic signal - a slow adapter
    /// chain must not delay it), then `prepare` picks the quality and
    /// stream URL, the bytes are copied, and exactly one of `Completed` /
    /// `Failed` closes the attempt. Any mid-copy error deletes the
    /// partial file before `Failed` goes out.
    pub async fn begin<F, Fut>(&self, title: &str, prepare: F) -> Result<DownloadOutcome, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(QualityLabel, String), EngineError>>,
    {
        self.events.emit(DownloadEvent::Started {
            title: title.to_string(),
        });

        let attempt = async {
            let (quality, media_url) = prepare().await?;
            self.run(title, quality, &media_url).await
        };

        match attempt.await {
            Ok(outcome) => {
                info!(filename = %outcome.filename, bytes = outcome.byte_size, "download complete");
                self.events.emit(DownloadEvent::Completed {
                    title: title.to_string(),
                });
                Ok(outcome)
            }
            Err(e) => {
                error!(title, error = %e, "download failed");
                self.events.emit(DownloadEvent::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        title: &str,
        quality: QualityLabel,
        media_url: &str,
    ) -> Result<DownloadOutcome, EngineError> {
        let (path, filename) = self.store.reserve_path(title, quality)?;
        let mut stream = self.source.open(media_url).await?;

        let mut file = fs::File::create(&path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    remove_partial(&path).await;
                    return Err(e);
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                remove_partial(&path).await;
                return Err(e.into());
            }
            written += chunk.len() as u64;
        }

        file.flush().await?;

        Ok(DownloadOutcome {
            filename,
            file_path: path,
            byte_size: written,
        })
    }
}

async fn remove_partial(path: &std::path::Path) {
    if let Err(e) = fs::remove_file(path).await {
        error!(path = %path.display(), error = %e, "failed to remove partial file");
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    struct FixedSource {
        chunks: Vec<Result<Bytes, String>>,
    }

    #[async_trait]
    impl MediaSource for FixedSource {
        async fn open(&self, _url: &str) -> Result<ByteStream, EngineError> {
            let items: Vec<Result<Bytes, EngineError>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(bytes) => Ok(bytes.clone()),
                    Err(msg) => Err(EngineError::Download(msg.clone())),
                })
                .collect();
            Ok(stream::iter(items).boxed())
        }
    }

    fn orchestrator(
        dir: &std::path::Path,
        chunks: Vec<Result<Bytes, String>>,
    ) -> DownloadOrchestrator<FixedSource> {
        DownloadOrchestrator::new(
            DownloadStore::new(dir),
            FixedSource { chunks },
            EventBus::new(16),
        )
    }

    #[tokio::test]
    async fn successful_download_emits_started_then_completed() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            dir.path(),
            vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))],
        );
        let mut rx = orch.events.subscribe();

        let outcome = orch
            .begin("Greeting", || async {
                Ok((QualityLabel::P720, "https://cdn.example/v.mp4".to_string()))
            })
            .await
            .unwrap();

        assert_eq!(outcome.byte_size, 11);
        assert_eq!(std::fs::read(&outcome.file_path).unwrap(), b"hello world");

        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Started { .. }));
        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Completed { .. }));

        // The finished file shows up in the record listing.
        let records = DownloadStore::new(dir.path()).list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, outcome.filename);
        assert_eq!(records[0].byte_size, 11);
    }

    #[tokio::test]
    async fn mid_stream_failure_cleans_partial_and_emits_failed() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            dir.path(),
            vec![
                Ok(Bytes::from_static(b"partial")),
                Err("connection reset".to_string()),
            ],
        );
        let mut rx = orch.events.subscribe();

        let err = orch
            .begin("Broken", || async {
                Ok((QualityLabel::P480, "https://cdn.example/v.mp4".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Download(_)));

        // No partial file survives.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert!(leftovers.is_empty());

        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Started { .. }));
        match rx.recv().await.unwrap() {
            DownloadEvent::Failed { message } => assert!(message.contains("connection reset")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn source_open_failure_emits_failed_without_a_file() {
        struct RefusingSource;

        #[async_trait]
        impl MediaSource for RefusingSource {
            async fn open(&self, _url: &str) -> Result<ByteStream, EngineError> {
                Err(EngineError::Download("403 from CDN".to_string()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let orch = DownloadOrchestrator::new(
            DownloadStore::new(dir.path()),
            RefusingSource,
            EventBus::new(16),
        );
        let mut rx = orch.events.subscribe();

        orch.begin("Refused", || async {
            Ok((QualityLabel::P360, "https://cdn.example/v.mp4".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Started { .. }));
        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Failed { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn started_is_observable_before_resolution_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), vec![Ok(Bytes::from_static(b"x"))]);
        let mut early = orch.events.subscribe();
        let mut full = orch.events.subscribe();

        orch.begin("Slow", move || async move {
            // Resolution has not produced anything yet; Started must
            // already be on the bus.
            assert!(matches!(
                early.try_recv().unwrap(),
                DownloadEvent::Started { .. }
            ));
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok((QualityLabel::P720, "https://cdn.example/v.mp4".to_string()))
        })
        .await
        .unwrap();

        assert!(matches!(full.recv().await.unwrap(), DownloadEvent::Started { .. }));
        assert!(matches!(full.recv().await.unwrap(), DownloadEvent::Completed { .. }));
    }

    #[tokio::test]
    async fn failed_preparation_still_emits_started_then_failed() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), vec![]);
        let mut rx = orch.events.subscribe();

        orch.begin("Unmatchable", || async {
            Err(EngineError::NoMatchingQuality {
                requested: "720p".to_string(),
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Started { .. }));
        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Failed { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
