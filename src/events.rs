// Download lifecycle events and their broadcast bus
//
// The bus replaces the origin's process-wide socket broadcaster with an
// injected publish/subscribe handle. Delivery is fire-and-forget: only
// subscribers connected at emission time see an event, there is no replay.

use serde::Serialize;
use tokio::sync::broadcast;

/// Lifecycle event for one download attempt. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload")]
pub enum DownloadEvent {
    Started { title: String },
    Completed { title: String },
    Failed { message: String },
}

impl DownloadEvent {
    /// Wire name used on the external event channel.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "VIDEO_STARTED",
            Self::Completed { .. } => "VIDEO_DOWNLOADED",
            Self::Failed { .. } => "VIDEO_ERROR",
        }
    }
}

/// Process-wide fan-out of lifecycle events to all connected observers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DownloadEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscriber lifetime is the receiver's lifetime; late subscribers
    /// miss prior events.
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.tx.subscribe()
    }

    /// Emit to whoever is listening right now. Having no subscribers is
    /// not an error.
    pub fn emit(&self, event: DownloadEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_channel_contract() {
        assert_eq!(DownloadEvent::Started { title: "t".into() }.name(), "VIDEO_STARTED");
        assert_eq!(DownloadEvent::Completed { title: "t".into() }.name(), "VIDEO_DOWNLOADED");
        assert_eq!(DownloadEvent::Failed { message: "m".into() }.name(), "VIDEO_ERROR");
    }

    #[tokio::test]
    async fn all_subscribers_receive_each_emission() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(DownloadEvent::Started { title: "T".into() });

        assert_eq!(a.recv().await.unwrap(), DownloadEvent::Started { title: "T".into() });
        assert_eq!(b.recv().await.unwrap(), DownloadEvent::Started { title: "T".into() });
    }

    #[tokio::test]
    async fn late_subscriber_misses_prior_events() {
        let bus = EventBus::new(8);
        // Keep one receiver alive so emissions are not dropped outright.
        let _keepalive = bus.subscribe();

        bus.emit(DownloadEvent::Started { title: "early".into() });

        let mut late = bus.subscribe();
        bus.emit(DownloadEvent::Completed { title: "late".into() });

        assert_eq!(
            late.recv().await.unwrap(),
            DownloadEvent::Completed { title: "late".into() }
        );
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn emitting_without_subscribers_is_fine() {
        let bus = EventBus::new(8);
        bus.emit(DownloadEvent::Failed { message: "nobody listening".into() });
    }
}
