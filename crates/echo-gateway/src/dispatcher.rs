use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use echo_types::events::GatewayEvent;

/// An event serialized once at publish time and shared by every receiver.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    /// Set for events scoped to one group chat.
    pub group_id: Option<Uuid>,
    pub json: Arc<str>,
}

/// Fans API events out to all connected gateway clients.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every connection holds a receiver on this channel
    broadcast_tx: broadcast::Sender<BroadcastMessage>,

    /// Number of identified connections
    connections: AtomicUsize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event. Having no listeners is not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Dropping unserializable gateway event: {}", e);
                return;
            }
        };
        let _ = self.inner.broadcast_tx.send(BroadcastMessage {
            group_id: event.group_id(),
            json: json.into(),
        });
    }

    pub fn connection_opened(&self) {
        self.inner.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.inner.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }
}
