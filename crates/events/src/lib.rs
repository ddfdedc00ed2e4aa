//! Change-notification primitives for the path store.
//!
//! Every mutation against the store publishes a [`ChangeEvent`] on an
//! [`EventBus`]; subscriptions (live comment threads, watch streams) are
//! driven from the bus rather than polling.

use tokio::sync::broadcast;

/// What kind of mutation produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Full write of the value at the path.
    Set,
    /// Field-wise merge into the value at the path.
    Merge,
    /// Removal of the value at the path.
    Delete,
}

/// A single mutation, addressed by its slash-delimited store path.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Whether a watcher of `watched` is affected by this event: writes at
    /// or below the watched path change its snapshot, and so do writes to
    /// any of its ancestors (a parent `set` or `delete` replaces the whole
    /// subtree).
    pub fn touches(&self, watched: &str) -> bool {
        is_prefix(watched, &self.path) || is_prefix(&self.path, watched)
    }
}

fn is_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Broadcast fan-out of store mutations.
///
/// Publishing never blocks; events sent while no subscriber is listening
/// are dropped, which is fine because subscribers re-read the snapshot on
/// every event rather than replaying a log.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(path = %event.path, kind = ?event.kind, "store change");
        // A send error only means there are no subscribers right now.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
