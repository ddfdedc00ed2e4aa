//! Path-store client for Pawclub.
//!
//! All durable state lives in an external hierarchical document store
//! addressed by slash-delimited paths. This crate defines the operation
//! surface the rest of the workspace codes against ([`PathStore`]), the
//! in-process engine used by the server, the CLI, and tests
//! ([`MemoryStore`]), and the [`connect`] factory that picks an engine
//! from the configured endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_stream::wrappers::ReceiverStream;

pub mod error;
pub mod memory;
pub mod path;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;

/// A stream of full snapshots of one subtree: the current value on
/// subscription, then the complete new value after every relevant change.
/// Never terminates on its own; dropping it cancels the subscription.
pub type Snapshots = ReceiverStream<Option<Value>>;

/// Closure applied inside [`PathStore::transact`]: receives the current
/// value (if any) and returns the replacement (`None` deletes the node).
pub type TransactFn<'a> = dyn FnMut(Option<Value>) -> Option<Value> + Send + 'a;

/// Operation surface of the hierarchical document store.
///
/// Point reads return `Option` rather than failing on absence; range
/// queries are ascending-only (mirroring the read primitive of the
/// backing store), so descending views are produced by the caller.
#[async_trait]
pub trait PathStore: Send + Sync {
    /// Read the value at `path`.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Write `value` at `path`, replacing whatever subtree was there.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Merge `fields` into the map at `path`. Each named field is
    /// replaced wholly; unnamed siblings are left untouched.
    async fn merge(&self, path: &str, fields: serde_json::Map<String, Value>) -> Result<()>;

    /// Remove the value at `path`. Removing an absent path is a no-op.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Children of `path` ordered ascending by the numeric value found at
    /// `order_key` (itself a slash path inside each child). With
    /// `start_after`, only children strictly past the cursor are
    /// returned; `limit` caps the result length.
    async fn query_range(
        &self,
        path: &str,
        order_key: &str,
        start_after: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Value)>>;

    /// Atomic read-modify-write of the value at `path`. No other writer
    /// observes or interleaves with the intermediate state. Returns the
    /// value that ended up stored.
    async fn transact(&self, path: &str, apply: &mut TransactFn<'_>) -> Result<Option<Value>>;

    /// Subscribe to the subtree at `path`. See [`Snapshots`].
    fn watch(&self, path: &str) -> Result<Snapshots>;
}

impl std::fmt::Debug for dyn PathStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PathStore")
    }
}

/// Build a store client for the configured endpoint.
///
/// `memory:` is the only scheme served from this process; anything else
/// belongs to an external deployment and is rejected here.
pub fn connect(endpoint: &str) -> Result<Arc<dyn PathStore>> {
    match endpoint {
        "" | "memory:" => {
            tracing::info!("using in-process memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        other => Err(StoreError::UnsupportedEndpoint(other.to_string())),
    }
}
