//! In-process store engine.
//!
//! Holds the whole hierarchy as one JSON tree behind a read-write lock.
//! Children keep insertion order (`serde_json` with `preserve_order`),
//! which is what the comment tree relies on for chronological display.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use pawclub_events::{ChangeEvent, ChangeKind, EventBus};

use crate::error::Result;
use crate::path;
use crate::{PathStore, Snapshots, TransactFn};

const WATCH_BUFFER: usize = 16;

#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

struct Shared {
    root: RwLock<Value>,
    bus: EventBus,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                root: RwLock::new(Value::Object(Map::new())),
                bus: EventBus::default(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    fn read_at(&self, segs: &[&str]) -> Option<Value> {
        let root = self.root.read();
        node_at(&root, segs).cloned()
    }
}

/// Walk down to the node addressed by `segs`, if present.
fn node_at<'a>(mut node: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    for seg in segs {
        node = node.as_object()?.get(*seg)?;
    }
    Some(node)
}

/// Walk down to the node addressed by `segs`, materializing intermediate
/// maps along the way.
fn slot<'a>(mut node: &'a mut Value, segs: &[&str]) -> &'a mut Value {
    for seg in segs {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            unreachable!("just materialized an object");
        };
        node = map.entry((*seg).to_string()).or_insert(Value::Null);
    }
    node
}

/// Remove the node at `segs`, pruning ancestor maps that become empty.
/// Returns whether anything was removed.
fn remove_at(node: &mut Value, segs: &[&str]) -> bool {
    let Some((head, rest)) = segs.split_first() else {
        return false;
    };
    let Value::Object(map) = node else {
        return false;
    };
    if rest.is_empty() {
        return map.remove(*head).is_some();
    }
    let removed = match map.get_mut(*head) {
        Some(child) => remove_at(child, rest),
        None => false,
    };
    if removed {
        let child_empty = map
            .get(*head)
            .and_then(Value::as_object)
            .is_some_and(Map::is_empty);
        if child_empty {
            map.remove(*head);
        }
    }
    removed
}

/// Numeric order value of `child` under `order_key`; absent or
/// non-numeric values sort before every number, like the backing store's
/// null ordering.
fn order_value(child: &Value, order_segs: &[&str]) -> f64 {
    node_at(child, order_segs)
        .and_then(Value::as_f64)
        .unwrap_or(f64::NEG_INFINITY)
}

#[async_trait]
impl PathStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let segs = path::segments(path)?;
        Ok(self.shared.read_at(&segs))
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let segs = path::segments(path)?;
        {
            let mut root = self.shared.root.write();
            *slot(&mut root, &segs) = value;
        }
        self.shared.bus.publish(ChangeEvent::new(path, ChangeKind::Set));
        Ok(())
    }

    async fn merge(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let segs = path::segments(path)?;
        {
            let mut root = self.shared.root.write();
            let node = slot(&mut root, &segs);
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                for (key, value) in fields {
                    map.insert(key, value);
                }
            }
        }
        self.shared.bus.publish(ChangeEvent::new(path, ChangeKind::Merge));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let segs = path::segments(path)?;
        let removed = {
            let mut root = self.shared.root.write();
            if segs.is_empty() {
                *root = Value::Object(Map::new());
                true
            } else {
                remove_at(&mut root, &segs)
            }
        };
        if removed {
            self.shared
                .bus
                .publish(ChangeEvent::new(path, ChangeKind::Delete));
        }
        Ok(())
    }

    async fn query_range(
        &self,
        path: &str,
        order_key: &str,
        start_after: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Value)>> {
        let segs = path::segments(path)?;
        let order_segs = path::segments(order_key)?;

        let children = match self.shared.read_at(&segs) {
            Some(Value::Object(map)) => map,
            _ => return Ok(Vec::new()),
        };

        let mut entries: Vec<(String, Value, f64)> = children
            .into_iter()
            .map(|(key, value)| {
                let ord = order_value(&value, &order_segs);
                (key, value, ord)
            })
            .collect();
        entries.sort_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.cmp(&b.0)));

        let mut out: Vec<(String, Value)> = entries
            .into_iter()
            .filter(|(_, _, ord)| match start_after {
                Some(cursor) => *ord > cursor,
                None => true,
            })
            .map(|(key, value, _)| (key, value))
            .collect();
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn transact(&self, path: &str, apply: &mut TransactFn<'_>) -> Result<Option<Value>> {
        let segs = path::segments(path)?;
        let (result, kind) = {
            let mut root = self.shared.root.write();
            let current = node_at(&root, &segs).cloned();
            let had_value = current.is_some();
            match apply(current) {
                Some(next) => {
                    *slot(&mut root, &segs) = next.clone();
                    (Some(next), Some(ChangeKind::Set))
                }
                None if had_value => {
                    remove_at(&mut root, &segs);
                    (None, Some(ChangeKind::Delete))
                }
                None => (None, None),
            }
        };
        if let Some(kind) = kind {
            self.shared.bus.publish(ChangeEvent::new(path, kind));
        }
        Ok(result)
    }

    fn watch(&self, path: &str) -> Result<Snapshots> {
        path::segments(path)?;
        let shared = self.shared.clone();
        let watched = path.to_string();
        let mut events = self.shared.bus.subscribe();
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);

        tokio::spawn(async move {
            let read = |p: &str| {
                let segs = path::segments(p).unwrap_or_default();
                shared.read_at(&segs)
            };
            if tx.send(read(&watched)).await.is_err() {
                return;
            }
            loop {
                match events.recv().await {
                    Ok(event) if event.touches(&watched) => {
                        if tx.send(read(&watched)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    // Missed events collapse into one fresh snapshot.
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        if tx.send(read(&watched)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn set_then_get_roundtrips_nested_paths() {
        let store = MemoryStore::new();
        store
            .set("books/dune", json!({"title": "Dune", "created_at": 100}))
            .await
            .unwrap();

        let title = store.get("books/dune/title").await.unwrap();
        assert_eq!(title, Some(json!("Dune")));
        assert_eq!(store.get("books/arrakis").await.unwrap(), None);
    }

    #[tokio::test]
    async fn merge_preserves_siblings() {
        let store = MemoryStore::new();
        store
            .set("books/dune", json!({"title": "Dune", "author": "Herbert"}))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("title".into(), json!("Dune (revised)"));
        store.merge("books/dune", fields).await.unwrap();

        let book = store.get("books/dune").await.unwrap().unwrap();
        assert_eq!(book["title"], json!("Dune (revised)"));
        assert_eq!(book["author"], json!("Herbert"));
    }

    #[tokio::test]
    async fn merge_at_collection_leaves_sibling_entries_alone() {
        let store = MemoryStore::new();
        store.set("comments/dune/a", json!({"text": "first"})).await.unwrap();

        let mut fields = Map::new();
        fields.insert("b".into(), json!({"text": "second"}));
        store.merge("comments/dune", fields).await.unwrap();

        let thread = store.get("comments/dune").await.unwrap().unwrap();
        assert_eq!(thread["a"]["text"], json!("first"));
        assert_eq!(thread["b"]["text"], json!("second"));
    }

    #[tokio::test]
    async fn delete_removes_and_prunes_empty_parents() {
        let store = MemoryStore::new();
        store.set("roles/u1/r1", json!("admin")).await.unwrap();

        store.delete("roles/u1/r1").await.unwrap();

        assert_eq!(store.get("roles/u1/r1").await.unwrap(), None);
        // u1 held nothing else, so the now-empty map is gone too.
        assert_eq!(store.get("roles/u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn query_range_orders_ascending_with_strict_cursor() {
        let store = MemoryStore::new();
        for (slug, created) in [("a", 100), ("b", 300), ("c", 200)] {
            store
                .set(&format!("books/{slug}"), json!({"created_at": created}))
                .await
                .unwrap();
        }

        let all = store
            .query_range("books", "created_at", None, None)
            .await
            .unwrap();
        let keys: Vec<&str> = all.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "c", "b"]);

        let after = store
            .query_range("books", "created_at", Some(100.0), Some(1))
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].0, "c");
    }

    #[tokio::test]
    async fn query_range_on_missing_path_is_empty() {
        let store = MemoryStore::new();
        let out = store
            .query_range("books", "created_at", None, Some(5))
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn transact_applies_and_returns_final_value() {
        let store = MemoryStore::new();
        store.set("counters/votes", json!(1)).await.unwrap();

        let out = store
            .transact("counters/votes", &mut |current| {
                let n = current.and_then(|v| v.as_i64()).unwrap_or(0);
                Some(json!(n + 1))
            })
            .await
            .unwrap();

        assert_eq!(out, Some(json!(2)));
        assert_eq!(store.get("counters/votes").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn transact_returning_none_deletes() {
        let store = MemoryStore::new();
        store.set("counters/votes", json!(9)).await.unwrap();

        let out = store
            .transact("counters/votes", &mut |_| None)
            .await
            .unwrap();

        assert_eq!(out, None);
        assert_eq!(store.get("counters/votes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn watch_emits_current_snapshot_then_changes() {
        let store = MemoryStore::new();
        store.set("comments/dune/a", json!({"text": "hi"})).await.unwrap();

        let mut snapshots = store.watch("comments/dune").unwrap();

        let first = snapshots.next().await.unwrap();
        assert_eq!(first.unwrap()["a"]["text"], json!("hi"));

        store.set("comments/dune/b", json!({"text": "yo"})).await.unwrap();
        let second = snapshots.next().await.unwrap().unwrap();
        assert_eq!(second["b"]["text"], json!("yo"));
    }

    #[tokio::test]
    async fn watch_ignores_unrelated_writes() {
        let store = MemoryStore::new();
        let mut snapshots = store.watch("comments/dune").unwrap();
        // Initial (empty) snapshot.
        assert_eq!(snapshots.next().await.unwrap(), None);

        store.set("books/dune", json!({"title": "Dune"})).await.unwrap();
        store.set("comments/dune/a", json!({"text": "hi"})).await.unwrap();

        // The next frame is the comment write; the book write produced none.
        let frame = snapshots.next().await.unwrap().unwrap();
        assert!(frame.get("a").is_some());
    }
}
