//! The persistence seam: an opaque document database.
//!
//! [`DocumentBackend`] models exactly the surface the application needs from
//! a cloud document store: add (backend-assigned id), set (caller-chosen
//! id), merge-update, one-shot fetch, and a live query subscription that
//! pushes the full result set on every change.  The backend stamps nothing;
//! timestamps are the caller's job.
//!
//! [`MemoryBackend`] is the in-process implementation used by tests and
//! local development.  It supports failure injection so the
//! persistence-error paths stay testable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// One persisted document: backend-assigned id plus its fields.  The id is
/// not repeated inside `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// Conjunction of field-equality filters; the only query shape the
/// application uses (`where bugId == X`).  An empty query matches every
/// document in the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionQuery {
    filters: Vec<(String, Value)>,
}

impl CollectionQuery {
    /// Match the entire collection.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| doc.fields.get(field) == Some(value))
    }
}

/// One delivery on a live query channel.
#[derive(Debug)]
pub enum SnapshotEvent {
    /// The full current result set.  Sent immediately on subscribe and
    /// again after every change.
    Snapshot(Vec<Document>),
    /// The push channel failed; the stream ends after this event.  A failed
    /// read is NOT an empty result set.
    Failed(String),
}

/// Receiving half of a live query subscription.  Dropping it cancels the
/// subscription.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<SnapshotEvent>;

/// The document database, as seen by the stores.
#[async_trait]
pub trait DocumentBackend: Send + Sync + 'static {
    /// Insert a document; the backend assigns and returns its id.
    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String>;

    /// Create or replace the document with a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Merge `fields` into an existing document.  `NotFound` when absent.
    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()>;

    /// One-shot read of the current result set.
    async fn fetch(&self, collection: &str, query: &CollectionQuery) -> Result<Vec<Document>>;

    /// Open a live query: the current result set is pushed immediately,
    /// then again on every change to the collection.
    async fn subscribe(&self, collection: &str, query: CollectionQuery) -> Result<SnapshotReceiver>;
}

// ---------------------------------------------------------------------------
// Document codec
// ---------------------------------------------------------------------------

/// Project a model onto document fields, dropping the `id` (it lives on the
/// document envelope, not inside it).
pub fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    let mut fields: Map<String, Value> = serde_json::from_value(serde_json::to_value(record)?)?;
    fields.remove("id");
    Ok(fields)
}

/// Rebuild a model from a document, reattaching the envelope id.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    let mut fields = doc.fields.clone();
    fields.insert("id".to_string(), Value::String(doc.id.clone()));
    Ok(serde_json::from_value(Value::Object(fields))?)
}

// ---------------------------------------------------------------------------
// In-process backend
// ---------------------------------------------------------------------------

struct Watcher {
    collection: String,
    query: CollectionQuery,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
}

#[derive(Default)]
struct BackendState {
    collections: HashMap<String, Vec<Document>>,
    watchers: Vec<Watcher>,
    unavailable: bool,
}

/// In-process [`DocumentBackend`].
///
/// `set_unavailable(true)` makes every call fail with
/// [`StoreError::Unavailable`] and tears down open subscriptions with a
/// `Failed` event, which is how tests exercise the reconnect policy.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Toggle failure injection.
    pub fn set_unavailable(&self, unavailable: bool) {
        let watchers = {
            let mut state = self.lock();
            state.unavailable = unavailable;
            if unavailable {
                std::mem::take(&mut state.watchers)
            } else {
                Vec::new()
            }
        };
        for watcher in watchers {
            let _ = watcher
                .tx
                .send(SnapshotEvent::Failed("storage unavailable".to_string()));
        }
    }

    /// Number of documents currently in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn check_available(state: &BackendState) -> Result<()> {
        if state.unavailable {
            Err(StoreError::Unavailable("backend offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// Push fresh result sets to every watcher of `collection`, dropping
    /// watchers whose receiver has gone away.
    fn notify(state: &mut BackendState, collection: &str) {
        let docs = state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();

        state.watchers.retain(|watcher| {
            if watcher.collection != collection {
                return true;
            }
            let matching: Vec<Document> = docs
                .iter()
                .filter(|doc| watcher.query.matches(doc))
                .cloned()
                .collect();
            watcher.tx.send(SnapshotEvent::Snapshot(matching)).is_ok()
        });
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let id = Uuid::new_v4().to_string();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Self::notify(&mut state, collection);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let docs = state.collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|doc| doc.id == id) {
            Some(doc) => doc.fields = fields,
            None => docs.push(Document {
                id: id.to_string(),
                fields,
            }),
        }
        Self::notify(&mut state, collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let doc = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or(StoreError::NotFound)?;

        for (key, value) in fields {
            doc.fields.insert(key, value);
        }
        Self::notify(&mut state, collection);
        Ok(())
    }

    async fn fetch(&self, collection: &str, query: &CollectionQuery) -> Result<Vec<Document>> {
        let state = self.lock();
        Self::check_available(&state)?;

        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(&self, collection: &str, query: CollectionQuery) -> Result<SnapshotReceiver> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let initial: Vec<Document> = state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let _ = tx.send(SnapshotEvent::Snapshot(initial));

        state.watchers.push(Watcher {
            collection: collection.to_string(),
            query,
            tx,
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn add_then_fetch_round_trips() {
        let backend = MemoryBackend::new();
        let id = backend
            .add("bugs", fields(&[("title", json!("crash on save"))]))
            .await
            .unwrap();

        let docs = backend
            .fetch("bugs", &CollectionQuery::all())
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].fields["title"], "crash on save");
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing_ids() {
        let backend = MemoryBackend::new();
        let id = backend
            .add(
                "bugs",
                fields(&[("title", json!("t")), ("status", json!("New"))]),
            )
            .await
            .unwrap();

        backend
            .update("bugs", &id, fields(&[("status", json!("Fixed"))]))
            .await
            .unwrap();

        let docs = backend
            .fetch("bugs", &CollectionQuery::all())
            .await
            .unwrap();
        assert_eq!(docs[0].fields["status"], "Fixed");
        assert_eq!(docs[0].fields["title"], "t");

        let err = backend
            .update("bugs", "missing", fields(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn subscribe_pushes_initial_and_filtered_changes() {
        let backend = MemoryBackend::new();
        backend
            .add("comments", fields(&[("bugId", json!("bug-1"))]))
            .await
            .unwrap();

        let mut rx = backend
            .subscribe(
                "comments",
                CollectionQuery::all().field_eq("bugId", "bug-1"),
            )
            .await
            .unwrap();

        // Immediate delivery of the current result set.
        match rx.recv().await.unwrap() {
            SnapshotEvent::Snapshot(docs) => assert_eq!(docs.len(), 1),
            other => panic!("unexpected event: {other:?}"),
        }

        // A document for another bug does push a snapshot, but the result
        // set stays filtered.
        backend
            .add("comments", fields(&[("bugId", json!("bug-2"))]))
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            SnapshotEvent::Snapshot(docs) => {
                assert_eq!(docs.len(), 1);
                assert_eq!(docs[0].fields["bugId"], "bug-1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unavailable_backend_rejects_calls_and_fails_watchers() {
        let backend = MemoryBackend::new();
        let mut rx = backend
            .subscribe("bugs", CollectionQuery::all())
            .await
            .unwrap();
        let _ = rx.recv().await; // initial snapshot

        backend.set_unavailable(true);

        assert!(matches!(
            rx.recv().await,
            Some(SnapshotEvent::Failed(_))
        ));
        assert!(rx.recv().await.is_none());

        let err = backend.add("bugs", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        let err = backend
            .fetch("bugs", &CollectionQuery::all())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        backend.set_unavailable(false);
        backend.add("bugs", Map::new()).await.unwrap();
    }

    #[test]
    fn codec_moves_the_id_between_envelope_and_fields() {
        use bugsmash_shared::UserId;

        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Probe {
            id: UserId,
            name: String,
        }

        let probe = Probe {
            id: UserId::from("user-1"),
            name: "Alice".into(),
        };
        let fields = to_fields(&probe).unwrap();
        assert!(fields.get("id").is_none());

        let doc = Document {
            id: "user-1".into(),
            fields,
        };
        let back: Probe = from_document(&doc).unwrap();
        assert_eq!(back, probe);
    }
}
