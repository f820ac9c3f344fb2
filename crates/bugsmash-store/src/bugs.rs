//! The bug collection store, in both variants.
//!
//! [`MemoryBugStore`] owns the collection in-process and notifies observers
//! synchronously; [`LiveBugStore`] delegates ownership to a
//! [`DocumentBackend`] and relays its pushes.  Both implement [`BugStore`],
//! so the application is wired against the trait and never cares which
//! variant is active.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use bugsmash_shared::{BugId, UserId};

use crate::backend::{self, CollectionQuery, Document, DocumentBackend};
use crate::error::{Result, StoreError};
use crate::live::{spawn_snapshot_pump, RetryPolicy};
use crate::models::{Bug, BugPatch, NewBug};
use crate::pubsub::{Observer, Publisher, Subscription};

pub(crate) const COLLECTION: &str = "bugs";

/// The authoritative set of bug records.
///
/// Every write goes through `add`/`update`; observers only ever hold
/// derived snapshots.
#[async_trait]
pub trait BugStore: Send + Sync {
    /// Register an observer.  It fires immediately with the current
    /// collection and again after every change.
    fn subscribe(&self, observer: Observer<Bug>) -> Subscription;

    /// Insert a new record: id assigned, status `New`, both timestamps
    /// stamped to now.  Visible to all observers once the call resolves.
    async fn add(&self, draft: NewBug, reporter: &UserId) -> Result<Bug>;

    /// Merge `patch` into the record matching `id` and refresh
    /// `updated_at`.  `NotFound` when the id does not exist.
    async fn update(&self, id: &BugId, patch: BugPatch) -> Result<()>;

    /// One-shot copy of the current collection.
    async fn snapshot(&self) -> Result<Vec<Bug>>;
}

// ---------------------------------------------------------------------------
// In-memory variant
// ---------------------------------------------------------------------------

/// Single-process bug store.  Mutations are infallible and broadcast before
/// the call returns.
pub struct MemoryBugStore {
    records: Mutex<Vec<Bug>>,
    publisher: Publisher<Bug>,
}

impl MemoryBugStore {
    pub fn new() -> Self {
        Self::with_bugs(Vec::new())
    }

    /// Start from an existing collection (fixture data).
    pub fn with_bugs(initial: Vec<Bug>) -> Self {
        Self {
            records: Mutex::new(initial),
            publisher: Publisher::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Bug>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Snapshot under the lock, broadcast outside it, so observers may call
    /// back into the store.
    fn broadcast(&self) {
        let snapshot = self.lock().clone();
        self.publisher.broadcast(&snapshot);
    }
}

impl Default for MemoryBugStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BugStore for MemoryBugStore {
    fn subscribe(&self, observer: Observer<Bug>) -> Subscription {
        let subscription = self.publisher.subscribe(Arc::clone(&observer));
        let snapshot = self.lock().clone();
        observer(&snapshot);
        subscription
    }

    async fn add(&self, draft: NewBug, reporter: &UserId) -> Result<Bug> {
        let bug = draft.into_bug(reporter.clone(), Utc::now());
        {
            let mut records = self.lock();
            // Newest first, matching how the views present the collection.
            records.insert(0, bug.clone());
        }
        self.broadcast();
        info!(bug_id = %bug.id, title = %bug.title, "bug reported");
        Ok(bug)
    }

    async fn update(&self, id: &BugId, patch: BugPatch) -> Result<()> {
        {
            let mut records = self.lock();
            let bug = records
                .iter_mut()
                .find(|bug| bug.id == *id)
                .ok_or(StoreError::NotFound)?;
            patch.apply(bug);
            bug.updated_at = Utc::now();
        }
        self.broadcast();
        info!(bug_id = %id, "bug updated");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<Bug>> {
        Ok(self.lock().clone())
    }
}

// ---------------------------------------------------------------------------
// Live variant
// ---------------------------------------------------------------------------

/// Bug store backed by the document database.  Mutations are asynchronous;
/// changes come back through the push channel, including changes made by
/// other clients.
pub struct LiveBugStore {
    backend: Arc<dyn DocumentBackend>,
    retry: RetryPolicy,
}

impl LiveBugStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::with_retry(backend, RetryPolicy::default())
    }

    pub fn with_retry(backend: Arc<dyn DocumentBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }
}

/// Decode a result set, dropping malformed documents; newest first, for
/// parity with the in-memory variant.
fn decode_bugs(docs: Vec<Document>) -> Vec<Bug> {
    let mut bugs: Vec<Bug> = docs
        .iter()
        .filter_map(|doc| match backend::from_document::<Bug>(doc) {
            Ok(bug) => Some(bug),
            Err(e) => {
                warn!(doc_id = %doc.id, error = %e, "skipping malformed bug document");
                None
            }
        })
        .collect();
    bugs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bugs
}

#[async_trait]
impl BugStore for LiveBugStore {
    fn subscribe(&self, observer: Observer<Bug>) -> Subscription {
        spawn_snapshot_pump(
            Arc::clone(&self.backend),
            COLLECTION,
            CollectionQuery::all(),
            self.retry,
            decode_bugs,
            observer,
        )
    }

    async fn add(&self, draft: NewBug, reporter: &UserId) -> Result<Bug> {
        let bug = draft.into_bug(reporter.clone(), Utc::now());
        let fields = backend::to_fields(&bug)?;
        let id = self.backend.add(COLLECTION, fields).await?;
        info!(bug_id = %id, title = %bug.title, "bug reported");
        Ok(Bug {
            id: BugId(id),
            ..bug
        })
    }

    async fn update(&self, id: &BugId, patch: BugPatch) -> Result<()> {
        let mut fields = backend::to_fields(&patch)?;
        fields.insert(
            "updatedAt".to_string(),
            serde_json::to_value(Utc::now())?,
        );
        self.backend.update(COLLECTION, &id.0, fields).await?;
        info!(bug_id = %id, "bug updated");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<Bug>> {
        let docs = self.backend.fetch(COLLECTION, &CollectionQuery::all()).await?;
        Ok(decode_bugs(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use bugsmash_shared::{BugPriority, BugStatus};
    use tokio::sync::mpsc;

    fn draft(title: &str) -> NewBug {
        NewBug {
            title: title.into(),
            description: "details".into(),
            priority: BugPriority::High,
            category: "API".into(),
            assignee_id: None,
        }
    }

    fn channel_observer() -> (Observer<Bug>, mpsc::UnboundedReceiver<Vec<Bug>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer: Observer<Bug> = Arc::new(move |snapshot: &[Bug]| {
            let _ = tx.send(snapshot.to_vec());
        });
        (observer, rx)
    }

    #[tokio::test]
    async fn memory_add_defaults_and_is_first_in_collection() {
        let store = MemoryBugStore::new();
        let reporter = UserId::from("user-2");

        store.add(draft("old bug"), &reporter).await.unwrap();
        let bug = store.add(draft("X"), &reporter).await.unwrap();

        assert_eq!(bug.status, BugStatus::New);
        assert_eq!(bug.created_at, bug.updated_at);
        assert_eq!(bug.reporter_id, reporter);

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot[0].title, "X");
    }

    #[tokio::test]
    async fn memory_subscriber_sees_initial_state_then_each_mutation_once() {
        let store = MemoryBugStore::new();
        let (observer, mut rx) = channel_observer();
        let _sub = store.subscribe(observer);

        // Immediate delivery of the (empty) collection.
        assert_eq!(rx.recv().await.unwrap().len(), 0);

        let bug = store.add(draft("X"), &UserId::from("user-2")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().len(), 1);

        store
            .update(&bug.id, BugPatch::status(BugStatus::Fixed))
            .await
            .unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot[0].status, BugStatus::Fixed);

        // Exactly once per mutation: nothing queued beyond the three above.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn memory_update_merges_and_advances_updated_at() {
        let store = MemoryBugStore::new();
        let bug = store.add(draft("X"), &UserId::from("user-2")).await.unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));
        store
            .update(&bug.id, BugPatch::status(BugStatus::Fixed))
            .await
            .unwrap();

        let snapshot = store.snapshot().await.unwrap();
        let updated = &snapshot[0];
        assert_eq!(updated.status, BugStatus::Fixed);
        assert!(updated.updated_at > bug.updated_at);
        // Unrelated fields untouched.
        assert_eq!(updated.title, bug.title);
        assert_eq!(updated.priority, bug.priority);
        assert_eq!(updated.created_at, bug.created_at);
    }

    #[tokio::test]
    async fn memory_idempotent_patch_still_advances_updated_at() {
        let store = MemoryBugStore::new();
        let bug = store.add(draft("X"), &UserId::from("user-2")).await.unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));
        // Patch equal to current values.
        store
            .update(&bug.id, BugPatch::status(BugStatus::New))
            .await
            .unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot[0].status, bug.status);
        assert!(snapshot[0].updated_at > bug.updated_at);
    }

    #[tokio::test]
    async fn memory_update_unknown_id_reports_not_found() {
        let store = MemoryBugStore::new();
        let err = store
            .update(&BugId::from("missing"), BugPatch::status(BugStatus::Fixed))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn memory_unsubscribed_observer_receives_nothing_further() {
        let store = MemoryBugStore::new();
        let (observer, mut rx) = channel_observer();

        let sub = store.subscribe(observer);
        assert_eq!(rx.recv().await.unwrap().len(), 0);
        sub.cancel();

        store.add(draft("X"), &UserId::from("user-2")).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn live_mutations_flow_back_through_the_push_channel() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LiveBugStore::new(backend.clone());

        let (observer, mut rx) = channel_observer();
        let _sub = store.subscribe(observer);
        assert_eq!(rx.recv().await.unwrap().len(), 0);

        let bug = store.add(draft("X"), &UserId::from("user-2")).await.unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, bug.id);
        assert_eq!(snapshot[0].status, BugStatus::New);

        store
            .update(&bug.id, BugPatch::status(BugStatus::Fixed))
            .await
            .unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot[0].status, BugStatus::Fixed);
        assert!(snapshot[0].updated_at >= snapshot[0].created_at);
    }

    #[tokio::test]
    async fn live_update_unknown_id_reports_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LiveBugStore::new(backend);
        let err = store
            .update(&BugId::from("missing"), BugPatch::status(BugStatus::Fixed))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn live_failed_add_leaves_observers_untouched() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LiveBugStore::new(backend.clone());

        let (observer, mut rx) = channel_observer();
        let _sub = store.subscribe(observer);
        assert_eq!(rx.recv().await.unwrap().len(), 0);

        backend.set_unavailable(true);
        let err = store
            .add(draft("X"), &UserId::from("user-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(backend.len(COLLECTION), 0);
    }
}
