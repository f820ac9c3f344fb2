//! The user profile collection.
//!
//! Profiles are written at signup and mutated only by profile-edit; they
//! are never deleted.  The rest of the application subscribes to this
//! collection purely to resolve reporter/assignee/author ids for display.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{info, warn};

use bugsmash_shared::UserId;

use crate::backend::{self, CollectionQuery, Document, DocumentBackend};
use crate::error::{Result, StoreError};
use crate::live::{spawn_snapshot_pump, RetryPolicy};
use crate::models::{ProfilePatch, User};
use crate::pubsub::{Observer, Publisher, Subscription};

pub(crate) const COLLECTION: &str = "users";

/// The authoritative set of user profiles.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register an observer.  It fires immediately with the current
    /// collection and again after every change.
    fn subscribe(&self, observer: Observer<User>) -> Subscription;

    /// Insert or replace a profile under its id (signup).
    async fn save(&self, user: User) -> Result<()>;

    /// Merge a profile edit.  `NotFound` when the id does not exist.
    async fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> Result<()>;

    /// One-shot copy of the current collection.
    async fn snapshot(&self) -> Result<Vec<User>>;
}

// ---------------------------------------------------------------------------
// In-memory variant
// ---------------------------------------------------------------------------

pub struct MemoryUserStore {
    records: Mutex<Vec<User>>,
    publisher: Publisher<User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::with_users(Vec::new())
    }

    pub fn with_users(initial: Vec<User>) -> Self {
        Self {
            records: Mutex::new(initial),
            publisher: Publisher::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<User>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn broadcast(&self) {
        let snapshot = self.lock().clone();
        self.publisher.broadcast(&snapshot);
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    fn subscribe(&self, observer: Observer<User>) -> Subscription {
        let subscription = self.publisher.subscribe(Arc::clone(&observer));
        let snapshot = self.lock().clone();
        observer(&snapshot);
        subscription
    }

    async fn save(&self, user: User) -> Result<()> {
        {
            let mut records = self.lock();
            match records.iter_mut().find(|existing| existing.id == user.id) {
                Some(existing) => *existing = user.clone(),
                None => records.push(user.clone()),
            }
        }
        self.broadcast();
        info!(user_id = %user.id, "profile saved");
        Ok(())
    }

    async fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> Result<()> {
        {
            let mut records = self.lock();
            let user = records
                .iter_mut()
                .find(|user| user.id == *id)
                .ok_or(StoreError::NotFound)?;
            patch.apply(user);
        }
        self.broadcast();
        info!(user_id = %id, "profile updated");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<User>> {
        Ok(self.lock().clone())
    }
}

// ---------------------------------------------------------------------------
// Live variant
// ---------------------------------------------------------------------------

pub struct LiveUserStore {
    backend: Arc<dyn DocumentBackend>,
    retry: RetryPolicy,
}

impl LiveUserStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::with_retry(backend, RetryPolicy::default())
    }

    pub fn with_retry(backend: Arc<dyn DocumentBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }
}

fn decode_users(docs: Vec<Document>) -> Vec<User> {
    docs.iter()
        .filter_map(|doc| match backend::from_document::<User>(doc) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(doc_id = %doc.id, error = %e, "skipping malformed user document");
                None
            }
        })
        .collect()
}

#[async_trait]
impl UserStore for LiveUserStore {
    fn subscribe(&self, observer: Observer<User>) -> Subscription {
        spawn_snapshot_pump(
            Arc::clone(&self.backend),
            COLLECTION,
            CollectionQuery::all(),
            self.retry,
            decode_users,
            observer,
        )
    }

    async fn save(&self, user: User) -> Result<()> {
        let fields = backend::to_fields(&user)?;
        self.backend.set(COLLECTION, &user.id.0, fields).await?;
        info!(user_id = %user.id, "profile saved");
        Ok(())
    }

    async fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> Result<()> {
        let fields = backend::to_fields(&patch)?;
        self.backend.update(COLLECTION, &id.0, fields).await?;
        info!(user_id = %id, "profile updated");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<User>> {
        let docs = self.backend.fetch(COLLECTION, &CollectionQuery::all()).await?;
        Ok(decode_users(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use bugsmash_shared::Role;

    fn profile(id: &str, name: &str) -> User {
        User {
            id: UserId::from(id),
            name: name.into(),
            email: format!("{name}@example.com").to_lowercase(),
            avatar_url: format!("https://i.pravatar.cc/150?u={id}"),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn memory_save_inserts_then_replaces() {
        let store = MemoryUserStore::new();
        store.save(profile("user-1", "Alice")).await.unwrap();
        store.save(profile("user-1", "Alicia")).await.unwrap();

        let users = store.snapshot().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Alicia");
    }

    #[tokio::test]
    async fn memory_profile_edit_merges_and_reports_missing_ids() {
        let store = MemoryUserStore::with_users(vec![profile("user-1", "Alice")]);

        store
            .update_profile(
                &UserId::from("user-1"),
                ProfilePatch {
                    name: Some("Alice J.".into()),
                    avatar_url: None,
                },
            )
            .await
            .unwrap();

        let users = store.snapshot().await.unwrap();
        assert_eq!(users[0].name, "Alice J.");
        assert_eq!(users[0].email, "alice@example.com");

        let err = store
            .update_profile(&UserId::from("ghost"), ProfilePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn live_profile_edit_reaches_subscribers() {
        use crate::pubsub::Observer;
        use tokio::sync::mpsc;

        let backend = Arc::new(MemoryBackend::new());
        let store = LiveUserStore::new(backend);
        store.save(profile("user-1", "Alice")).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer: Observer<User> = Arc::new(move |snapshot: &[User]| {
            let _ = tx.send(snapshot.to_vec());
        });
        let _sub = store.subscribe(observer);
        assert_eq!(rx.recv().await.unwrap().len(), 1);

        store
            .update_profile(
                &UserId::from("user-1"),
                ProfilePatch {
                    name: None,
                    avatar_url: Some("https://cdn.example.com/alice.png".into()),
                },
            )
            .await
            .unwrap();

        let users = rx.recv().await.unwrap();
        assert_eq!(users[0].avatar_url, "https://cdn.example.com/alice.png");
    }
}
