//! The comment collection store: an append-only log scoped by bug.
//!
//! Same contract shape as the bug store, except subscriptions are keyed by
//! the owning bug and there is no update operation; comments are immutable
//! once written.  Observers always receive a bug's comments in
//! creation-time ascending order, whatever order the underlying pushes
//! arrive in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use bugsmash_shared::{BugId, CommentId};

use crate::backend::{self, CollectionQuery, Document, DocumentBackend};
use crate::error::Result;
use crate::live::{spawn_snapshot_pump, RetryPolicy};
use crate::models::{Comment, NewComment};
use crate::pubsub::{Observer, Publisher, Subscription};

pub(crate) const COLLECTION: &str = "comments";

/// The authoritative comment log.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Register an observer for one bug's comments.  It fires immediately
    /// with the current thread, then once per appended comment, always in
    /// creation-time ascending order.
    fn subscribe(&self, bug_id: &BugId, observer: Observer<Comment>) -> Subscription;

    /// Append a comment: id assigned, `created_at` stamped to now.  Only
    /// subscribers of the matching bug are notified.
    async fn add(&self, draft: NewComment) -> Result<Comment>;

    /// One-shot read of a bug's comments, creation-time ascending.
    async fn comments_for(&self, bug_id: &BugId) -> Result<Vec<Comment>>;
}

fn sort_ascending(comments: &mut [Comment]) {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

// ---------------------------------------------------------------------------
// In-memory variant
// ---------------------------------------------------------------------------

/// Single-process comment store with per-bug fan-out.  The publisher map
/// only tracks bugs that currently have subscribers; the last unsubscribe
/// for a bug drops its entry.
pub struct MemoryCommentStore {
    records: Mutex<Vec<Comment>>,
    publishers: Arc<Mutex<HashMap<BugId, Publisher<Comment>>>>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::with_comments(Vec::new())
    }

    pub fn with_comments(initial: Vec<Comment>) -> Self {
        Self {
            records: Mutex::new(initial),
            publishers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Comment>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn publisher_for(&self, bug_id: &BugId) -> Publisher<Comment> {
        self.publishers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(bug_id.clone())
            .or_default()
            .clone()
    }

    /// The bug's publisher, only if someone is subscribed to it.  Mutations
    /// use this so broadcasting never creates map entries.
    fn watched_publisher(&self, bug_id: &BugId) -> Option<Publisher<Comment>> {
        self.publishers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(bug_id)
            .cloned()
    }

    #[cfg(test)]
    fn tracked_threads(&self) -> usize {
        self.publishers.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn thread_for(&self, bug_id: &BugId) -> Vec<Comment> {
        let mut thread: Vec<Comment> = self
            .lock()
            .iter()
            .filter(|comment| comment.bug_id == *bug_id)
            .cloned()
            .collect();
        sort_ascending(&mut thread);
        thread
    }
}

impl Default for MemoryCommentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    fn subscribe(&self, bug_id: &BugId, observer: Observer<Comment>) -> Subscription {
        let inner = self.publisher_for(bug_id).subscribe(Arc::clone(&observer));
        observer(&self.thread_for(bug_id));

        // Prune the bug's map entry once its last subscriber is gone.
        let publishers = Arc::clone(&self.publishers);
        let bug_id = bug_id.clone();
        Subscription::new(move || {
            inner.cancel();
            let mut publishers = publishers.lock().unwrap_or_else(|p| p.into_inner());
            if publishers
                .get(&bug_id)
                .is_some_and(|publisher| publisher.observer_count() == 0)
            {
                publishers.remove(&bug_id);
            }
        })
    }

    async fn add(&self, draft: NewComment) -> Result<Comment> {
        let comment = draft.into_comment(Utc::now());
        self.lock().push(comment.clone());

        if let Some(publisher) = self.watched_publisher(&comment.bug_id) {
            publisher.broadcast(&self.thread_for(&comment.bug_id));
        }
        info!(bug_id = %comment.bug_id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    async fn comments_for(&self, bug_id: &BugId) -> Result<Vec<Comment>> {
        Ok(self.thread_for(bug_id))
    }
}

// ---------------------------------------------------------------------------
// Live variant
// ---------------------------------------------------------------------------

/// Comment store backed by the document database.  Each subscription is its
/// own filtered live query, so only the matching bug's subscribers see a
/// given append.
pub struct LiveCommentStore {
    backend: Arc<dyn DocumentBackend>,
    retry: RetryPolicy,
}

impl LiveCommentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::with_retry(backend, RetryPolicy::default())
    }

    pub fn with_retry(backend: Arc<dyn DocumentBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    fn query_for(bug_id: &BugId) -> CollectionQuery {
        CollectionQuery::all().field_eq("bugId", bug_id.0.clone())
    }
}

fn decode_comments(docs: Vec<Document>) -> Vec<Comment> {
    let mut comments: Vec<Comment> = docs
        .iter()
        .filter_map(|doc| match backend::from_document::<Comment>(doc) {
            Ok(comment) => Some(comment),
            Err(e) => {
                warn!(doc_id = %doc.id, error = %e, "skipping malformed comment document");
                None
            }
        })
        .collect();
    sort_ascending(&mut comments);
    comments
}

#[async_trait]
impl CommentStore for LiveCommentStore {
    fn subscribe(&self, bug_id: &BugId, observer: Observer<Comment>) -> Subscription {
        spawn_snapshot_pump(
            Arc::clone(&self.backend),
            COLLECTION,
            Self::query_for(bug_id),
            self.retry,
            decode_comments,
            observer,
        )
    }

    async fn add(&self, draft: NewComment) -> Result<Comment> {
        let comment = draft.into_comment(Utc::now());
        let fields = backend::to_fields(&comment)?;
        let id = self.backend.add(COLLECTION, fields).await?;
        info!(bug_id = %comment.bug_id, comment_id = %id, "comment added");
        Ok(Comment {
            id: CommentId(id),
            ..comment
        })
    }

    async fn comments_for(&self, bug_id: &BugId) -> Result<Vec<Comment>> {
        let docs = self
            .backend
            .fetch(COLLECTION, &Self::query_for(bug_id))
            .await?;
        Ok(decode_comments(docs))
    }
}
