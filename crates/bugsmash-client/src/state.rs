//! Application state shared across all client commands.
//!
//! [`AppState`] owns the store and identity handles behind trait objects,
//! so command code never cares whether it is wired to the in-memory or the
//! live variant.  It is cheap to clone and safe to share across tasks.

use std::sync::Arc;

use bugsmash_store::{
    seed_if_empty, BugStore, CommentStore, DocumentBackend, LiveBugStore, LiveCommentStore,
    LiveUserStore, MemoryBugStore, MemoryCommentStore, MemoryUserStore, UserStore,
};

use crate::auth::{IdentityProvider, MemoryIdentityProvider};
use crate::config::ClientConfig;
use crate::error::Result;

/// Central application state.
#[derive(Clone)]
pub struct AppState {
    pub bugs: Arc<dyn BugStore>,
    pub comments: Arc<dyn CommentStore>,
    pub users: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Fully in-process state: empty memory stores and a memory identity
    /// provider.  This is what tests and offline development run against.
    pub fn in_memory() -> Self {
        Self {
            bugs: Arc::new(MemoryBugStore::new()),
            comments: Arc::new(MemoryCommentStore::new()),
            users: Arc::new(MemoryUserStore::new()),
            identity: Arc::new(MemoryIdentityProvider::new()),
        }
    }

    /// State wired to a document backend through the live stores.
    pub fn with_backend(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            bugs: Arc::new(LiveBugStore::new(backend.clone())),
            comments: Arc::new(LiveCommentStore::new(backend.clone())),
            users: Arc::new(LiveUserStore::new(backend)),
            identity: Arc::new(MemoryIdentityProvider::new()),
        }
    }

    /// The startup path: optionally seed empty collections with the demo
    /// fixtures, then wire the live stores.  Seeding errors abort startup;
    /// a backend that cannot be read is not a backend to overwrite.
    pub async fn bootstrap(backend: Arc<dyn DocumentBackend>, config: &ClientConfig) -> Result<Self> {
        if config.seed_fixtures {
            let report = seed_if_empty(backend.as_ref()).await?;
            tracing::debug!(?report, "fixture seeding complete");
        }
        Ok(Self::with_backend(backend))
    }
}
