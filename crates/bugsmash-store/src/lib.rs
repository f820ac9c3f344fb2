//! # bugsmash-store
//!
//! The data-synchronization core: authoritative collections of bugs,
//! comments and users, plus the observer machinery that keeps every view
//! consistent with them.
//!
//! Two interchangeable variants implement the same store traits:
//!
//! - **Memory stores** own their collection in-process and notify observers
//!   synchronously, before the mutating call returns.
//! - **Live stores** delegate ownership to a [`DocumentBackend`] (an opaque
//!   document database) and relay its pushed snapshots to observers, with an
//!   explicit, observable reconnect policy.
//!
//! UI layers hold only derived snapshots obtained through subscription; all
//! writes go through the store entry points.

pub mod backend;
pub mod bugs;
pub mod comments;
pub mod live;
pub mod models;
pub mod pubsub;
pub mod seed;
pub mod users;
pub mod views;

mod error;

pub use backend::{CollectionQuery, Document, DocumentBackend, MemoryBackend, SnapshotEvent};
pub use bugs::{BugStore, LiveBugStore, MemoryBugStore};
pub use comments::{CommentStore, LiveCommentStore, MemoryCommentStore};
pub use error::{Result, StoreError};
pub use live::{RetryPolicy, SubscriptionHealth};
pub use models::{Bug, BugPatch, Comment, NewBug, NewComment, ProfilePatch, User};
pub use pubsub::{Observer, Publisher, Subscription};
pub use seed::{seed_if_empty, SeedReport};
pub use users::{LiveUserStore, MemoryUserStore, UserStore};
pub use views::{recent, resolve, BugFilter, DashboardStats};
