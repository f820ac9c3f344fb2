//! # bugsmash-shared
//!
//! Domain vocabulary shared by every BugSmash crate: id newtypes, the bug
//! workflow enums, identity types and the auth error taxonomy, and the
//! suggested category list.
//!
//! This crate is deliberately leaf-level: serde + uuid and little else, so
//! both the store and the client can depend on it freely.

pub mod categories;
pub mod identity;
pub mod types;

pub use categories::SUGGESTED_CATEGORIES;
pub use identity::{AuthError, AuthUser};
pub use types::{BugId, BugPriority, BugStatus, CommentId, Role, UserId};
