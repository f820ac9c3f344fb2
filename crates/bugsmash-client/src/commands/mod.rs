//! Client command handlers.
//!
//! Each sub-module groups related commands by domain.  Commands are the
//! only write path into the stores: they validate input first, then thread
//! the explicit [`Session`](crate::auth::Session) through as the actor, so
//! a rejected call never leaves a partial write behind.

pub mod auth;
pub mod bugs;
pub mod comments;
pub mod dashboard;
pub mod profile;
