//! Client-facing error type.

use thiserror::Error;

use bugsmash_shared::AuthError;
use bugsmash_store::StoreError;

/// Failure of a client command.
///
/// `Validation` is raised before any store or identity call, so a rejected
/// input never leaves a partial write behind.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
