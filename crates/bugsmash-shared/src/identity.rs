//! Identity types and the auth error taxonomy.
//!
//! Authentication itself is delegated to a managed identity service; this
//! module only defines the account handle the service yields and the fixed
//! set of human-readable error categories the rest of the application is
//! allowed to see.  Raw provider codes never escape this mapping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::UserId;

/// The authenticated account as reported by the identity service.
///
/// This is the session-level handle, not the profile document: the full
/// `User` profile (avatar, role) lives in the user store under the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: UserId,
    pub email: String,
    pub display_name: String,
}

/// Identity service failures, reduced to the categories shown to users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("This email address is already in use by another account.")]
    EmailAlreadyInUse,

    #[error("The password is too weak. Please choose a stronger password.")]
    WeakPassword,

    #[error("The email address is not valid.")]
    InvalidEmail,

    #[error("Incorrect email or password.")]
    InvalidCredentials,

    #[error("An unexpected error occurred. Please try again.")]
    Unknown,
}

impl AuthError {
    /// Map a provider error code to a category.
    ///
    /// Unrecognized codes collapse into [`AuthError::Unknown`] rather than
    /// leaking provider internals to the caller.
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/email-already-in-use" => AuthError::EmailAlreadyInUse,
            "auth/weak-password" => AuthError::WeakPassword,
            "auth/invalid-email" => AuthError::InvalidEmail,
            "auth/wrong-password" | "auth/user-not-found" | "auth/invalid-credential" => {
                AuthError::InvalidCredentials
            }
            _ => AuthError::Unknown,
        }
    }
}
