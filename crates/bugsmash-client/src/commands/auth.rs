//! Signup, sign-in and sign-out.

use tracing::info;

use bugsmash_shared::Role;
use bugsmash_store::User;

use crate::auth::Session;
use crate::error::{ClientError, Result};
use crate::state::AppState;

fn default_avatar_url(uid: &str) -> String {
    format!("https://i.pravatar.cc/150?u={uid}")
}

/// Register a new account and create its profile document.
///
/// The account is created first; the profile follows under the same id with
/// the `user` role and a generated avatar.  A profile write failure
/// surfaces as a store error while the account stays signed in, matching
/// how the identity service and the document store fail independently.
pub async fn sign_up(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Session> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::Validation("name is required".to_string()));
    }

    let user = state.identity.create_account(name, email, password).await?;
    state
        .users
        .save(User {
            id: user.uid.clone(),
            name: user.display_name.clone(),
            email: user.email.clone(),
            avatar_url: default_avatar_url(&user.uid.0),
            role: Role::User,
        })
        .await?;

    info!(uid = %user.uid, "signed up");
    Ok(Session::from(&user))
}

/// Authenticate an existing account.
pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<Session> {
    let user = state.identity.sign_in(email, password).await?;
    Ok(Session::from(&user))
}

/// Drop the current session.
pub fn sign_out(state: &AppState) {
    state.identity.sign_out();
}

/// The session for the currently signed-in account, if any.
pub fn current_session(state: &AppState) -> Option<Session> {
    state.identity.current().as_ref().map(Session::from)
}

/// The current session, or `NotSignedIn`.  Mutating flows call this once
/// and thread the session through explicitly.
pub fn require_session(state: &AppState) -> Result<Session> {
    current_session(state).ok_or(ClientError::NotSignedIn)
}
