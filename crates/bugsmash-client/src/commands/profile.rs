//! Editing the signed-in user's profile.

use tracing::info;

use bugsmash_store::ProfilePatch;

use crate::auth::Session;
use crate::error::{ClientError, Result};
use crate::state::AppState;

/// Merge a profile edit for the session user.  Provided fields must be
/// non-blank; absent fields stay untouched.
pub async fn update_profile(state: &AppState, session: &Session, patch: ProfilePatch) -> Result<()> {
    if patch.is_empty() {
        return Err(ClientError::Validation("nothing to update".to_string()));
    }
    if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
        return Err(ClientError::Validation("name cannot be blank".to_string()));
    }

    state.users.update_profile(&session.user_id, patch).await?;
    info!(user_id = %session.user_id, "profile updated");
    Ok(())
}
