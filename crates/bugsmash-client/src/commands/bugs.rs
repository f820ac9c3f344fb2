//! Reporting and editing bugs.

use tracing::info;

use bugsmash_shared::BugId;
use bugsmash_store::{Bug, BugPatch, NewBug};

use crate::auth::Session;
use crate::error::{ClientError, Result};
use crate::state::AppState;

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ClientError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// File a new bug report with the session user as reporter.
///
/// Title, description and category must be non-blank; the category itself
/// is free text, suggestions are advisory only.
pub async fn create_bug(state: &AppState, session: &Session, draft: NewBug) -> Result<Bug> {
    require(&draft.title, "title")?;
    require(&draft.description, "description")?;
    require(&draft.category, "category")?;

    let bug = state.bugs.add(draft, &session.user_id).await?;
    info!(bug_id = %bug.id, reporter = %session.user_id, "bug reported");
    Ok(bug)
}

/// Merge an edit into an existing bug.  An empty patch is rejected before
/// it can touch the store, so `updated_at` only moves for real edits.
pub async fn update_bug(state: &AppState, id: &BugId, patch: BugPatch) -> Result<()> {
    if patch.is_empty() {
        return Err(ClientError::Validation(
            "nothing to update".to_string(),
        ));
    }
    state.bugs.update(id, patch).await?;
    info!(bug_id = %id, "bug updated");
    Ok(())
}
