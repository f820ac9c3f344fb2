//! Commenting on bugs.

use tracing::info;

use bugsmash_shared::BugId;
use bugsmash_store::{Comment, NewComment};

use crate::auth::Session;
use crate::error::{ClientError, Result};
use crate::state::AppState;

/// Append a comment to a bug's thread, authored by the session user.
/// Whitespace-only content is rejected before the store is touched.
pub async fn add_comment(
    state: &AppState,
    session: &Session,
    bug_id: &BugId,
    content: &str,
) -> Result<Comment> {
    if content.trim().is_empty() {
        return Err(ClientError::Validation(
            "comment cannot be empty".to_string(),
        ));
    }

    let comment = state
        .comments
        .add(NewComment {
            bug_id: bug_id.clone(),
            author_id: session.user_id.clone(),
            content: content.to_string(),
        })
        .await?;

    info!(bug_id = %bug_id, comment_id = %comment.id, "comment added");
    Ok(comment)
}
