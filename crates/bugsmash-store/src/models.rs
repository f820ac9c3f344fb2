//! Domain model structs held by the collection stores.
//!
//! Field names serialize in camelCase so the structs match the document
//! schema the original data set uses, and every struct derives `Serialize`
//! and `Deserialize` so it can be handed directly to a UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugsmash_shared::{BugId, BugPriority, BugStatus, CommentId, Role, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An account profile.  Created at signup, mutated only via profile-edit,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub role: Role,
}

/// Partial profile edit.  Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar_url.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            user.avatar_url = avatar_url.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Bug
// ---------------------------------------------------------------------------

/// A tracked defect record.
///
/// `reporter_id` is immutable after creation.  Every mutation refreshes
/// `updated_at`, so `updated_at >= created_at` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    pub id: BugId,
    pub title: String,
    pub description: String,
    pub status: BugStatus,
    pub priority: BugPriority,
    /// Free text; `SUGGESTED_CATEGORIES` is advisory only.
    pub category: String,
    pub reporter_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload of the "new bug" action.  The store assigns id, reporter, the
/// `New` status and both timestamps.
#[derive(Debug, Clone)]
pub struct NewBug {
    pub title: String,
    pub description: String,
    pub priority: BugPriority,
    pub category: String,
    pub assignee_id: Option<UserId>,
}

impl NewBug {
    /// Materialize the bug record as it enters the collection.
    pub fn into_bug(self, reporter_id: UserId, now: DateTime<Utc>) -> Bug {
        Bug {
            id: BugId::new(),
            title: self.title,
            description: self.description,
            status: BugStatus::New,
            priority: self.priority,
            category: self.category,
            reporter_id,
            assignee_id: self.assignee_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial bug mutation.  Only the provided fields are merged; the store
/// refreshes `updated_at` on every successful update, even when the patch
/// matches the current values.
///
/// Assignee is set-only: there is no unassign operation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BugPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BugStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<BugPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
}

impl BugPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.assignee_id.is_none()
    }

    /// Merge the provided fields into `bug`, leaving the rest untouched.
    /// Timestamps are the caller's responsibility.
    pub fn apply(&self, bug: &mut Bug) {
        if let Some(title) = &self.title {
            bug.title = title.clone();
        }
        if let Some(description) = &self.description {
            bug.description = description.clone();
        }
        if let Some(status) = self.status {
            bug.status = status;
        }
        if let Some(priority) = self.priority {
            bug.priority = priority;
        }
        if let Some(category) = &self.category {
            bug.category = category.clone();
        }
        if let Some(assignee_id) = &self.assignee_id {
            bug.assignee_id = Some(assignee_id.clone());
        }
    }

    /// Shorthand for the most common mutation.
    pub fn status(status: BugStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment on a bug.  Append-only: never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub bug_id: BugId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Payload of the "add comment" action.  The store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub bug_id: BugId,
    pub author_id: UserId,
    pub content: String,
}

impl NewComment {
    pub fn into_comment(self, now: DateTime<Utc>) -> Comment {
        Comment {
            id: CommentId::new(),
            bug_id: self.bug_id,
            author_id: self.author_id,
            content: self.content,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bug() -> Bug {
        let now = Utc::now();
        NewBug {
            title: "Login button unresponsive".into(),
            description: "Does not respond to clicks on mobile.".into(),
            priority: BugPriority::High,
            category: "Authentication".into(),
            assignee_id: None,
        }
        .into_bug(UserId::from("user-2"), now)
    }

    #[test]
    fn new_bug_defaults() {
        let bug = sample_bug();
        assert_eq!(bug.status, BugStatus::New);
        assert_eq!(bug.created_at, bug.updated_at);
        assert_eq!(bug.reporter_id, UserId::from("user-2"));
        assert!(bug.assignee_id.is_none());
    }

    #[test]
    fn patch_merges_only_provided_fields() {
        let mut bug = sample_bug();
        let title = bug.title.clone();

        BugPatch::status(BugStatus::Fixed).apply(&mut bug);

        assert_eq!(bug.status, BugStatus::Fixed);
        assert_eq!(bug.title, title);
        assert_eq!(bug.priority, BugPriority::High);
    }

    #[test]
    fn patch_serializes_only_provided_fields() {
        let patch = BugPatch {
            status: Some(BugStatus::Fixed),
            assignee_id: Some(UserId::from("user-1")),
            ..BugPatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["status"], "Fixed");
        assert_eq!(map["assigneeId"], "user-1");
    }

    #[test]
    fn bug_round_trips_through_camel_case_json() {
        let bug = sample_bug();
        let json = serde_json::to_value(&bug).unwrap();
        assert!(json.get("reporterId").is_some());
        assert!(json.get("createdAt").is_some());
        // Unassigned bugs omit the field entirely, like the original data.
        assert!(json.get("assigneeId").is_none());

        let back: Bug = serde_json::from_value(json).unwrap();
        assert_eq!(back, bug);
    }
}
