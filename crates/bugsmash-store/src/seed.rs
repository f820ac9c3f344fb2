//! Fixture data and first-run seeding.
//!
//! Seeding happens only through an explicit call from the application's
//! startup path, and only after a successful read proved the collection
//! empty.  A failed read is an error, never an excuse to overwrite live
//! data with fixtures.

use chrono::{DateTime, Utc};
use tracing::info;

use bugsmash_shared::{BugId, BugPriority, BugStatus, CommentId, Role, UserId};

use crate::backend::{to_fields, CollectionQuery, DocumentBackend};
use crate::error::Result;
use crate::models::{Bug, Comment, User};
use crate::{bugs, comments, users};

fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn fixture_user(id: &str, name: &str, email: &str, role: Role) -> User {
    User {
        id: UserId::from(id),
        name: name.to_string(),
        email: email.to_string(),
        avatar_url: format!("https://i.pravatar.cc/150?u={id}"),
        role,
    }
}

/// The demo accounts.  `user-1` is the only admin.
pub fn fixture_users() -> Vec<User> {
    vec![
        fixture_user("user-1", "Alice Johnson", "alice@example.com", Role::Admin),
        fixture_user("user-2", "Bob Williams", "bob@example.com", Role::User),
        fixture_user("user-3", "Charlie Brown", "charlie@example.com", Role::User),
        fixture_user("user-4", "Diana Prince", "diana@example.com", Role::User),
    ]
}

/// Six demo bugs covering every status and priority; `bug-106` is the one
/// unassigned record.
pub fn fixture_bugs() -> Vec<Bug> {
    vec![
        Bug {
            id: BugId::from("bug-101"),
            title: "Login button unresponsive on mobile".to_string(),
            description: "The main login button on the homepage does not respond to clicks on \
                          mobile devices (tested on iOS Safari and Android Chrome)."
                .to_string(),
            status: BugStatus::New,
            priority: BugPriority::High,
            category: "Authentication".to_string(),
            reporter_id: UserId::from("user-2"),
            assignee_id: Some(UserId::from("user-1")),
            created_at: ts("2024-05-20T10:00:00Z"),
            updated_at: ts("2024-05-21T11:30:00Z"),
        },
        Bug {
            id: BugId::from("bug-102"),
            title: "User profile picture not updating".to_string(),
            description: "When a user uploads a new profile picture, the old one remains visible \
                          until a hard refresh is performed."
                .to_string(),
            status: BugStatus::InProgress,
            priority: BugPriority::Medium,
            category: "User Profile".to_string(),
            reporter_id: UserId::from("user-3"),
            assignee_id: Some(UserId::from("user-1")),
            created_at: ts("2024-05-19T14:20:00Z"),
            updated_at: ts("2024-05-22T09:00:00Z"),
        },
        Bug {
            id: BugId::from("bug-103"),
            title: "API rate limit error not handled gracefully".to_string(),
            description: "Exceeding the API rate limit results in a generic server error instead \
                          of a user-friendly message."
                .to_string(),
            status: BugStatus::InProgress,
            priority: BugPriority::High,
            category: "API".to_string(),
            reporter_id: UserId::from("user-2"),
            assignee_id: Some(UserId::from("user-4")),
            created_at: ts("2024-05-18T09:00:00Z"),
            updated_at: ts("2024-05-20T16:45:00Z"),
        },
        Bug {
            id: BugId::from("bug-104"),
            title: "Incorrect calculation in monthly report".to_string(),
            description: "The total revenue in the generated monthly report for April is off by \
                          3%. Seems to be a rounding issue."
                .to_string(),
            status: BugStatus::Fixed,
            priority: BugPriority::Critical,
            category: "Reporting".to_string(),
            reporter_id: UserId::from("user-1"),
            assignee_id: Some(UserId::from("user-2")),
            created_at: ts("2024-05-15T11:00:00Z"),
            updated_at: ts("2024-05-18T18:00:00Z"),
        },
        Bug {
            id: BugId::from("bug-105"),
            title: "Text overflows in navigation menu on smaller screens".to_string(),
            description: "Menu items with long text get cut off or wrap incorrectly on screen \
                          widths below 360px."
                .to_string(),
            status: BugStatus::Closed,
            priority: BugPriority::Low,
            category: "UI/UX".to_string(),
            reporter_id: UserId::from("user-4"),
            assignee_id: Some(UserId::from("user-3")),
            created_at: ts("2024-05-12T15:00:00Z"),
            updated_at: ts("2024-05-14T12:00:00Z"),
        },
        Bug {
            id: BugId::from("bug-106"),
            title: "Email notifications are not being sent".to_string(),
            description: "No email notifications are being sent for new bug assignments or \
                          comments."
                .to_string(),
            status: BugStatus::New,
            priority: BugPriority::Critical,
            category: "Notifications".to_string(),
            reporter_id: UserId::from("user-3"),
            assignee_id: None,
            created_at: ts("2024-05-23T10:00:00Z"),
            updated_at: ts("2024-05-23T10:00:00Z"),
        },
    ]
}

fn fixture_comment(id: &str, bug: &str, author: &str, content: &str, at: &str) -> Comment {
    Comment {
        id: CommentId::from(id),
        bug_id: BugId::from(bug),
        author_id: UserId::from(author),
        content: content.to_string(),
        created_at: ts(at),
    }
}

pub fn fixture_comments() -> Vec<Comment> {
    vec![
        fixture_comment(
            "comment-1",
            "bug-101",
            "user-1",
            "I've reproduced this on my end. Starting to investigate the event listeners.",
            "2024-05-21T11:35:00Z",
        ),
        fixture_comment(
            "comment-2",
            "bug-101",
            "user-2",
            "Thanks for picking this up so quickly!",
            "2024-05-21T11:40:00Z",
        ),
        fixture_comment(
            "comment-3",
            "bug-102",
            "user-1",
            "Looks like a caching issue on the client side. I'll try invalidating the cache \
             after upload.",
            "2024-05-22T09:05:00Z",
        ),
    ]
}

/// How many fixture documents a [`seed_if_empty`] call wrote, per
/// collection.  All zeros when every collection was already populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub bugs: usize,
    pub comments: usize,
}

async fn collection_is_empty(backend: &dyn DocumentBackend, collection: &str) -> Result<bool> {
    Ok(backend
        .fetch(collection, &CollectionQuery::all())
        .await?
        .is_empty())
}

/// Seed the fixture data into every collection that is currently empty.
///
/// Each collection is checked and written independently, so a half-seeded
/// backend (say, users survived but bugs were wiped) only gets the missing
/// parts refilled.  Read errors propagate untouched.
pub async fn seed_if_empty(backend: &dyn DocumentBackend) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if collection_is_empty(backend, users::COLLECTION).await? {
        for user in fixture_users() {
            backend
                .set(users::COLLECTION, &user.id.0, to_fields(&user)?)
                .await?;
            report.users += 1;
        }
        info!(count = report.users, "seeded user fixtures");
    }

    if collection_is_empty(backend, bugs::COLLECTION).await? {
        for bug in fixture_bugs() {
            backend
                .set(bugs::COLLECTION, &bug.id.0, to_fields(&bug)?)
                .await?;
            report.bugs += 1;
        }
        info!(count = report.bugs, "seeded bug fixtures");
    }

    if collection_is_empty(backend, comments::COLLECTION).await? {
        for comment in fixture_comments() {
            backend
                .set(comments::COLLECTION, &comment.id.0, to_fields(&comment)?)
                .await?;
            report.comments += 1;
        }
        info!(count = report.comments, "seeded comment fixtures");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::StoreError;

    #[test]
    fn fixtures_reference_each_other_consistently() {
        let users = fixture_users();
        let bugs = fixture_bugs();

        for bug in &bugs {
            assert!(bugsmash_shared::SUGGESTED_CATEGORIES.contains(&bug.category.as_str()));
            assert!(users.iter().any(|u| u.id == bug.reporter_id));
            if let Some(assignee) = &bug.assignee_id {
                assert!(users.iter().any(|u| u.id == *assignee));
            }
            assert!(bug.updated_at >= bug.created_at);
        }
        for comment in fixture_comments() {
            assert!(bugs.iter().any(|b| b.id == comment.bug_id));
            assert!(users.iter().any(|u| u.id == comment.author_id));
        }
    }

    #[tokio::test]
    async fn seeds_empty_collections_exactly_once() {
        let backend = MemoryBackend::new();

        let report = seed_if_empty(&backend).await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                users: 4,
                bugs: 6,
                comments: 3,
            }
        );
        assert_eq!(backend.len(bugs::COLLECTION), 6);

        // Second run is a no-op.
        let report = seed_if_empty(&backend).await.unwrap();
        assert_eq!(report, SeedReport::default());
        assert_eq!(backend.len(bugs::COLLECTION), 6);
    }

    #[tokio::test]
    async fn leaves_populated_collections_alone() {
        let backend = MemoryBackend::new();
        let existing = {
            let mut bug = fixture_bugs().remove(0);
            bug.title = "Pre-existing record".to_string();
            bug
        };
        backend
            .set(bugs::COLLECTION, &existing.id.0, to_fields(&existing).unwrap())
            .await
            .unwrap();

        let report = seed_if_empty(&backend).await.unwrap();

        assert_eq!(report.bugs, 0);
        assert_eq!(backend.len(bugs::COLLECTION), 1);
        // Other collections were empty and still get their fixtures.
        assert_eq!(backend.len(users::COLLECTION), 4);
    }

    #[tokio::test]
    async fn read_failure_is_an_error_not_an_empty_collection() {
        let backend = MemoryBackend::new();
        backend.set_unavailable(true);

        let err = seed_if_empty(&backend).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        backend.set_unavailable(false);
        assert!(backend.is_empty(bugs::COLLECTION));
    }
}
