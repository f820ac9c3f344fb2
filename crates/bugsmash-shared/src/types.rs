use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Entity ids are opaque strings: the document backend assigns them, and the
// fixture data keeps human-readable ones ("bug-101"). New ids are UUIDv4.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BugId(pub String);

impl BugId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for BugId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for BugId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for BugId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bug workflow state.  The workflow is ordered for display
/// (New → In Progress → Fixed → Closed) but every transition is legal,
/// including reopening a closed bug.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BugStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Fixed,
    Closed,
}

impl BugStatus {
    pub const ALL: [BugStatus; 4] = [
        BugStatus::New,
        BugStatus::InProgress,
        BugStatus::Fixed,
        BugStatus::Closed,
    ];

    /// Human-readable label, matching the stored document value.
    pub fn label(&self) -> &'static str {
        match self {
            BugStatus::New => "New",
            BugStatus::InProgress => "In Progress",
            BugStatus::Fixed => "Fixed",
            BugStatus::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for BugStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Bug priority.  Display ordering only; nothing in the workflow is gated
/// on priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BugPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl BugPriority {
    pub const ALL: [BugPriority; 4] = [
        BugPriority::Low,
        BugPriority::Medium,
        BugPriority::High,
        BugPriority::Critical,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BugPriority::Low => "Low",
            BugPriority::Medium => "Medium",
            BugPriority::High => "High",
            BugPriority::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for BugPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Account role.  Stored lowercase in user documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_display_labels() {
        let json = serde_json::to_string(&BugStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");

        let back: BugStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(back, BugStatus::InProgress);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn ids_are_transparent_strings() {
        let id = BugId::from("bug-101");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"bug-101\"");
        assert_eq!(id.to_string(), "bug-101");
    }

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(UserId::new(), UserId::new());
    }
}
