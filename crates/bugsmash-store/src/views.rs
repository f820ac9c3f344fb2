//! Pure, stateless functions over collection snapshots.
//!
//! These are the store's primary consumers: the bug list's filter bar, the
//! dashboard tallies and the "recently reported" ranking.  Collections are
//! small, so everything is recomputed per snapshot with no caching.

use std::collections::HashMap;

use bugsmash_shared::{BugPriority, BugStatus, UserId};

use crate::models::{Bug, User};

/// The bug list's filter bar.
///
/// A bug matches when its title OR id contains `search` case-insensitively,
/// AND its status is in `statuses`, AND its priority is in `priorities`.
/// An empty filter set means "no restriction", not "match nothing"; an
/// empty search string matches everything.
#[derive(Debug, Clone, Default)]
pub struct BugFilter {
    pub search: String,
    pub statuses: Vec<BugStatus>,
    pub priorities: Vec<BugPriority>,
}

impl BugFilter {
    pub fn matches(&self, bug: &Bug) -> bool {
        let needle = self.search.to_lowercase();
        let search_match = needle.is_empty()
            || bug.title.to_lowercase().contains(&needle)
            || bug.id.0.to_lowercase().contains(&needle);
        let status_match = self.statuses.is_empty() || self.statuses.contains(&bug.status);
        let priority_match =
            self.priorities.is_empty() || self.priorities.contains(&bug.priority);
        search_match && status_match && priority_match
    }

    pub fn apply(&self, bugs: &[Bug]) -> Vec<Bug> {
        bugs.iter().filter(|bug| self.matches(bug)).cloned().collect()
    }
}

/// Per-status and per-priority tallies for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    per_status: HashMap<BugStatus, usize>,
    per_priority: HashMap<BugPriority, usize>,
}

impl DashboardStats {
    pub fn compute(bugs: &[Bug]) -> Self {
        let mut per_status = HashMap::new();
        let mut per_priority = HashMap::new();
        for bug in bugs {
            *per_status.entry(bug.status).or_insert(0) += 1;
            *per_priority.entry(bug.priority).or_insert(0) += 1;
        }
        Self {
            total: bugs.len(),
            per_status,
            per_priority,
        }
    }

    pub fn by_status(&self, status: BugStatus) -> usize {
        self.per_status.get(&status).copied().unwrap_or(0)
    }

    pub fn by_priority(&self, priority: BugPriority) -> usize {
        self.per_priority.get(&priority).copied().unwrap_or(0)
    }
}

/// The `limit` most recently reported bugs, newest first.  Stable: bugs
/// sharing a creation timestamp keep their snapshot order.
pub fn recent(bugs: &[Bug], limit: usize) -> Vec<Bug> {
    let mut ranked = bugs.to_vec();
    ranked.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ranked.truncate(limit);
    ranked
}

/// Resolve a user reference for display.  `None` simply means the caller
/// should fall back to an "Unassigned"/blank presentation.
pub fn resolve<'a>(users: &'a [User], id: &UserId) -> Option<&'a User> {
    users.iter().find(|user| user.id == *id)
}
