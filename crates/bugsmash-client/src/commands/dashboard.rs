//! The dashboard read model.

use bugsmash_store::{recent, Bug, DashboardStats};

use crate::error::Result;
use crate::state::AppState;

/// Everything the dashboard renders from one snapshot: the tallies plus
/// the most recently reported bugs.
#[derive(Debug, Clone)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub recent: Vec<Bug>,
}

/// Build the dashboard from the current bug collection.  `limit` comes
/// from [`ClientConfig::recent_limit`](crate::config::ClientConfig).
pub async fn overview(state: &AppState, limit: usize) -> Result<DashboardOverview> {
    let bugs = state.bugs.snapshot().await?;
    Ok(DashboardOverview {
        stats: DashboardStats::compute(&bugs),
        recent: recent(&bugs, limit),
    })
}
