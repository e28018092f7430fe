use serde::Serialize;

/// Per-user, per-language contribution score. Created lazily on first
/// interaction; never drops below zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reputation {
    pub id: i64,
    pub user_id: i64,
    pub language: String,
    pub rep_points: i64,
    pub updated_at: String,
}

/// Voting power derived from reputation: every 100 points grants one extra
/// unit of vote weight. Never below 1, so new contributors still count.
pub fn voting_power(rep_points: i64) -> i64 {
    1 + rep_points.max(0) / 100
}
