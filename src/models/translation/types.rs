use serde::Serialize;

pub const SOURCE_AI: &str = "ai_generated";
pub const SOURCE_COMMUNITY: &str = "community";

/// One language's rendering of a carol. Exactly one row per (carol, language)
/// carries `is_canonical = true`; superseded rows are kept for history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub id: i64,
    pub carol_id: i64,
    pub language: String,
    pub title: String,
    pub lyrics: Vec<String>,
    pub source: String,
    pub is_canonical: bool,
    pub created_by: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: String,
}

/// Data for inserting a translation row.
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub carol_id: i64,
    pub language: String,
    pub title: String,
    pub lyrics: Vec<String>,
    pub source: String,
    pub created_by: i64,
}
