use serde::{Deserialize, Serialize};

use crate::models::translation::Translation;

pub const DEFAULT_QUORUM: i64 = 5;
pub const VOTING_WINDOW_DAYS: i64 = 7;
pub const CHANGE_REASON_MIN: usize = 5;
pub const CHANGE_REASON_MAX: usize = 500;

/// Proposal lifecycle: pending until quorum resolves it, then terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Merged,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Merged => "merged",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProposalStatus::Pending),
            "merged" => Some(ProposalStatus::Merged),
            "rejected" => Some(ProposalStatus::Rejected),
            _ => None,
        }
    }
}

/// Direction of a vote. The stored weight is the caster's voting power at
/// cast time, so the enum only carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteValue {
    Upvote,
    Downvote,
}

impl VoteValue {
    pub fn value(&self) -> i64 {
        match self {
            VoteValue::Upvote => 1,
            VoteValue::Downvote => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteValue::Upvote => "upvote",
            VoteValue::Downvote => "downvote",
        }
    }

    /// Parse the API wire value ("upvote" / "downvote").
    pub fn from_api(s: &str) -> Option<Self> {
        match s {
            "upvote" => Some(VoteValue::Upvote),
            "downvote" => Some(VoteValue::Downvote),
            _ => None,
        }
    }
}

/// A community-proposed edit to a translation. `upvotes`/`downvotes` are
/// reputation-weighted sums; quorum is counted in distinct voters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: i64,
    pub translation_id: i64,
    pub proposed_by: i64,
    pub new_title: Option<String>,
    pub new_lyrics: Option<Vec<String>>,
    pub change_reason: String,
    pub status: ProposalStatus,
    pub upvotes: i64,
    pub downvotes: i64,
    pub required_quorum: i64,
    pub voting_ends_at: String,
    pub created_at: String,
}

/// Input for creating a proposal. At least one of `new_title` / `new_lyrics`
/// must be present.
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub translation_id: i64,
    pub proposed_by: i64,
    pub new_title: Option<String>,
    pub new_lyrics: Option<Vec<String>>,
    pub change_reason: String,
    pub required_quorum: i64,
}

/// One user's vote on a proposal, as stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub proposal_id: i64,
    pub user_id: i64,
    pub value: i64,
    pub weight: i64,
    pub cast_at: String,
}

/// Field-level merge of a proposal onto its base translation: the proposal's
/// field wins when present, otherwise the base translation's field carries
/// over unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProposalPatch {
    pub new_title: Option<String>,
    pub new_lyrics: Option<Vec<String>>,
}

impl ProposalPatch {
    pub fn apply(&self, base: &Translation) -> (String, Vec<String>) {
        let title = self
            .new_title
            .clone()
            .unwrap_or_else(|| base.title.clone());
        let lyrics = self
            .new_lyrics
            .clone()
            .unwrap_or_else(|| base.lyrics.clone());
        (title, lyrics)
    }
}
