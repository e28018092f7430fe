use sqlx::SqliteConnection;

use crate::db::{DbPool, begin_immediate, now_timestamp};
use crate::errors::AppError;
use crate::models::translation;

use super::types::*;

const SELECT_PROPOSAL: &str = "\
    SELECT id, translation_id, proposed_by, new_title, new_lyrics, change_reason, \
           status, upvotes, downvotes, required_quorum, voting_ends_at, created_at \
    FROM translation_proposals";

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    translation_id: i64,
    proposed_by: i64,
    new_title: Option<String>,
    new_lyrics: Option<String>,
    change_reason: String,
    status: String,
    upvotes: i64,
    downvotes: i64,
    required_quorum: i64,
    voting_ends_at: String,
    created_at: String,
}

fn row_to_proposal(row: Row) -> Result<Proposal, AppError> {
    // An unknown status must not map to pending: that would reopen voting on
    // a proposal that already resolved.
    let status = ProposalStatus::parse(&row.status).ok_or_else(|| {
        AppError::Db(sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("unrecognized proposal status {:?}", row.status).into(),
        })
    })?;
    let new_lyrics = match row.new_lyrics.as_deref() {
        Some(raw) => Some(serde_json::from_str(raw).map_err(|e| {
            AppError::Db(sqlx::Error::ColumnDecode {
                index: "new_lyrics".to_string(),
                source: format!("stored lyrics are not a JSON array: {e}").into(),
            })
        })?),
        None => None,
    };

    Ok(Proposal {
        id: row.id,
        translation_id: row.translation_id,
        proposed_by: row.proposed_by,
        new_title: row.new_title,
        new_lyrics,
        change_reason: row.change_reason,
        status,
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        required_quorum: row.required_quorum,
        voting_ends_at: row.voting_ends_at,
        created_at: row.created_at,
    })
}

fn validate(data: &NewProposal) -> Result<(), AppError> {
    if data.new_title.is_none() && data.new_lyrics.is_none() {
        return Err(AppError::Validation(
            "Proposal must include a new title or new lyrics".to_string(),
        ));
    }
    if let Some(title) = &data.new_title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("New title cannot be empty".to_string()));
        }
    }
    if let Some(lyrics) = &data.new_lyrics {
        if lyrics.is_empty() {
            return Err(AppError::Validation("New lyrics cannot be empty".to_string()));
        }
    }
    let reason_len = data.change_reason.trim().chars().count();
    if !(CHANGE_REASON_MIN..=CHANGE_REASON_MAX).contains(&reason_len) {
        return Err(AppError::Validation(format!(
            "Change reason must be between {CHANGE_REASON_MIN} and {CHANGE_REASON_MAX} characters"
        )));
    }
    if data.required_quorum < 1 {
        return Err(AppError::Validation(
            "Required quorum must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Create a pending proposal against an existing translation. Validation
/// happens before any persistence call; the voting window opens at creation
/// and runs for `VOTING_WINDOW_DAYS`.
pub async fn create(pool: &DbPool, data: &NewProposal) -> Result<Proposal, AppError> {
    validate(data)?;

    let mut tx = begin_immediate(pool).await?;

    translation::find_by_id_tx(&mut *tx, data.translation_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_lyrics = match &data.new_lyrics {
        Some(lines) => Some(serde_json::to_string(lines).map_err(|e| {
            AppError::Validation(format!("Lyrics are not serializable: {e}"))
        })?),
        None => None,
    };
    let voting_ends_at = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(VOTING_WINDOW_DAYS))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default();

    let result = sqlx::query(
        "INSERT INTO translation_proposals \
             (translation_id, proposed_by, new_title, new_lyrics, change_reason, \
              status, required_quorum, voting_ends_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8)",
    )
    .bind(data.translation_id)
    .bind(data.proposed_by)
    .bind(&data.new_title)
    .bind(&new_lyrics)
    .bind(data.change_reason.trim())
    .bind(data.required_quorum)
    .bind(&voting_ends_at)
    .bind(now_timestamp())
    .execute(&mut *tx)
    .await?;

    let id = result.last_insert_rowid();
    let proposal = find_by_id_tx(&mut *tx, id).await?.ok_or(AppError::NotFound)?;
    tx.commit().await?;

    Ok(proposal)
}

/// Find a single proposal by id.
pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Proposal>, AppError> {
    let mut conn = pool.acquire().await?;
    find_by_id_tx(&mut *conn, id).await
}

pub async fn find_by_id_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Proposal>, AppError> {
    let sql = format!("{SELECT_PROPOSAL} WHERE id = ?1");
    let row = sqlx::query_as::<_, Row>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(row_to_proposal).transpose()
}

/// All pending proposals for a translation, oldest first.
pub async fn find_pending_for_translation(
    pool: &DbPool,
    translation_id: i64,
) -> Result<Vec<Proposal>, AppError> {
    let sql = format!(
        "{SELECT_PROPOSAL} WHERE translation_id = ?1 AND status = 'pending' \
         ORDER BY created_at ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, Row>(&sql)
        .bind(translation_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(row_to_proposal).collect()
}

/// All votes cast on a proposal, in cast order.
pub async fn find_votes(pool: &DbPool, proposal_id: i64) -> Result<Vec<Vote>, AppError> {
    #[derive(sqlx::FromRow)]
    struct VoteRow {
        proposal_id: i64,
        user_id: i64,
        value: i64,
        weight: i64,
        cast_at: String,
    }

    let rows = sqlx::query_as::<_, VoteRow>(
        "SELECT proposal_id, user_id, value, weight, cast_at \
         FROM votes WHERE proposal_id = ?1 ORDER BY id ASC",
    )
    .bind(proposal_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Vote {
            proposal_id: row.proposal_id,
            user_id: row.user_id,
            value: row.value,
            weight: row.weight,
            cast_at: row.cast_at,
        })
        .collect())
}
