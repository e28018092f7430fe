use sqlx::SqliteConnection;

use crate::db::{DbPool, now_timestamp};
use crate::errors::AppError;

use super::types::Reputation;

const SELECT_REPUTATION: &str = "\
    SELECT id, user_id, language, rep_points, updated_at FROM reputations";

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    user_id: i64,
    language: String,
    rep_points: i64,
    updated_at: String,
}

fn row_to_reputation(row: Row) -> Reputation {
    Reputation {
        id: row.id,
        user_id: row.user_id,
        language: row.language,
        rep_points: row.rep_points,
        updated_at: row.updated_at,
    }
}

/// Fetch the reputation row for (user, language), creating it with zero
/// points if the user has not interacted with this language yet.
pub async fn get_or_create(
    pool: &DbPool,
    user_id: i64,
    language: &str,
) -> Result<Reputation, AppError> {
    let mut conn = pool.acquire().await?;
    get_or_create_tx(&mut *conn, user_id, language).await
}

pub async fn get_or_create_tx(
    conn: &mut SqliteConnection,
    user_id: i64,
    language: &str,
) -> Result<Reputation, AppError> {
    sqlx::query(
        "INSERT INTO reputations (user_id, language, rep_points, updated_at) \
         VALUES (?1, ?2, 0, ?3) \
         ON CONFLICT (user_id, language) DO NOTHING",
    )
    .bind(user_id)
    .bind(language)
    .bind(now_timestamp())
    .execute(&mut *conn)
    .await?;

    let sql = format!("{SELECT_REPUTATION} WHERE user_id = ?1 AND language = ?2");
    let row = sqlx::query_as::<_, Row>(&sql)
        .bind(user_id)
        .bind(language)
        .fetch_one(conn)
        .await?;

    Ok(row_to_reputation(row))
}

/// Apply a reputation delta, clamped so points never go below zero.
/// A single conditional UPDATE at the storage layer — no in-process
/// read-modify-write, so concurrent adjustments cannot lose updates.
pub async fn adjust(
    pool: &DbPool,
    user_id: i64,
    language: &str,
    delta: i64,
) -> Result<(), AppError> {
    let mut conn = pool.acquire().await?;
    adjust_tx(&mut *conn, user_id, language, delta).await
}

pub async fn adjust_tx(
    conn: &mut SqliteConnection,
    user_id: i64,
    language: &str,
    delta: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO reputations (user_id, language, rep_points, updated_at) \
         VALUES (?1, ?2, 0, ?3) \
         ON CONFLICT (user_id, language) DO NOTHING",
    )
    .bind(user_id)
    .bind(language)
    .bind(now_timestamp())
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE reputations \
         SET rep_points = MAX(0, rep_points + ?1), updated_at = ?2 \
         WHERE user_id = ?3 AND language = ?4",
    )
    .bind(delta)
    .bind(now_timestamp())
    .bind(user_id)
    .bind(language)
    .execute(conn)
    .await?;

    Ok(())
}

/// Ranked contributors for a language, highest reputation first.
/// `limit` is clamped to 1..=100. Pure read; empty vec if nobody has
/// contributed in this language.
pub async fn leaderboard(
    pool: &DbPool,
    language: &str,
    limit: i64,
) -> Result<Vec<Reputation>, AppError> {
    let limit = limit.clamp(1, 100);

    let sql = format!(
        "{SELECT_REPUTATION} WHERE language = ?1 \
         ORDER BY rep_points DESC, updated_at ASC LIMIT ?2"
    );
    let rows = sqlx::query_as::<_, Row>(&sql)
        .bind(language)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(row_to_reputation).collect())
}
