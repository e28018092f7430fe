use sqlx::SqliteConnection;

use crate::db::{DbPool, begin_immediate, now_timestamp};
use crate::errors::AppError;

use super::types::*;

const SELECT_TRANSLATION: &str = "\
    SELECT id, carol_id, language, title, lyrics, source, is_canonical, \
           created_by, upvotes, downvotes, created_at \
    FROM translations";

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    carol_id: i64,
    language: String,
    title: String,
    lyrics: String,
    source: String,
    is_canonical: bool,
    created_by: i64,
    upvotes: i64,
    downvotes: i64,
    created_at: String,
}

fn row_to_translation(row: Row) -> Result<Translation, AppError> {
    // A lyrics column that no longer parses is corruption, not an empty song.
    let lyrics = serde_json::from_str(&row.lyrics).map_err(|e| {
        AppError::Db(sqlx::Error::ColumnDecode {
            index: "lyrics".to_string(),
            source: format!("stored lyrics are not a JSON array: {e}").into(),
        })
    })?;

    Ok(Translation {
        id: row.id,
        carol_id: row.carol_id,
        language: row.language,
        title: row.title,
        lyrics,
        source: row.source,
        is_canonical: row.is_canonical,
        created_by: row.created_by,
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        created_at: row.created_at,
    })
}

/// Find a single translation by id.
pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Translation>, AppError> {
    let mut conn = pool.acquire().await?;
    find_by_id_tx(&mut *conn, id).await
}

pub async fn find_by_id_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Translation>, AppError> {
    let sql = format!("{SELECT_TRANSLATION} WHERE id = ?1");
    let row = sqlx::query_as::<_, Row>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(row_to_translation).transpose()
}

/// Find the canonical translation for a (carol, language) pair.
pub async fn find_canonical(
    pool: &DbPool,
    carol_id: i64,
    language: &str,
) -> Result<Option<Translation>, AppError> {
    let mut conn = pool.acquire().await?;
    find_canonical_tx(&mut *conn, carol_id, language).await
}

pub async fn find_canonical_tx(
    conn: &mut SqliteConnection,
    carol_id: i64,
    language: &str,
) -> Result<Option<Translation>, AppError> {
    let sql = format!("{SELECT_TRANSLATION} WHERE carol_id = ?1 AND language = ?2 AND is_canonical = 1");
    let row = sqlx::query_as::<_, Row>(&sql)
        .bind(carol_id)
        .bind(language)
        .fetch_optional(conn)
        .await?;
    row.map(row_to_translation).transpose()
}

async fn insert(
    conn: &mut SqliteConnection,
    data: &NewTranslation,
    is_canonical: bool,
) -> Result<i64, AppError> {
    let lyrics = serde_json::to_string(&data.lyrics)
        .map_err(|e| AppError::Validation(format!("Lyrics are not serializable: {e}")))?;

    let result = sqlx::query(
        "INSERT INTO translations \
             (carol_id, language, title, lyrics, source, is_canonical, created_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(data.carol_id)
    .bind(&data.language)
    .bind(&data.title)
    .bind(&lyrics)
    .bind(&data.source)
    .bind(is_canonical)
    .bind(data.created_by)
    .bind(now_timestamp())
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Return the existing canonical translation for (carol, language), or insert
/// `data` as the canonical one. Used for AI-seeded translations and for
/// materializing merged proposals onto carols with no translation yet.
pub async fn get_or_create_canonical(
    pool: &DbPool,
    data: &NewTranslation,
) -> Result<Translation, AppError> {
    let mut tx = begin_immediate(pool).await?;

    if let Some(existing) = find_canonical_tx(&mut *tx, data.carol_id, &data.language).await? {
        return Ok(existing);
    }

    let id = match insert(&mut *tx, data, true).await {
        // Lost the insert race: another request seeded the canonical row first.
        Err(AppError::Db(sqlx::Error::Database(e))) if e.is_unique_violation() => {
            drop(tx);
            return find_canonical(pool, data.carol_id, &data.language)
                .await?
                .ok_or(AppError::NotFound);
        }
        other => other?,
    };
    tx.commit().await?;

    find_by_id(pool, id).await?.ok_or(AppError::NotFound)
}

/// Insert a canonical row for a pair that has no canonical translation yet.
/// The partial unique index still rejects a second canonical if two callers
/// race here.
pub async fn insert_canonical(
    conn: &mut SqliteConnection,
    data: &NewTranslation,
) -> Result<i64, AppError> {
    insert(conn, data, true).await
}

/// Atomically replace the canonical translation for a (carol, language) pair.
///
/// The demote is conditional on `previous_canonical_id` still being canonical
/// (compare-and-swap); if it was superseded in the meantime the update touches
/// zero rows and this fails with `Conflict` instead of losing the invariant.
/// Must be called inside the caller's transaction.
pub async fn promote(
    conn: &mut SqliteConnection,
    data: &NewTranslation,
    previous_canonical_id: i64,
) -> Result<i64, AppError> {
    let demoted = sqlx::query(
        "UPDATE translations SET is_canonical = 0 WHERE id = ?1 AND is_canonical = 1",
    )
    .bind(previous_canonical_id)
    .execute(&mut *conn)
    .await?;

    if demoted.rows_affected() != 1 {
        return Err(AppError::Conflict(
            "Canonical translation changed while merging".to_string(),
        ));
    }

    insert(conn, data, true).await
}
