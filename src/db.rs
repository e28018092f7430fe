use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

pub const MIGRATIONS: &str = include_str!("schema.sql");

/// Open a SQLite pool for the given database URL (e.g. `sqlite://data/app.db`).
/// WAL mode plus a busy timeout keeps concurrent request handlers from
/// tripping over each other's write transactions.
pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

/// Begin a write transaction that takes SQLite's write lock up front.
/// A deferred transaction that reads before its first write can fail with a
/// snapshot conflict under write contention; an immediate one queues on the
/// busy timeout instead.
pub async fn begin_immediate(
    pool: &DbPool,
) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(MIGRATIONS).execute(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Current UTC time in the storage timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
