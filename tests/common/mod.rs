//! Shared test infrastructure for model layer tests.
//!
//! `setup_test_db()` creates a throwaway SQLite database in a temp directory
//! and runs the schema migrations, giving every test an isolated store.

use tempfile::TempDir;

use carolhub::db::{self, DbPool};

/// A migrated test database. The temp directory must stay alive as long as
/// the pool, so both travel together.
pub struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

pub async fn setup_test_db() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}", db_path.display());

    let pool = db::init_pool(&url).await.expect("Failed to open test DB");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    TestDb { _dir: dir, pool }
}
