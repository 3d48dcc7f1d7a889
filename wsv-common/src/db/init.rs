//! Database initialization
//!
//! Opens (or creates) the SQLite database and brings the schema up.
//! All schema statements are idempotent, so initialization is safe to
//! run on every startup.

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::Result;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL keeps readers unblocked while a chunk commit is in flight
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_musical_works_table(pool).await?;
    create_staging_works_table(pool).await?;
    create_import_runs_table(pool).await?;

    Ok(())
}

/// Create the musical_works table
///
/// The canonical store. `iswc` carries a UNIQUE constraint with NULL
/// allowed: rows with an identifier are globally unique on it, while
/// identifier-less rows never collide with each other. `contributors`
/// holds a sorted, deduplicated JSON array.
pub async fn create_musical_works_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS musical_works (
            guid TEXT PRIMARY KEY,
            title TEXT,
            contributors TEXT NOT NULL DEFAULT '[]',
            iswc TEXT UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_musical_works_iswc ON musical_works(iswc)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_musical_works_title ON musical_works(title)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the staging_works table
///
/// Transient landing area for one chunk of normalized records. Rows carry
/// no identity beyond insertion order; the table is cleared before every
/// chunk load.
pub async fn create_staging_works_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staging_works (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            contributors TEXT NOT NULL DEFAULT '[]',
            iswc TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the import_runs table
///
/// One row per pipeline run, for progress bookkeeping and audit.
pub async fn create_import_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_runs (
            run_id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            state TEXT NOT NULL CHECK (state IN ('running', 'completed', 'failed')),
            records_total INTEGER NOT NULL DEFAULT 0,
            chunks_processed INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
