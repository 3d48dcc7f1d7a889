//! Chunk-scoped staging area
//!
//! A transient landing zone for exactly one chunk of normalized records.
//! Loading clears any residual content first, so restarting the same
//! chunk slot is idempotent, then bulk-inserts the chunk with batched
//! multi-row statements instead of per-record round trips.

use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::model::WorkRecord;
use crate::{Error, Result};

/// Rows per INSERT statement; 3 binds per row keeps each statement well
/// under SQLite's bind parameter limit.
const INSERT_BATCH_SIZE: usize = 300;

/// Handle on the staging table, created per run and passed by reference
/// into the reconciler. Holds no cross-chunk state.
pub struct StagingArea {
    pool: SqlitePool,
}

impl StagingArea {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Clear residual content, then bulk-load one chunk. Runs as a single
    /// transaction so the staging table never holds a partial chunk.
    pub async fn load(&self, chunk: &[WorkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM staging_works")
            .execute(&mut *tx)
            .await?;

        for batch in chunk.chunks(INSERT_BATCH_SIZE) {
            let placeholders = vec!["(?, ?, ?)"; batch.len()].join(", ");
            let sql = format!(
                "INSERT INTO staging_works (title, contributors, iswc) VALUES {}",
                placeholders
            );

            let mut query = sqlx::query(&sql);
            for record in batch {
                let contributors = serde_json::to_string(&record.contributors)
                    .map_err(|e| {
                        Error::Internal(format!("Failed to serialize contributors: {}", e))
                    })?;
                query = query
                    .bind(&record.title)
                    .bind(contributors)
                    .bind(&record.iswc);
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::debug!(records = chunk.len(), "Staging area loaded");
        Ok(())
    }

    /// Read the staged chunk back in insertion order, through the
    /// caller's connection (the reconciler's transaction).
    pub async fn fetch_all(&self, conn: &mut SqliteConnection) -> Result<Vec<WorkRecord>> {
        let rows = sqlx::query(
            "SELECT title, contributors, iswc FROM staging_works ORDER BY id",
        )
        .fetch_all(conn)
        .await?;

        rows.iter()
            .map(|row| {
                let contributors_json: String = row.get("contributors");
                let contributors: Vec<String> = serde_json::from_str(&contributors_json)
                    .map_err(|e| {
                        Error::Internal(format!("Invalid contributors JSON in staging: {}", e))
                    })?;
                Ok(WorkRecord {
                    title: row.get("title"),
                    contributors,
                    iswc: row.get("iswc"),
                })
            })
            .collect()
    }

    /// Drop any staged content
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM staging_works")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory database");

        crate::db::init::create_schema(&pool).await.unwrap();
        pool
    }

    fn record(title: &str, contributors: &[&str], iswc: Option<&str>) -> WorkRecord {
        WorkRecord {
            title: Some(title.to_string()),
            contributors: contributors.iter().map(|s| s.to_string()).collect(),
            iswc: iswc.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn load_replaces_prior_chunk() {
        let pool = setup_test_db().await;
        let staging = StagingArea::new(pool.clone());

        staging
            .load(&[
                record("First", &["A"], None),
                record("Second", &["B"], Some("T0000000001")),
            ])
            .await
            .unwrap();

        staging
            .load(&[record("Third", &["C"], None)])
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let records = staging.fetch_all(&mut conn).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("Third"));
    }

    #[tokio::test]
    async fn fetch_preserves_insertion_order_and_raw_contributors() {
        let pool = setup_test_db().await;
        let staging = StagingArea::new(pool.clone());

        let chunk = vec![
            record("One", &["B", "A", "B"], None),
            record("Two", &["C"], Some("T0000000001")),
            WorkRecord {
                title: None,
                contributors: vec![],
                iswc: None,
            },
        ];
        staging.load(&chunk).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let records = staging.fetch_all(&mut conn).await.unwrap();
        assert_eq!(records, chunk);
        // Contributors stay in input order, duplicates intact
        assert_eq!(records[0].contributors, vec!["B", "A", "B"]);
    }

    #[tokio::test]
    async fn load_spans_multiple_insert_batches() {
        let pool = setup_test_db().await;
        let staging = StagingArea::new(pool.clone());

        let chunk: Vec<WorkRecord> = (0..INSERT_BATCH_SIZE * 2 + 17)
            .map(|i| record(&format!("Title #{}", i), &["X"], None))
            .collect();
        staging.load(&chunk).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staging_works")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count as usize, chunk.len());
    }
}
