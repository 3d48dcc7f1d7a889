//! Import run bookkeeping
//!
//! Each pipeline invocation records one `import_runs` row, moved from
//! `running` to `completed` or `failed` when the run ends.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::Result;

/// Terminal and non-terminal run states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }
}

/// Open a new run row in `running` state; returns its id
pub async fn start_run(pool: &SqlitePool, file_path: &str, records_total: u64) -> Result<Uuid> {
    let run_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO import_runs (run_id, file_path, state, records_total, chunks_processed, started_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(run_id.to_string())
    .bind(file_path)
    .bind(RunState::Running.as_str())
    .bind(records_total as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(run_id)
}

/// Record chunk progress on a running run
pub async fn record_chunk(pool: &SqlitePool, run_id: Uuid, chunks_processed: u64) -> Result<()> {
    sqlx::query("UPDATE import_runs SET chunks_processed = ? WHERE run_id = ?")
        .bind(chunks_processed as i64)
        .bind(run_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Move a run to a terminal state and stamp its end time
pub async fn finish_run(pool: &SqlitePool, run_id: Uuid, state: RunState) -> Result<()> {
    sqlx::query("UPDATE import_runs SET state = ?, ended_at = ? WHERE run_id = ?")
        .bind(state.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(run_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}
