//! Chunked import pipeline
//!
//! Sequences the whole run: plan chunks from a fast record count, then
//! for each chunk read raw rows, normalize, bulk-load the staging area,
//! and reconcile into the canonical store. Chunks are processed strictly
//! in file order; fuzzy linkage in a later chunk depends on the merges
//! committed by earlier chunks, so reconciliation is never reordered or
//! overlapped.

pub mod chunk;
pub mod normalize;
pub mod reconcile;

use std::fs::File;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use wsv_common::config::ImportConfig;
use wsv_common::db::runs::{self, RunState};
use wsv_common::db::staging::StagingArea;
use wsv_common::{Result, WorkRecord};

use crate::utils::{count_lines, csv_error};
use chunk::ChunkPlan;
use reconcile::{ChunkStats, Reconciler};

/// Outcome of one completed import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub records: u64,
    pub chunks: u64,
    pub stats: ChunkStats,
}

/// The import pipeline driver
pub struct CsvImporter {
    pool: SqlitePool,
    config: ImportConfig,
}

impl CsvImporter {
    pub fn new(pool: SqlitePool, config: ImportConfig) -> Self {
        Self { pool, config }
    }

    /// Run the full pipeline over one CSV file.
    ///
    /// Fails fast: the first parse, validation, IO, or store error aborts
    /// the run and marks its bookkeeping row failed. Chunks committed
    /// before the failure remain in the canonical store; a restart
    /// re-runs from the beginning and converges to the same state.
    pub async fn import_from_file(&self, path: &Path) -> Result<ImportSummary> {
        // Quoted fields may embed newlines, so the newline count is an
        // upper bound on the record count. It only sizes chunks and the
        // progress bar; the reader decides when input ends.
        let lines = count_lines(path)?;
        let total_records = lines.saturating_sub(1); // exclude header line

        let plan = ChunkPlan::compute(
            total_records,
            self.config.max_chunk_size,
            self.config.min_chunk_count,
        );
        info!(
            file = %path.display(),
            records = total_records,
            chunk_size = plan.chunk_size,
            "Planned import"
        );

        let run_id = runs::start_run(&self.pool, &path.display().to_string(), total_records).await?;

        let result = self.run_chunks(path, plan, total_records, run_id).await;

        let final_state = match &result {
            Ok(_) => RunState::Completed,
            Err(_) => RunState::Failed,
        };
        if let Err(e) = runs::finish_run(&self.pool, run_id, final_state).await {
            // Keep the original error; the run row is only bookkeeping
            warn!(run_id = %run_id, "Failed to finalize import run: {}", e);
        }

        result
    }

    async fn run_chunks(
        &self,
        path: &Path,
        plan: ChunkPlan,
        total_records: u64,
        run_id: uuid::Uuid,
    ) -> Result<ImportSummary> {
        if total_records == 0 {
            info!("Input file holds no records, nothing to import");
            return Ok(ImportSummary::default());
        }

        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);
        normalize::verify_header(reader.headers().map_err(csv_error)?)?;

        let staging = StagingArea::new(self.pool.clone());
        let reconciler = Reconciler::new(self.config.unmatched_policy);

        let bar = ProgressBar::new(plan.expected_chunks(total_records));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut summary = ImportSummary::default();
        let mut records = reader.records();
        let mut chunk: Vec<WorkRecord> = Vec::with_capacity(plan.chunk_size as usize);

        loop {
            chunk.clear();
            while (chunk.len() as u64) < plan.chunk_size {
                match records.next() {
                    Some(raw) => {
                        let raw = raw.map_err(csv_error)?;
                        chunk.push(normalize::normalize_record(&raw, &self.config)?);
                    }
                    None => break,
                }
            }
            if chunk.is_empty() {
                break;
            }

            staging.load(&chunk).await?;
            let stats = reconciler.reconcile_chunk(&self.pool, &staging).await?;

            summary.records += chunk.len() as u64;
            summary.chunks += 1;
            summary.stats.accumulate(stats);
            runs::record_chunk(&self.pool, run_id, summary.chunks).await?;
            bar.inc(1);
            debug!(chunk = summary.chunks, records = chunk.len(), "Chunk committed");
        }

        staging.clear().await?;
        bar.finish();
        info!(
            records = summary.records,
            chunks = summary.chunks,
            inserted = summary.stats.inserted,
            updated = summary.stats.updated,
            absorbed = summary.stats.absorbed,
            dropped = summary.stats.dropped,
            "Import complete"
        );

        Ok(summary)
    }
}
