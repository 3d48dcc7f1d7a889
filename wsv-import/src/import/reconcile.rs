//! Two-tier reconciliation
//!
//! Folds one staged chunk into the canonical store inside a single
//! transaction. Pass 1 links records by exact identifier (insert or
//! union-merge); Pass 2 links the identifier-less remainder by title
//! equality plus at least one shared contributor, reading the
//! post-Pass-1 state. The two lookups are kept as distinct code paths:
//! a keyed lookup and a predicate scan, never collapsed into one query.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use wsv_common::config::UnmatchedPolicy;
use wsv_common::db::staging::StagingArea;
use wsv_common::db::works::{self, CanonicalWork};
use wsv_common::model::ContributorSet;
use wsv_common::{Result, WorkRecord};

/// How one staging record was folded into the canonical store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeOutcome {
    /// New canonical row created
    Inserted,
    /// Existing row found by identifier; contributors unioned
    Updated,
    /// Absorbed into one or more fuzzy matches; no row created
    Absorbed,
    /// No identifier, no fuzzy match; record not persisted
    Dropped,
}

/// Per-chunk reconciliation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub inserted: u64,
    pub updated: u64,
    pub absorbed: u64,
    pub dropped: u64,
}

impl ChunkStats {
    fn count(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Absorbed => self.absorbed += 1,
            MergeOutcome::Dropped => self.dropped += 1,
        }
    }

    pub fn accumulate(&mut self, other: ChunkStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.absorbed += other.absorbed;
        self.dropped += other.dropped;
    }

    pub fn records(&self) -> u64 {
        self.inserted + self.updated + self.absorbed + self.dropped
    }
}

/// Reconciler over the canonical store surface
pub struct Reconciler {
    unmatched_policy: UnmatchedPolicy,
}

impl Reconciler {
    pub fn new(unmatched_policy: UnmatchedPolicy) -> Self {
        Self { unmatched_policy }
    }

    /// Fold the staged chunk into the canonical store. Both passes run in
    /// one transaction, so a chunk commits atomically: a crash mid-chunk
    /// leaves no partially merged state behind.
    pub async fn reconcile_chunk(
        &self,
        pool: &SqlitePool,
        staging: &StagingArea,
    ) -> Result<ChunkStats> {
        let mut tx = pool.begin().await?;
        let records = staging.fetch_all(&mut tx).await?;

        let mut stats = ChunkStats::default();

        // Pass 1: exact linkage. Must complete before Pass 2, whose
        // matching reads the post-Pass-1 canonical state.
        for record in &records {
            if let Some(iswc) = record.iswc.clone() {
                let outcome = merge_exact(&mut tx, record, &iswc).await?;
                stats.count(outcome);
            }
        }

        // Pass 2: fuzzy linkage for the identifier-less remainder
        for record in records.iter().filter(|r| r.iswc.is_none()) {
            let outcome = self.merge_fuzzy(&mut tx, record).await?;
            stats.count(outcome);
        }

        tx.commit().await?;

        debug!(
            inserted = stats.inserted,
            updated = stats.updated,
            absorbed = stats.absorbed,
            dropped = stats.dropped,
            "Chunk reconciled"
        );

        Ok(stats)
    }

    /// Pass 2: match canonical rows on title equality plus a non-empty
    /// contributor intersection, and union the staging contributors into
    /// every match. An unmatched record falls to the configured policy.
    async fn merge_fuzzy(
        &self,
        conn: &mut SqliteConnection,
        record: &WorkRecord,
    ) -> Result<MergeOutcome> {
        // An absent title matches nothing, like NULL equality in SQL
        let candidates = match &record.title {
            Some(title) => works::find_by_title(&mut *conn, title).await?,
            None => Vec::new(),
        };

        let matches: Vec<&CanonicalWork> = candidates
            .iter()
            .filter(|work| work.contributors.shares_any(&record.contributors))
            .collect();

        if matches.is_empty() {
            return match self.unmatched_policy {
                UnmatchedPolicy::Drop => Ok(MergeOutcome::Dropped),
                UnmatchedPolicy::InsertNew => {
                    let work = CanonicalWork::new(
                        record.title.clone(),
                        record.contributors.clone().into(),
                        None,
                    );
                    works::insert_work(&mut *conn, &work).await?;
                    Ok(MergeOutcome::Inserted)
                }
            };
        }

        for matched in matches {
            let mut merged = matched.contributors.clone();
            merged.extend(record.contributors.iter().cloned());
            works::update_contributors(&mut *conn, matched.guid, &merged).await?;
        }

        Ok(MergeOutcome::Absorbed)
    }
}

/// Pass 1: keyed lookup by identifier. Insert when the identifier is
/// new; otherwise union contributors into the existing row. Title is
/// set only on insert (first writer wins), contributors always
/// accumulate.
async fn merge_exact(
    conn: &mut SqliteConnection,
    record: &WorkRecord,
    iswc: &str,
) -> Result<MergeOutcome> {
    match works::find_by_iswc(&mut *conn, iswc).await? {
        None => {
            let work = CanonicalWork::new(
                record.title.clone(),
                record.contributors.clone().into(),
                Some(iswc.to_string()),
            );
            works::insert_work(&mut *conn, &work).await?;
            Ok(MergeOutcome::Inserted)
        }
        Some(existing) => {
            let mut merged: ContributorSet = existing.contributors.clone();
            merged.extend(record.contributors.iter().cloned());
            works::update_contributors(&mut *conn, existing.guid, &merged).await?;
            Ok(MergeOutcome::Updated)
        }
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

        wsv_common::db::init::create_schema(&pool).await.unwrap();
        pool
    }

    fn record(title: Option<&str>, contributors: &[&str], iswc: Option<&str>) -> WorkRecord {
        WorkRecord {
            title: title.map(|s| s.to_string()),
            contributors: contributors.iter().map(|s| s.to_string()).collect(),
            iswc: iswc.map(|s| s.to_string()),
        }
    }

    async fn reconcile(pool: &SqlitePool, chunk: &[WorkRecord]) -> ChunkStats {
        reconcile_with_policy(pool, chunk, UnmatchedPolicy::Drop).await
    }

    async fn reconcile_with_policy(
        pool: &SqlitePool,
        chunk: &[WorkRecord],
        policy: UnmatchedPolicy,
    ) -> ChunkStats {
        let staging = StagingArea::new(pool.clone());
        staging.load(chunk).await.unwrap();
        Reconciler::new(policy)
            .reconcile_chunk(pool, &staging)
            .await
            .unwrap()
    }

    async fn contributors_of(pool: &SqlitePool, iswc: &str) -> Vec<String> {
        let mut conn = pool.acquire().await.unwrap();
        let work = works::find_by_iswc(&mut conn, iswc)
            .await
            .unwrap()
            .expect("Work not found");
        work.contributors.iter().map(|s| s.to_string()).collect()
    }

    async fn count(pool: &SqlitePool) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        works::count_works(&mut conn).await.unwrap()
    }

    #[tokio::test]
    async fn same_identifier_unions_contributors() {
        let pool = setup_test_db().await;

        let stats = reconcile(
            &pool,
            &[
                record(Some("Song"), &["A", "B"], Some("T-001-002-003-4")),
                record(Some("Song"), &["B", "C"], Some("T-001-002-003-4")),
            ],
        )
        .await;

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.records(), 2);
        assert_eq!(count(&pool).await, 1);
        assert_eq!(
            contributors_of(&pool, "T-001-002-003-4").await,
            vec!["A", "B", "C"]
        );
    }

    #[tokio::test]
    async fn title_is_first_writer_wins() {
        let pool = setup_test_db().await;

        reconcile(
            &pool,
            &[
                record(Some("Original"), &["A"], Some("T0000000001")),
                record(Some("Renamed"), &["B"], Some("T0000000001")),
            ],
        )
        .await;

        let mut conn = pool.acquire().await.unwrap();
        let work = works::find_by_iswc(&mut conn, "T0000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(work.title.as_deref(), Some("Original"));
        let merged: Vec<&str> = work.contributors.iter().collect();
        assert_eq!(merged, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn fuzzy_match_merges_into_existing_row() {
        let pool = setup_test_db().await;

        // Prior canonical row: "Song" by [B, C], no identifier
        {
            let mut conn = pool.acquire().await.unwrap();
            let existing = CanonicalWork::new(
                Some("Song".to_string()),
                vec!["B".to_string(), "C".to_string()].into(),
                None,
            );
            works::insert_work(&mut conn, &existing).await.unwrap();
        }

        let stats = reconcile(&pool, &[record(Some("Song"), &["A", "B"], None)]).await;

        assert_eq!(stats.absorbed, 1);
        assert_eq!(count(&pool).await, 1);

        let mut conn = pool.acquire().await.unwrap();
        let works = works::find_by_title(&mut conn, "Song").await.unwrap();
        let merged: Vec<&str> = works[0].contributors.iter().collect();
        assert_eq!(merged, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn fuzzy_match_requires_shared_contributor() {
        let pool = setup_test_db().await;

        reconcile(&pool, &[record(Some("Song"), &["A"], Some("T0000000001"))]).await;

        // Same title, disjoint contributors: no match, dropped
        let stats = reconcile(&pool, &[record(Some("Song"), &["Z"], None)]).await;

        assert_eq!(stats.dropped, 1);
        assert_eq!(count(&pool).await, 1);
        assert_eq!(contributors_of(&pool, "T0000000001").await, vec!["A"]);
    }

    #[tokio::test]
    async fn unmatched_record_is_dropped_by_default() {
        let pool = setup_test_db().await;

        let stats = reconcile(&pool, &[record(Some("New"), &["Z"], None)]).await;

        assert_eq!(stats.dropped, 1);
        assert_eq!(count(&pool).await, 0);
    }

    #[tokio::test]
    async fn unmatched_record_inserts_under_insert_new_policy() {
        let pool = setup_test_db().await;

        let stats = reconcile_with_policy(
            &pool,
            &[record(Some("New"), &["Z"], None)],
            UnmatchedPolicy::InsertNew,
        )
        .await;

        assert_eq!(stats.inserted, 1);
        assert_eq!(count(&pool).await, 1);

        let mut conn = pool.acquire().await.unwrap();
        let rows = works::find_by_title(&mut conn, "New").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].iswc, None);
    }

    #[tokio::test]
    async fn pass_two_sees_rows_created_by_pass_one_in_same_chunk() {
        let pool = setup_test_db().await;

        // Staging order puts the identifier-less record first; Pass 1
        // still runs before Pass 2, so the fuzzy record finds the row.
        let stats = reconcile(
            &pool,
            &[
                record(Some("Song"), &["A", "B"], None),
                record(Some("Song"), &["A"], Some("T0000000001")),
            ],
        )
        .await;

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.absorbed, 1);
        assert_eq!(count(&pool).await, 1);
        assert_eq!(contributors_of(&pool, "T0000000001").await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn fuzzy_record_merges_into_every_match() {
        let pool = setup_test_db().await;

        reconcile(
            &pool,
            &[
                record(Some("Song"), &["A"], Some("T0000000001")),
                record(Some("Song"), &["B"], Some("T0000000002")),
            ],
        )
        .await;

        // Shares a contributor with both canonical rows
        let stats = reconcile(&pool, &[record(Some("Song"), &["A", "B", "C"], None)]).await;

        assert_eq!(stats.absorbed, 1);
        assert_eq!(count(&pool).await, 2);
        assert_eq!(
            contributors_of(&pool, "T0000000001").await,
            vec!["A", "B", "C"]
        );
        assert_eq!(
            contributors_of(&pool, "T0000000002").await,
            vec!["A", "B", "C"]
        );
    }

    #[tokio::test]
    async fn absent_title_never_fuzzy_matches() {
        let pool = setup_test_db().await;

        reconcile(&pool, &[record(None, &["A"], Some("T0000000001"))]).await;

        let stats = reconcile(&pool, &[record(None, &["A"], None)]).await;

        assert_eq!(stats.dropped, 1);
        assert_eq!(count(&pool).await, 1);
        assert_eq!(contributors_of(&pool, "T0000000001").await, vec!["A"]);
    }

    #[tokio::test]
    async fn reconciling_same_chunk_twice_is_idempotent() {
        let pool = setup_test_db().await;

        let chunk = vec![
            record(Some("Song"), &["B", "A"], Some("T0000000001")),
            record(Some("Song"), &["A", "C"], None),
        ];

        reconcile(&pool, &chunk).await;
        let first: Vec<String> = contributors_of(&pool, "T0000000001").await;

        reconcile(&pool, &chunk).await;
        let second: Vec<String> = contributors_of(&pool, "T0000000001").await;

        assert_eq!(first, vec!["A", "B", "C"]);
        assert_eq!(first, second);
        assert_eq!(count(&pool).await, 1);
    }
}
