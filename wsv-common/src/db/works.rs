//! Canonical store surface for musical works
//!
//! Operations take a `&mut SqliteConnection` so the reconciler can run a
//! whole chunk (both linkage passes) inside one transaction and commit it
//! atomically.

use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::model::ContributorSet;
use crate::{Error, Result};

/// One persisted, deduplicated work record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalWork {
    pub guid: Uuid,
    pub title: Option<String>,
    pub contributors: ContributorSet,
    pub iswc: Option<String>,
}

impl CanonicalWork {
    /// Create a new canonical work with a fresh guid
    pub fn new(
        title: Option<String>,
        contributors: ContributorSet,
        iswc: Option<String>,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            title,
            contributors,
            iswc,
        }
    }
}

fn row_to_work(row: &sqlx::sqlite::SqliteRow) -> Result<CanonicalWork> {
    let guid_str: String = row.get("guid");
    let contributors_json: String = row.get("contributors");

    Ok(CanonicalWork {
        guid: Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))?,
        title: row.get("title"),
        contributors: ContributorSet::from_json(&contributors_json)?,
        iswc: row.get("iswc"),
    })
}

/// Look up the canonical work carrying the given identifier, if any
pub async fn find_by_iswc(
    conn: &mut SqliteConnection,
    iswc: &str,
) -> Result<Option<CanonicalWork>> {
    let row = sqlx::query(
        r#"
        SELECT guid, title, contributors, iswc
        FROM musical_works
        WHERE iswc = ?
        "#,
    )
    .bind(iswc)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_work(&row)?)),
        None => Ok(None),
    }
}

/// Fetch fuzzy-linkage candidates: all canonical works with exactly this
/// title (case-sensitive). Contributor-intersection filtering happens in
/// the caller against the decoded sets.
pub async fn find_by_title(
    conn: &mut SqliteConnection,
    title: &str,
) -> Result<Vec<CanonicalWork>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, title, contributors, iswc
        FROM musical_works
        WHERE title = ?
        "#,
    )
    .bind(title)
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_work).collect()
}

/// Insert a new canonical work
pub async fn insert_work(conn: &mut SqliteConnection, work: &CanonicalWork) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO musical_works (guid, title, contributors, iswc, created_at, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(work.guid.to_string())
    .bind(&work.title)
    .bind(work.contributors.to_json()?)
    .bind(&work.iswc)
    .execute(conn)
    .await?;

    Ok(())
}

/// Replace a canonical work's contributor set (the union-merge write path)
pub async fn update_contributors(
    conn: &mut SqliteConnection,
    guid: Uuid,
    contributors: &ContributorSet,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE musical_works
        SET contributors = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(contributors.to_json()?)
    .bind(guid.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// Count canonical rows
pub async fn count_works(conn: &mut SqliteConnection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM musical_works")
        .fetch_one(conn)
        .await?;
    Ok(count)
}
