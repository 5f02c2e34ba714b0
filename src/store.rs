//! Durable paper store backed by SQLite.
//!
//! Uses SQLx with SQLite for lightweight, embedded storage. One row per
//! paper, keyed by the exact original title. The store is what makes
//! reruns cheap: a paper seen on a previous run is skipped before any
//! translation request is made, and digests are always rendered from
//! whatever rows are committed.
//!
//! Rows are never deleted here; reprocessing a known title updates the
//! row in place, which keeps its original insertion position (`rowid`)
//! and with it the digest ordering.

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

use crate::models::StoredRecord;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS papers (
    title               TEXT PRIMARY KEY,
    translated_title    TEXT NOT NULL,
    translated_summary  TEXT NOT NULL,
    link                TEXT NOT NULL,
    date                TEXT NOT NULL,
    category            TEXT NOT NULL
)
"#;

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_papers_date_category ON papers(date, category)";

/// Build a SQLite database URL from a file path.
pub fn db_url(path: &str) -> String {
    format!("sqlite:{path}")
}

/// Handle to the paper store.
///
/// Cheap to share by reference; all methods take `&self` and go through
/// an internal connection pool.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the store at `path`, creating the file and schema on first use.
    ///
    /// The parent directory is created if missing so a fresh checkout can
    /// run with the default config.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created, opened, or the
    /// schema statement fails.
    pub async fn open(path: &str) -> Result<Store, sqlx::Error> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }

        let url = db_url(path);
        if !sqlx::Sqlite::database_exists(&url).await.unwrap_or(false) {
            sqlx::Sqlite::create_database(&url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await?;

        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&pool).await?;

        info!(path, "opened paper store");
        Ok(Store { pool })
    }

    /// Whether a paper with exactly this original title is already stored.
    ///
    /// The check is global, not per category or date: a paper announced in
    /// several category feeds is translated only once.
    pub async fn exists(&self, title: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM papers WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert a record, or overwrite the stored translation if the title
    /// is already present.
    ///
    /// `INSERT OR REPLACE` would assign a fresh rowid and push the paper
    /// to the end of its digest; the conflict-update form keeps it in
    /// place.
    pub async fn upsert(&self, record: &StoredRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO papers (title, translated_title, translated_summary, link, date, category)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                translated_title = excluded.translated_title,
                translated_summary = excluded.translated_summary,
                link = excluded.link,
                date = excluded.date,
                category = excluded.category
            "#,
        )
        .bind(&record.title)
        .bind(&record.translated_title)
        .bind(&record.translated_summary)
        .bind(&record.link)
        .bind(&record.date)
        .bind(&record.category)
        .execute(&self.pool)
        .await?;

        debug!(title = %record.title, "upserted paper");
        Ok(())
    }

    /// All records for one `(date, category)` pair, in insertion order.
    pub async fn records_for(
        &self,
        date: &str,
        category: &str,
    ) -> Result<Vec<StoredRecord>, sqlx::Error> {
        sqlx::query_as::<_, StoredRecord>(
            r#"
            SELECT title, translated_title, translated_summary, link, date, category
            FROM papers
            WHERE date = ? AND category = ?
            ORDER BY rowid
            "#,
        )
        .bind(date)
        .bind(category)
        .fetch_all(&self.pool)
        .await
    }

    /// Total number of stored papers, for the end-of-run summary.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM papers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the pool. Further calls on this store will fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
