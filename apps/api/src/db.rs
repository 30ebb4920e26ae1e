use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

use crate::registry::query::fold_case;

/// Lowercased shadows of the searchable columns, added after the first schema.
const FOLDED_COLUMNS: [&str; 2] = ["company_folded", "job_title_folded"];

/// Opens (creating if needed) the SQLite database at `database_path` and
/// returns a connection pool with the schema in place.
pub async fn create_pool(database_path: &Path, max_connections: u32) -> Result<SqlitePool> {
    info!("Opening SQLite database at {}", database_path.display());

    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        // A returned insert must survive a crash, not just a clean shutdown.
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    migrate(&pool).await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Creates the `applications` table and its recency index if missing, and
/// brings tables from older databases up to the current columns.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY NOT NULL,
            company TEXT NOT NULL,
            job_title TEXT NOT NULL,
            job_description TEXT NOT NULL,
            upload_date TIMESTAMP NOT NULL,
            resume_hash TEXT NOT NULL,
            resume_path TEXT NOT NULL,
            company_folded TEXT NOT NULL DEFAULT '',
            job_title_folded TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    let existing: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info('applications')")
            .fetch_all(pool)
            .await?;
    for column in FOLDED_COLUMNS {
        if !existing.iter().any(|name| name == column) {
            info!("Adding column {column} to applications");
            sqlx::query(&format!(
                "ALTER TABLE applications ADD COLUMN {column} TEXT NOT NULL DEFAULT ''"
            ))
            .execute(pool)
            .await?;
        }
    }
    backfill_folded(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_applications_upload_date ON applications(upload_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Fills folded columns left empty by an upgrade. Company and job title are
/// never blank, so an empty folded value always means "not yet computed".
async fn backfill_folded(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let pending: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT id, company, job_title FROM applications \
         WHERE company_folded = '' OR job_title_folded = ''",
    )
    .fetch_all(pool)
    .await?;
    if pending.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for (id, company, job_title) in &pending {
        sqlx::query(
            "UPDATE applications SET company_folded = ?, job_title_folded = ? WHERE id = ?",
        )
        .bind(fold_case(company))
        .bind(fold_case(job_title))
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Backfilled folded search columns for {} applications", pending.len());
    Ok(())
}
