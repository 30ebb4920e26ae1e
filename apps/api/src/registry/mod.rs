//! Application Registry: durable application records and recency-ordered search.
//!
//! Records are append-only: one INSERT per submission, never updated or deleted.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::application::{ApplicationRecord, ApplicationRow, SummaryStats};

pub mod error;
pub mod query;

pub use error::RegistryError;
pub use query::ApplicationFilter;

use query::fold_case;

/// Width of the "recent" window reported by [`ApplicationRegistry::summary_stats`].
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Parameters for recording a new application.
#[derive(Debug, Clone, Copy)]
pub struct SubmitParams<'a> {
    pub company: &'a str,
    pub job_title: &'a str,
    pub job_description: &'a str,
    pub resume_hash: &'a str,
    pub resume_path: &'a str,
}

impl SubmitParams<'_> {
    /// Checks the required text fields, returning them trimmed.
    pub fn validate(&self) -> Result<(&str, &str, &str), RegistryError> {
        Ok((
            required("company", self.company)?,
            required("job_title", self.job_title)?,
            required("job_description", self.job_description)?,
        ))
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, RegistryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

/// Registry over an injected SQLite pool.
#[derive(Clone)]
pub struct ApplicationRegistry {
    pool: SqlitePool,
}

impl ApplicationRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Records an application stamped with the current instant.
    pub async fn submit(&self, params: SubmitParams<'_>) -> Result<Uuid, RegistryError> {
        self.submit_at(params, Utc::now()).await
    }

    /// Records an application with an explicit submission time.
    pub async fn submit_at(
        &self,
        params: SubmitParams<'_>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Uuid, RegistryError> {
        let (company, job_title, job_description) = params.validate()?;
        let id = Uuid::new_v4();
        let submitted_at = submitted_at.trunc_subsecs(6);

        sqlx::query(
            r#"
            INSERT INTO applications
                (id, company, job_title, job_description, upload_date, resume_hash, resume_path,
                 company_folded, job_title_folded)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.hyphenated())
        .bind(company)
        .bind(job_title)
        .bind(job_description)
        .bind(submitted_at)
        .bind(params.resume_hash)
        .bind(params.resume_path)
        .bind(fold_case(company))
        .bind(fold_case(job_title))
        .execute(&self.pool)
        .await?;

        info!("Recorded application {id} ({job_title} at {company})");
        Ok(id)
    }

    /// Records matching `filter`, newest first.
    pub async fn query(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, RegistryError> {
        let mut builder = filter.build();
        debug!("Searching applications: {}", builder.sql());

        let rows = builder
            .build_query_as::<ApplicationRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ApplicationRecord::from).collect())
    }

    /// The `limit` most recently submitted records.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ApplicationRecord>, RegistryError> {
        self.query(&ApplicationFilter::default().with_limit(limit)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<ApplicationRecord, RegistryError> {
        let row: Option<ApplicationRow> = sqlx::query_as(&format!(
            "{} WHERE id = ?",
            query::SELECT_APPLICATIONS
        ))
        .bind(id.hyphenated())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApplicationRecord::from)
            .ok_or(RegistryError::NotFound(id))
    }

    pub async fn summary_stats(&self) -> Result<SummaryStats, RegistryError> {
        self.summary_stats_at(Utc::now()).await
    }

    /// Counters as seen at `now`. The recent window is
    /// `now - 7 days ..= now`.
    pub async fn summary_stats_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SummaryStats, RegistryError> {
        let now = now.trunc_subsecs(6);
        let window_start = now - Duration::days(RECENT_WINDOW_DAYS);

        let stats = sqlx::query_as::<_, SummaryStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(DISTINCT company) AS distinct_companies,
                COALESCE(SUM(CASE WHEN upload_date >= ? AND upload_date <= ? THEN 1 ELSE 0 END), 0)
                    AS recent_count
            FROM applications
            "#,
        )
        .bind(window_start)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
