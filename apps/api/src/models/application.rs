use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::fmt::Hyphenated;
use uuid::Uuid;

/// One submitted job application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub company: String,
    pub job_title: String,
    pub job_description: String,
    pub submitted_at: DateTime<Utc>,
    pub resume_hash: String,
    pub resume_path: String,
}

/// Row shape of the `applications` table; `id` is stored as hyphenated text.
#[derive(Debug, FromRow)]
pub struct ApplicationRow {
    pub id: Hyphenated,
    pub company: String,
    pub job_title: String,
    pub job_description: String,
    #[sqlx(rename = "upload_date")]
    pub submitted_at: DateTime<Utc>,
    pub resume_hash: String,
    pub resume_path: String,
}

impl From<ApplicationRow> for ApplicationRecord {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id.into_uuid(),
            company: row.company,
            job_title: row.job_title,
            job_description: row.job_description,
            submitted_at: row.submitted_at,
            resume_hash: row.resume_hash,
            resume_path: row.resume_path,
        }
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SummaryStats {
    pub total: i64,
    pub distinct_companies: i64,
    /// Records submitted in the trailing seven days, both ends inclusive.
    pub recent_count: i64,
}
