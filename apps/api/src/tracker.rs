//! Tracker: the library boundary used by the presentation layer.
//!
//! Composes the resume store and the registry: a submission is archived first,
//! then recorded with the archive's hash and path.

use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationRecord, SummaryStats};
use crate::registry::{ApplicationFilter, ApplicationRegistry, SubmitParams};
use crate::resume_store::{ResumeStore, ResumeStoreError};

/// Number of entries in the dashboard's recent list.
pub const DEFAULT_RECENT_LIMIT: u32 = 5;

/// A resume archive ready to hand back to the user.
#[derive(Debug, Clone)]
pub struct ResumeDownload {
    pub file_name: String,
    pub archive: Bytes,
}

#[derive(Clone)]
pub struct Tracker {
    resumes: Arc<dyn ResumeStore>,
    registry: ApplicationRegistry,
}

impl Tracker {
    pub fn new(resumes: Arc<dyn ResumeStore>, registry: ApplicationRegistry) -> Self {
        Self { resumes, registry }
    }

    pub fn registry(&self) -> &ApplicationRegistry {
        &self.registry
    }

    /// Archives the resume and records the application.
    ///
    /// Text fields are checked before anything touches storage, so a rejected
    /// submission leaves no archive behind.
    pub async fn submit_application(
        &self,
        company: &str,
        job_title: &str,
        job_description: &str,
        raw_file_bytes: Bytes,
        original_filename: &str,
    ) -> Result<Uuid, AppError> {
        let draft = SubmitParams {
            company,
            job_title,
            job_description,
            resume_hash: "",
            resume_path: "",
        };
        draft.validate()?;

        let stored = self.resumes.store(raw_file_bytes, original_filename).await?;

        let id = self
            .registry
            .submit(SubmitParams {
                resume_hash: &stored.content_hash,
                resume_path: &stored.archive_path,
                ..draft
            })
            .await?;
        Ok(id)
    }

    pub async fn search_applications(
        &self,
        company_filter: Option<&str>,
        job_title_filter: Option<&str>,
    ) -> Result<Vec<ApplicationRecord>, AppError> {
        self.search(&ApplicationFilter::new(company_filter, job_title_filter))
            .await
    }

    pub async fn search(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, AppError> {
        Ok(self.registry.query(filter).await?)
    }

    pub async fn recent_applications(&self, limit: u32) -> Result<Vec<ApplicationRecord>, AppError> {
        Ok(self.registry.recent(limit).await?)
    }

    pub async fn fetch_resume_bytes(&self, resume_path: &str) -> Result<Bytes, AppError> {
        Ok(self.resumes.retrieve(resume_path).await?)
    }

    pub async fn get_summary_stats(&self) -> Result<SummaryStats, AppError> {
        Ok(self.registry.summary_stats().await?)
    }

    /// Loads the resume archive attached to application `id`.
    pub async fn download_resume(&self, id: Uuid) -> Result<ResumeDownload, AppError> {
        let record = self.registry.get(id).await?;
        let archive = match self.resumes.retrieve(&record.resume_path).await {
            Ok(archive) => archive,
            Err(ResumeStoreError::NotFound(path)) => {
                warn!("Application {id} references missing resume archive {path}");
                return Err(AppError::NotFound(format!(
                    "Resume file for application {id} not found"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ResumeDownload {
            file_name: download_file_name(&record.job_title, &record.company),
            archive,
        })
    }
}

/// `{job_title}_{company}.zip`, with characters unsafe in a
/// `Content-Disposition` filename replaced by `_`.
pub fn download_file_name(job_title: &str, company: &str) -> String {
    let safe = |s: &str| -> String {
        s.chars()
            .map(|c| match c {
                '"' | '\\' | '/' | ':' | ';' => '_',
                c if c.is_control() || !c.is_ascii() => '_',
                c => c,
            })
            .collect()
    };
    format!("{}_{}.zip", safe(job_title), safe(company))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;
    use crate::db::create_pool;
    use crate::resume_store::{read_archive, FsResumeStore, MemoryResumeStore};

    async fn fs_tracker() -> (TempDir, Tracker) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsResumeStore::new(dir.path().join("resumes")).unwrap();
        let pool = create_pool(&dir.path().join("applications.db"), 2)
            .await
            .unwrap();
        let tracker = Tracker::new(Arc::new(store), ApplicationRegistry::new(pool));
        (dir, tracker)
    }

    fn archive_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "zip")
            })
            .count()
    }

    #[tokio::test]
    async fn test_shared_resume_content_is_archived_once() {
        let (dir, tracker) = fs_tracker().await;
        let now = chrono::Utc::now();
        let registry = tracker.registry();

        // Three submissions at distinct times with resumes "A", "A", "B".
        let mut ids = Vec::new();
        for (offset, content, company) in [(3, "A", "Acme"), (2, "A", "Globex"), (1, "B", "Initech")] {
            let stored = tracker
                .resumes
                .store(Bytes::from_static(content.as_bytes()), "cv.pdf")
                .await
                .unwrap();
            let id = registry
                .submit_at(
                    SubmitParams {
                        company,
                        job_title: "Engineer",
                        job_description: "Ship it.",
                        resume_hash: &stored.content_hash,
                        resume_path: &stored.archive_path,
                    },
                    now - Duration::minutes(offset),
                )
                .await
                .unwrap();
            ids.push(id);
        }

        assert_eq!(archive_count(&dir.path().join("resumes")), 2);

        let records = tracker.search_applications(None, None).await.unwrap();
        assert_eq!(records.len(), 3);
        let newest_first: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(newest_first, vec![ids[2], ids[1], ids[0]]);

        let by_company = |name: &str| records.iter().find(|r| r.company == name).unwrap();
        assert_eq!(by_company("Acme").resume_hash, by_company("Globex").resume_hash);
        assert_eq!(by_company("Acme").resume_path, by_company("Globex").resume_path);
        assert_ne!(by_company("Acme").resume_hash, by_company("Initech").resume_hash);
    }

    #[tokio::test]
    async fn test_submit_application_end_to_end() {
        let (_dir, tracker) = fs_tracker().await;

        let id = tracker
            .submit_application(
                "Acme",
                "Engineer",
                "Build rockets.",
                Bytes::from_static(b"%PDF resume"),
                "me.pdf",
            )
            .await
            .unwrap();

        let records = tracker.search_applications(Some("acme"), None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);

        let archive = tracker.fetch_resume_bytes(&records[0].resume_path).await.unwrap();
        let file = read_archive(&archive).unwrap();
        assert_eq!(file.filename, "me.pdf");
        assert_eq!(file.bytes, b"%PDF resume");

        let stats = tracker.get_summary_stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.distinct_companies, 1);
        assert_eq!(stats.recent_count, 1);
    }

    #[tokio::test]
    async fn test_invalid_submission_writes_nothing() {
        let (dir, tracker) = fs_tracker().await;

        let err = tracker
            .submit_application("", "Engineer", "desc", Bytes::from_static(b"cv"), "cv.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(archive_count(&dir.path().join("resumes")), 0);
        assert_eq!(tracker.get_summary_stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_download_resume_uses_title_and_company() {
        let (_dir, tracker) = fs_tracker().await;
        let id = tracker
            .submit_application("Acme", "Engineer", "desc", Bytes::from_static(b"cv"), "cv.pdf")
            .await
            .unwrap();

        let download = tracker.download_resume(id).await.unwrap();
        assert_eq!(download.file_name, "Engineer_Acme.zip");
        assert_eq!(read_archive(&download.archive).unwrap().bytes, b"cv");
    }

    #[tokio::test]
    async fn test_missing_archive_is_reported_but_metadata_survives() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&dir.path().join("applications.db"), 1)
            .await
            .unwrap();
        let store = Arc::new(MemoryResumeStore::new());
        let tracker = Tracker::new(store.clone(), ApplicationRegistry::new(pool));

        let id = tracker
            .submit_application("Acme", "Engineer", "desc", Bytes::from_static(b"cv"), "cv.pdf")
            .await
            .unwrap();
        let record = tracker.registry().get(id).await.unwrap();
        assert!(store.evict(&record.resume_hash).await);

        let err = tracker.download_resume(id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = tracker.fetch_resume_bytes(&record.resume_path).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let records = tracker.search_applications(None, None).await.unwrap();
        assert_eq!(records, vec![record]);
    }

    #[tokio::test]
    async fn test_recent_applications_caps_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&dir.path().join("applications.db"), 1)
            .await
            .unwrap();
        let tracker = Tracker::new(
            Arc::new(MemoryResumeStore::new()),
            ApplicationRegistry::new(pool),
        );
        for i in 0..7 {
            tracker
                .submit_application(
                    &format!("Company {i}"),
                    "Engineer",
                    "desc",
                    Bytes::from(format!("resume {i}")),
                    "cv.pdf",
                )
                .await
                .unwrap();
        }

        let recent = tracker.recent_applications(DEFAULT_RECENT_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 5);
    }

    #[test]
    fn test_download_file_name_is_header_safe() {
        assert_eq!(download_file_name("Engineer", "Acme"), "Engineer_Acme.zip");
        assert_eq!(
            download_file_name("Sr. \"Rust\" Dev", "A/B; Co"),
            "Sr. _Rust_ Dev_A_B_ Co.zip"
        );
        assert_eq!(download_file_name("Ingénieur", "Société"), "Ing_nieur_Soci_t_.zip");
    }
}
