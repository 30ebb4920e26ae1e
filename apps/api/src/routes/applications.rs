use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationRecord, SummaryStats};
use crate::registry::ApplicationFilter;
use crate::state::AppState;
use crate::tracker::DEFAULT_RECENT_LIMIT;

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

/// Fields collected from the submission form.
#[derive(Default)]
struct SubmissionForm {
    company: String,
    job_title: String,
    job_description: String,
    resume: Option<(String, Bytes)>,
}

/// POST /api/v1/applications
/// Multipart form: `company`, `job_title`, `job_description`, and a `resume` file.
pub async fn handle_submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "company" => form.company = field.text().await.map_err(malformed)?,
            "job_title" => form.job_title = field.text().await.map_err(malformed)?,
            "job_description" => form.job_description = field.text().await.map_err(malformed)?,
            "resume" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                // Browsers send an unnamed, empty part when no file was chosen.
                if filename.trim().is_empty() && bytes.is_empty() {
                    tracing::debug!("Ignoring empty resume part with no filename");
                } else {
                    form.resume = Some((filename, bytes));
                }
            }
            other => tracing::debug!("Ignoring unexpected form field '{other}'"),
        }
    }

    let (filename, bytes) = form
        .resume
        .ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;

    let id = state
        .tracker
        .submit_application(
            &form.company,
            &form.job_title,
            &form.job_description,
            bytes,
            &filename,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SubmitResponse { id })))
}

fn malformed(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
}

/// GET /api/v1/applications?company=&job_title=&limit=
pub async fn handle_search(
    State(state): State<AppState>,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    Ok(Json(state.tracker.search(&filter).await?))
}

/// GET /api/v1/applications/recent
pub async fn handle_recent(
    State(state): State<AppState>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(state.tracker.recent_applications(limit).await?))
}

/// GET /api/v1/applications/:id/resume
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let download = state.tracker.download_resume(id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.file_name),
        ),
    ];
    Ok((headers, download.archive))
}

/// GET /api/v1/stats
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<SummaryStats>, AppError> {
    Ok(Json(state.tracker.get_summary_stats().await?))
}
