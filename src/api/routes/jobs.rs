//! Job submission and status handlers.

use super::{SubmitJobRequest, SubmitJobResponse};
use crate::api::AppState;
use crate::api::auth::SessionToken;
use crate::downloader::JobSubmission;
use crate::error::Error;
use crate::types::JobId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// POST /download - Submit a download job
///
/// Responds as soon as the job is registered; items are fetched in the
/// background. Poll `/download/status/{job_id}` for progress.
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "jobs",
    request_body = SubmitJobRequest,
    params(
        ("X-Session-Token" = Option<String>, Header, description = "Session token from /api/login")
    ),
    responses(
        (status = 202, description = "Job accepted", body = SubmitJobResponse),
        (status = 400, description = "Invalid job id or project", body = crate::error::ApiError),
        (status = 409, description = "Job id already in use", body = crate::error::ApiError),
        (status = 429, description = "Too many submissions", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    token: SessionToken,
    Json(request): Json<SubmitJobRequest>,
) -> Result<impl IntoResponse, Error> {
    let job_id: JobId = request.download_job_id.parse()?;

    // The orchestration keeps running after the handle is dropped
    let _handle = state
        .downloader
        .submit_job(JobSubmission {
            job_id,
            project_id: request.project_id,
            item_ids: request.subject_ids,
            auth_token: token.into_inner(),
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            message: format!("Download job for job ID {job_id} initiated"),
            download_job_id: job_id.to_string(),
        }),
    ))
}

/// GET /download/status/:job_id - Status of every item in a job
#[utoipa::path(
    get,
    path = "/api/download/status/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job id (UUID)")
    ),
    responses(
        (status = 200, description = "Item id to status", body = inline(Object)),
        (status = 400, description = "Malformed job id", body = crate::error::ApiError),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let job_id: JobId = job_id.parse()?;
    let status = state.downloader.job_status(job_id).await?;
    Ok(Json(status))
}

/// GET /download/status/:job_id/:item_id - Status of one item
#[utoipa::path(
    get,
    path = "/api/download/status/{job_id}/{item_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job id (UUID)"),
        ("item_id" = String, Path, description = "Subject id")
    ),
    responses(
        (status = 200, description = "Item id and status", body = inline(Object)),
        (status = 404, description = "Unknown job or item", body = crate::error::ApiError)
    )
)]
pub async fn item_status(
    State(state): State<AppState>,
    Path((job_id, item_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    let job_id: JobId = job_id.parse()?;
    let status = state.downloader.item_status(job_id, &item_id).await?;
    Ok(Json(json!({ "item_id": item_id, "status": status })))
}

/// GET /download/summary/:job_id - Per-state counts and completion flag
#[utoipa::path(
    get,
    path = "/api/download/summary/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job id (UUID)")
    ),
    responses(
        (status = 200, description = "Job summary", body = crate::types::JobSummary),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn job_summary(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let job_id: JobId = job_id.parse()?;
    let summary = state.downloader.job_summary(job_id).await?;
    Ok(Json(summary))
}
