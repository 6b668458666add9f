//! Project and subject catalog handlers.

use crate::api::AppState;
use crate::api::auth::SessionToken;
use crate::error::Error;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

/// GET /projects - Projects offered for download
#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "catalog",
    responses(
        (status = 200, description = "Project ids", body = Vec<String>)
    )
)]
pub async fn list_projects(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.list_projects())
}

/// GET /projects/:project_id - Subjects of a project
#[utoipa::path(
    get,
    path = "/api/projects/{project_id}",
    tag = "catalog",
    params(
        ("project_id" = String, Path, description = "Project id"),
        ("X-Session-Token" = Option<String>, Header, description = "Session token; anonymous access if absent")
    ),
    responses(
        (status = 200, description = "Subject labels", body = Vec<String>),
        (status = 401, description = "Unknown session token", body = crate::error::ApiError),
        (status = 404, description = "Unknown project", body = crate::error::ApiError),
        (status = 502, description = "Archive unavailable", body = crate::error::ApiError)
    )
)]
pub async fn list_subjects(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    token: SessionToken,
) -> Result<impl IntoResponse, Error> {
    let subjects = state
        .downloader
        .list_subjects(&project_id, token.as_deref())
        .await?;
    Ok(Json(subjects))
}
