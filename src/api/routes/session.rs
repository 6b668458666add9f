//! Login and logout handlers.

use super::{LoginRequest, LoginResponse};
use crate::api::AppState;
use crate::api::auth::SessionToken;
use crate::error::{AuthError, Error};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /login - Check archive credentials and open a session
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Credentials rejected", body = LoginResponse),
        (status = 502, description = "Archive unavailable", body = crate::error::ApiError)
    )
)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Response {
    match state
        .downloader
        .login(&request.username, &request.password)
        .await
    {
        Ok(token) => (
            StatusCode::OK,
            Json(LoginResponse {
                login_status: 0,
                session_token: Some(token),
                message: None,
            }),
        )
            .into_response(),
        Err(Error::Auth(AuthError::InvalidCredentials)) => (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                login_status: 1,
                session_token: None,
                message: Some(AuthError::InvalidCredentials.to_string()),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /logout - Forget the session token
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "session",
    params(
        ("X-Session-Token" = String, Header, description = "Session token to drop")
    ),
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Missing or unknown token", body = crate::error::ApiError)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<StatusCode, Error> {
    let token = token.into_inner().ok_or(AuthError::MissingToken)?;
    if state.downloader.logout(&token).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AuthError::UnknownSession.into())
    }
}
