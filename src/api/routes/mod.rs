//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Job submission, status and summary
//! - [`catalog`] - Projects and subjects
//! - [`session`] - Login and logout
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

mod catalog;
mod jobs;
mod session;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use catalog::*;
pub use jobs::*;
pub use session::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Body of `POST /api/download`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitJobRequest {
    /// Client-generated job id (UUID)
    pub download_job_id: String,
    /// Project the subjects belong to
    pub project_id: String,
    /// Subjects to download
    #[serde(default)]
    pub subject_ids: Vec<String>,
}

/// Acknowledgement of an accepted job
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitJobResponse {
    /// Human-readable acknowledgement
    pub message: String,
    /// The accepted job id
    pub download_job_id: String,
}

/// Body of `POST /api/login`
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Archive username
    pub username: String,
    /// Archive password
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login result; `login_status` is 0 on success and 1 on failure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// 0 = logged in, 1 = rejected
    pub login_status: u8,
    /// Token to send as `X-Session-Token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
