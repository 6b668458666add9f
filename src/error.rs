//! Error types for archive-dl
//!
//! This module provides the error taxonomy for the library:
//! - Registry contract violations (duplicate job, unknown job or item)
//! - Archive-side failures (connection, authentication, transfer)
//! - Credential resolution failures
//! - HTTP status code mapping and structured JSON error bodies for the API

use crate::types::JobId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for archive-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for archive-dl
///
/// Only registry and submission errors ever reach an HTTP caller synchronously.
/// Per-item failures (auth, archive, I/O) are captured inside the item's task and
/// recorded as a `failed` status instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "OUTPUT_DIR")
        key: Option<String>,
    },

    /// Job registry contract violation
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Remote archive failure
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Credential resolution failure
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Submitted job identifier is not a valid UUID
    #[error("invalid job id: {0}")]
    InvalidJobId(String),

    /// Request failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Job registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A job with this identifier was already submitted
    #[error("job {job_id} already exists")]
    DuplicateJob {
        /// The job ID that is already registered
        job_id: JobId,
    },

    /// No job with this identifier exists
    #[error("job {job_id} not found")]
    UnknownJob {
        /// The job ID that was not found
        job_id: JobId,
    },

    /// The job exists but does not contain this item
    #[error("item {item_id} not found in job {job_id}")]
    UnknownItem {
        /// The job that was searched
        job_id: JobId,
        /// The item that is not part of the job
        item_id: String,
    },
}

/// Remote archive errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive rejected the supplied credentials
    #[error("archive rejected credentials: {0}")]
    Authentication(String),

    /// Could not reach the archive or open a session
    #[error("could not connect to archive: {0}")]
    Connection(String),

    /// The requested project, subject or experiment does not exist
    #[error("archive resource not found: {0}")]
    NotFound(String),

    /// The archive answered with an unexpected HTTP status
    #[error("archive returned HTTP {status} for {url}")]
    UnexpectedStatus {
        /// HTTP status code returned by the archive
        status: u16,
        /// The request URL
        url: String,
    },

    /// The archive response body could not be decoded
    #[error("invalid archive response: {0}")]
    InvalidResponse(String),

    /// A file transfer broke off; any partial file has been discarded
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// A request URL could not be built from the configured base URL
    #[error("invalid archive URL: {0}")]
    InvalidUrl(String),
}

/// Credential resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No session token accompanied the request
    #[error("missing session token")]
    MissingToken,

    /// The session token does not belong to any logged-in session
    #[error("unknown or expired session token")]
    UnknownSession,

    /// Login was attempted with credentials the archive refused
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "registry error: job 0b9f... not found",
///     "details": {
///       "job_id": "0b9f..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "invalid_job_id")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error (job_id, item_id, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "rate limited" error
    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        Self::with_details(
            "rate_limited",
            "Too many download requests",
            serde_json::json!({ "retry_after_seconds": retry_after_seconds }),
        )
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::InvalidJobId(_) => 400,
            Error::Validation(_) => 400,

            Error::Auth(_) => 401,

            Error::Registry(RegistryError::DuplicateJob { .. }) => 409,
            Error::Registry(RegistryError::UnknownJob { .. }) => 404,
            Error::Registry(RegistryError::UnknownItem { .. }) => 404,

            Error::Archive(ArchiveError::Authentication(_)) => 401,
            Error::Archive(ArchiveError::NotFound(_)) => 404,
            Error::Archive(_) => 502,
            Error::Network(_) => 502,

            Error::ShuttingDown => 503,

            Error::Io(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidJobId(_) => "invalid_job_id",
            Error::Validation(_) => "validation_error",

            Error::Auth(AuthError::InvalidCredentials) => "invalid_credentials",
            Error::Auth(_) => "unauthorized",

            Error::Registry(RegistryError::DuplicateJob { .. }) => "duplicate_job",
            Error::Registry(RegistryError::UnknownJob { .. }) => "job_not_found",
            Error::Registry(RegistryError::UnknownItem { .. }) => "item_not_found",

            Error::Archive(ArchiveError::Authentication(_)) => "archive_unauthorized",
            Error::Archive(ArchiveError::NotFound(_)) => "archive_not_found",
            Error::Archive(_) => "archive_error",
            Error::Network(_) => "network_error",

            Error::ShuttingDown => "shutting_down",

            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Registry(RegistryError::DuplicateJob { job_id })
            | Error::Registry(RegistryError::UnknownJob { job_id }) => {
                Some(serde_json::json!({ "job_id": job_id }))
            }
            Error::Registry(RegistryError::UnknownItem { job_id, item_id }) => {
                Some(serde_json::json!({
                    "job_id": job_id,
                    "item_id": item_id,
                }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
