//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the archive-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the archive-dl REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "archive-dl REST API",
        version = "0.1.0",
        description = "REST API for submitting imaging archive download jobs and tracking per-subject progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::job_status,
        crate::api::routes::item_status,
        crate::api::routes::job_summary,

        // Catalog
        crate::api::routes::list_projects,
        crate::api::routes::list_subjects,

        // Session
        crate::api::routes::login,
        crate::api::routes::logout,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::ItemStatus,
        crate::types::JobSummary,
        crate::types::Event,

        // API request/response types from routes
        crate::api::routes::SubmitJobRequest,
        crate::api::routes::SubmitJobResponse,
        crate::api::routes::LoginRequest,
        crate::api::routes::LoginResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Download jobs - Submit jobs and poll per-subject status"),
        (name = "catalog", description = "Catalog - Projects and their subjects"),
        (name = "session", description = "Sessions - Log in against the archive and obtain a session token"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the session-token header scheme to the spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "session_token",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Session-Token"),
                    ),
                ),
            );
        }
    }
}
