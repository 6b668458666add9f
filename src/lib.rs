//! # archive-dl
//!
//! Bulk download service for an XNAT imaging archive.
//!
//! A client submits a *job*: a project and a list of subjects. Each subject
//! becomes an item that moves through
//! `queued -> in_progress -> complete | failed | no_data_to_download` while a
//! bounded pool of tasks fetches the subject's imaging session from the
//! archive. Job status is queryable at any time, from the library or over the
//! REST API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use archive_dl::{ArchiveDownloader, Config, JobId, JobSubmission};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = ArchiveDownloader::new(Config::default()).await?;
//!     let token = downloader.login("alice", "secret").await?;
//!
//!     let job_id = JobId::new_v4();
//!     let handle = downloader
//!         .submit_job(JobSubmission {
//!             job_id,
//!             project_id: "NP1173".into(),
//!             item_ids: vec!["NP1173_001".into(), "NP1173_002".into()],
//!             auth_token: Some(token),
//!         })
//!         .await?;
//!
//!     println!("{:?}", downloader.job_status(job_id).await?);
//!     let report = handle.await?;
//!     println!("{:?}", report.outcomes);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Archive client abstraction and the XNAT implementation
pub mod archive;
/// Configuration types
pub mod config;
/// Credentials and session-token resolution
pub mod credentials;
/// Downloader facade (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Logging setup
pub mod logging;
/// Bounded-concurrency execution of a job's items
pub mod orchestrator;
/// In-memory job registry
pub mod registry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archive::{ArchiveClient, ArchiveSession, Experiment, XnatClient};
pub use config::Config;
pub use credentials::{CredentialResolver, Credentials, SessionStore};
pub use downloader::{ArchiveDownloader, JobSubmission};
pub use error::{
    ApiError, ArchiveError, AuthError, Error, ErrorDetail, RegistryError, Result, ToHttpStatus,
};
pub use orchestrator::{JobRequest, Orchestrator};
pub use registry::JobRegistry;
pub use types::{Event, ItemOutcome, ItemStatus, JobId, JobReport, JobStatus, JobSummary};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which drains running jobs and stops the API server.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use archive_dl::{ArchiveDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = ArchiveDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: ArchiveDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

/// Resolves on SIGTERM (container stop) or Ctrl+C.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "stopping archive-dl"),
                _ = ctrl_c() => tracing::info!(signal = "SIGINT", "stopping archive-dl"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, stopping on Ctrl+C only");
            ctrl_c().await;
            tracing::info!(signal = "SIGINT", "stopping archive-dl");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
    tracing::info!(signal = "Ctrl+C", "stopping archive-dl");
}

/// Ctrl+C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}
