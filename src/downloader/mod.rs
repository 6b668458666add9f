//! Core downloader implementation split into focused submodules.
//!
//! The `ArchiveDownloader` struct and its methods are organized by domain:
//! - [`jobs`] - Job submission and status queries
//! - [`session`] - Login/logout and the project/subject catalog
//! - [`lifecycle`] - Shutdown coordination

mod jobs;
mod lifecycle;
mod session;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use jobs::JobSubmission;

use crate::archive::{ArchiveClient, XnatClient};
use crate::config::Config;
use crate::credentials::SessionStore;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::registry::JobRegistry;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Orchestration runs and shutdown state
#[derive(Clone)]
pub(crate) struct JobState {
    /// Background orchestration runs (one per submitted job)
    pub(crate) in_flight: TaskTracker,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled once shutdown has drained; stops the API server
    pub(crate) shutdown_token: CancellationToken,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ArchiveDownloader {
    /// Job registry shared with the orchestrator
    pub(crate) registry: Arc<JobRegistry>,
    /// Logged-in sessions; also the credential resolver of every item task
    pub(crate) sessions: Arc<SessionStore>,
    /// Archive client used for login checks and catalog listings
    pub(crate) archive: Arc<dyn ArchiveClient>,
    /// Runs the item tasks of submitted jobs
    pub(crate) orchestrator: Orchestrator,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<crate::types::Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Orchestration runs and shutdown state
    pub(crate) job_state: JobState,
}

impl ArchiveDownloader {
    /// Create a downloader talking to the XNAT archive at `config.archive.base_url`
    ///
    /// Validates the configuration and creates the output directory.
    pub async fn new(config: Config) -> Result<Self> {
        let archive = XnatClient::new(&config.archive.base_url, config.archive.request_timeout)?;
        Self::with_archive(config, Arc::new(archive)).await
    }

    /// Create a downloader with a custom [`ArchiveClient`]
    pub async fn with_archive(config: Config, archive: Arc<dyn ArchiveClient>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.download.output_dir.display(),
                        e
                    ),
                ))
            })?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Arc::new(JobRegistry::new());
        let sessions = Arc::new(SessionStore::new());

        let orchestrator = Orchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&archive),
            Arc::clone(&sessions) as Arc<dyn crate::credentials::CredentialResolver>,
            event_tx.clone(),
            config.download.output_dir.clone(),
        )
        .with_max_concurrent_tasks(config.download.max_concurrent_tasks)
        .with_artifact_extension(config.download.artifact_extension.clone());

        tracing::info!(
            archive = %config.archive.base_url,
            output_dir = %config.download.output_dir.display(),
            max_concurrent_tasks = orchestrator.max_concurrent_tasks(),
            "archive downloader initialized"
        );

        Ok(Self {
            registry,
            sessions,
            archive,
            orchestrator,
            event_tx,
            config: Arc::new(config),
            job_state: JobState {
                in_flight: TaskTracker::new(),
                accepting_new: Arc::new(AtomicBool::new(true)),
                shutdown_token: CancellationToken::new(),
            },
        })
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives all events independently. A subscriber that falls
    /// behind by more than 1000 events receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::types::Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers; dropped if nobody listens
    pub(crate) fn emit_event(&self, event: crate::types::Event) {
        self.event_tx.send(event).ok();
    }

    /// Token cancelled when shutdown completes
    pub fn shutdown_token(&self) -> CancellationToken {
        self.job_state.shutdown_token.clone()
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:8000) and stops
    /// once [`shutdown`](Self::shutdown) has completed.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
