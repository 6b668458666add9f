//! Shared test helpers: a scripted in-memory archive and downloader factories.

use crate::archive::{ArchiveClient, ArchiveSession, Experiment};
use crate::config::Config;
use crate::credentials::Credentials;
use crate::downloader::ArchiveDownloader;
use crate::error::ArchiveError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

/// Scripted behaviour of one subject in [`FakeArchive`]
#[derive(Clone, Debug)]
pub(crate) enum SubjectScript {
    /// Subject has this many experiments and downloads succeed
    Experiments(usize),
    /// Listing the subject's experiments fails
    ListError,
    /// Listing succeeds but the transfer breaks off
    TransferError,
    /// Listing panics inside the task
    Panic,
}

#[derive(Default)]
struct FakeArchiveState {
    subjects: HashMap<String, SubjectScript>,
    projects: HashMap<String, Vec<String>>,
    accepted: Option<Credentials>,
    io_delay: Duration,
    connects: AtomicUsize,
    closes: AtomicUsize,
    downloads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory [`ArchiveClient`] with per-subject scripts and call counters
///
/// Unknown subjects answer `NotFound`. Every listing and transfer counts as
/// network I/O for the in-flight high-water mark.
#[derive(Clone, Default)]
pub(crate) struct FakeArchive {
    state: Arc<FakeArchiveState>,
}

impl FakeArchive {
    pub(crate) fn builder() -> FakeArchiveBuilder {
        FakeArchiveBuilder::default()
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn downloads(&self) -> usize {
        self.state.downloads.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct FakeArchiveBuilder {
    state: FakeArchiveState,
}

impl FakeArchiveBuilder {
    pub(crate) fn subject(mut self, id: &str, script: SubjectScript) -> Self {
        self.state.subjects.insert(id.to_string(), script);
        self
    }

    pub(crate) fn project(mut self, id: &str, subjects: &[&str]) -> Self {
        self.state.projects.insert(
            id.to_string(),
            subjects.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Only these credentials may connect (default: anyone)
    pub(crate) fn accept_only(mut self, credentials: Credentials) -> Self {
        self.state.accepted = Some(credentials);
        self
    }

    pub(crate) fn io_delay(mut self, delay: Duration) -> Self {
        self.state.io_delay = delay;
        self
    }

    pub(crate) fn build(self) -> FakeArchive {
        FakeArchive {
            state: Arc::new(self.state),
        }
    }
}

#[async_trait]
impl ArchiveClient for FakeArchive {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ArchiveSession>, ArchiveError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self
            .state
            .accepted
            .as_ref()
            .is_some_and(|accepted| accepted != credentials)
        {
            return Err(ArchiveError::Authentication("bad credentials".into()));
        }
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<FakeArchiveState>,
}

impl FakeSession {
    async fn simulate_io(&self) {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.state.io_delay).await;
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArchiveSession for FakeSession {
    async fn list_subjects(&self, project_id: &str) -> Result<Vec<String>, ArchiveError> {
        self.state
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(format!("project {project_id}")))
    }

    async fn list_experiments(
        &self,
        _project_id: &str,
        subject_id: &str,
    ) -> Result<Vec<Experiment>, ArchiveError> {
        self.simulate_io().await;
        let experiments = |n: usize| -> Vec<Experiment> {
            (0..n)
                .map(|i| Experiment {
                    id: format!("{subject_id}_E{i}"),
                    label: format!("{subject_id}_MR{i}"),
                })
                .collect()
        };
        match self.state.subjects.get(subject_id) {
            Some(SubjectScript::Experiments(n)) => Ok(experiments(*n)),
            Some(SubjectScript::TransferError) => Ok(experiments(1)),
            Some(SubjectScript::ListError) => {
                Err(ArchiveError::Connection("listing timed out".into()))
            }
            Some(SubjectScript::Panic) => panic!("scripted panic for {subject_id}"),
            None => Err(ArchiveError::NotFound(format!("subject {subject_id}"))),
        }
    }

    async fn download(
        &self,
        experiment: &Experiment,
        destination: &Path,
    ) -> Result<u64, ArchiveError> {
        self.state.downloads.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await;
        let subject = experiment
            .id
            .rsplit_once("_E")
            .map(|(subject, _)| subject)
            .unwrap_or_default();
        if let Some(SubjectScript::TransferError) = self.state.subjects.get(subject) {
            return Err(ArchiveError::Transfer("connection reset".into()));
        }
        let body = format!("archive of {}", experiment.id);
        tokio::fs::write(destination, body.as_bytes())
            .await
            .map_err(|e| ArchiveError::Transfer(e.to_string()))?;
        Ok(body.len() as u64)
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Test configuration writing into a fresh temp dir (kept alive by the caller).
pub(crate) fn test_config() -> (Config, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.output_dir = temp_dir.path().join("downloads");
    config.download.shutdown_timeout = Duration::from_secs(5);
    config.server.api.rate_limit.enabled = false;
    (config, temp_dir)
}

/// Downloader backed by `archive`. Returns the downloader and the tempdir
/// (which must be kept alive).
pub(crate) async fn create_test_downloader(
    archive: FakeArchive,
) -> (ArchiveDownloader, tempfile::TempDir) {
    let (config, temp_dir) = test_config();
    let downloader = ArchiveDownloader::with_archive(config, Arc::new(archive))
        .await
        .unwrap();
    (downloader, temp_dir)
}
