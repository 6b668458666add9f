//! Job submission and status queries.

use crate::error::{Error, Result};
use crate::orchestrator::JobRequest;
use crate::types::{Event, ItemStatus, JobId, JobReport, JobStatus, JobSummary};
use std::sync::atomic::Ordering;

use super::ArchiveDownloader;

/// A request to download a set of subjects of one project
#[derive(Clone, Debug)]
pub struct JobSubmission {
    /// Caller-chosen job id; must not have been used before
    pub job_id: JobId,
    /// Project the subjects belong to
    pub project_id: String,
    /// Subjects to fetch; duplicates are allowed and fetched redundantly
    pub item_ids: Vec<String>,
    /// Session token from login; a missing token fails every item
    pub auth_token: Option<String>,
}

impl ArchiveDownloader {
    /// Register a job and start fetching its items in the background
    ///
    /// Returns as soon as the job is registered with every item `queued`; the
    /// handle resolves to the per-item report once every task has finished.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has begun
    /// - [`Error::Validation`] for an empty project id
    /// - [`Error::Registry`] if the job id is already in use
    pub async fn submit_job(
        &self,
        submission: JobSubmission,
    ) -> Result<tokio::task::JoinHandle<JobReport>> {
        if !self.job_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let JobSubmission {
            job_id,
            project_id,
            item_ids,
            auth_token,
        } = submission;

        if project_id.trim().is_empty() {
            return Err(Error::Validation("project_id must not be empty".into()));
        }

        self.registry
            .create_job(job_id, &project_id, item_ids.iter().cloned())
            .await?;

        tracing::info!(
            job_id = %job_id,
            project_id = %project_id,
            items = item_ids.len(),
            authenticated = auth_token.is_some(),
            "job submitted"
        );
        self.emit_event(Event::JobSubmitted {
            job_id,
            project_id: project_id.clone(),
            items: item_ids.len(),
        });

        let orchestrator = self.orchestrator.clone();
        let request = JobRequest {
            job_id,
            project_id,
            item_ids,
            auth_token: auth_token.unwrap_or_default(),
        };
        Ok(self
            .job_state
            .in_flight
            .spawn(async move { orchestrator.run(request).await }))
    }

    /// Point-in-time status of every item in a job
    pub async fn job_status(&self, job_id: JobId) -> Result<JobStatus> {
        Ok(self.registry.job_status(job_id).await?)
    }

    /// Status of one item in a job
    pub async fn item_status(&self, job_id: JobId, item_id: &str) -> Result<ItemStatus> {
        Ok(self.registry.item_status(job_id, item_id).await?)
    }

    /// Per-state counts for a job and whether it has finished
    pub async fn job_summary(&self, job_id: JobId) -> Result<JobSummary> {
        Ok(self.registry.job_summary(job_id).await?)
    }

    /// Number of orchestration runs that have not finished yet
    pub fn jobs_in_flight(&self) -> usize {
        self.job_state.in_flight.len()
    }
}
