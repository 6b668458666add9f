//! Job orchestration: fan a job's items out onto a bounded pool of tasks.
//!
//! Every call to [`Orchestrator::run`] builds its own pool (a semaphore plus a
//! [`JoinSet`]) and tears it down once every task has been joined. Tasks never
//! share an archive session: each resolves credentials and connects on its own,
//! writes only its own item's status and reports an [`ItemOutcome`].

mod context;
mod task;


use crate::archive::ArchiveClient;
use crate::credentials::CredentialResolver;
use crate::registry::JobRegistry;
use crate::types::{Event, ItemOutcome, ItemStatus, JobId, JobReport};
use context::TaskContext;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;

/// Default ceiling on concurrently running item tasks of one job
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 5;

/// Input of one orchestration run
#[derive(Clone, Debug)]
pub struct JobRequest {
    /// Job whose items are fetched; must already be registered
    pub job_id: JobId,
    /// Project the items belong to
    pub project_id: String,
    /// One task runs per entry, duplicates included
    pub item_ids: Vec<String>,
    /// Session token every task resolves to credentials; empty when absent
    pub auth_token: String,
}

/// Runs item tasks for registered jobs
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    archive: Arc<dyn ArchiveClient>,
    credentials: Arc<dyn CredentialResolver>,
    event_tx: broadcast::Sender<Event>,
    output_dir: Arc<Path>,
    artifact_extension: Arc<str>,
    max_concurrent_tasks: usize,
}

impl Orchestrator {
    /// Create an orchestrator writing artifacts below `output_dir`
    pub fn new(
        registry: Arc<JobRegistry>,
        archive: Arc<dyn ArchiveClient>,
        credentials: Arc<dyn CredentialResolver>,
        event_tx: broadcast::Sender<Event>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            archive,
            credentials,
            event_tx,
            output_dir: Arc::from(output_dir.into()),
            artifact_extension: Arc::from("zip"),
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
        }
    }

    /// Set the ceiling on concurrently running tasks per job (minimum 1)
    pub fn with_max_concurrent_tasks(mut self, limit: usize) -> Self {
        self.max_concurrent_tasks = limit.max(1);
        self
    }

    /// Set the artifact file extension (without the dot)
    pub fn with_artifact_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = Arc::from(extension.into());
        self
    }

    /// Ceiling on concurrently running tasks per job
    pub fn max_concurrent_tasks(&self) -> usize {
        self.max_concurrent_tasks
    }

    /// Run every item of a job to a terminal status and collect the outcomes
    ///
    /// Returns once all tasks have been joined. Item failures, including a
    /// panicking task, are recorded as `failed` for that item only.
    pub async fn run(&self, request: JobRequest) -> JobReport {
        let JobRequest {
            job_id,
            project_id,
            item_ids,
            auth_token,
        } = request;

        tracing::info!(
            job_id = %job_id,
            project_id = %project_id,
            items = item_ids.len(),
            max_concurrent = self.max_concurrent_tasks,
            "starting job"
        );

        let project_id: Arc<str> = Arc::from(project_id);
        let auth_token: Arc<str> = Arc::from(auth_token);
        let limiter = Arc::new(Semaphore::new(self.max_concurrent_tasks));
        let mut tasks = JoinSet::new();
        let mut items_by_task = HashMap::with_capacity(item_ids.len());
        let mut outcomes = Vec::with_capacity(item_ids.len());

        for item_id in item_ids {
            let ctx = TaskContext {
                job_id,
                project_id: Arc::clone(&project_id),
                item_id: item_id.clone(),
                auth_token: Arc::clone(&auth_token),
                registry: Arc::clone(&self.registry),
                archive: Arc::clone(&self.archive),
                credentials: Arc::clone(&self.credentials),
                event_tx: self.event_tx.clone(),
                output_dir: Arc::clone(&self.output_dir),
                artifact_extension: Arc::clone(&self.artifact_extension),
            };

            // Blocks while the job already has the maximum number of tasks running
            let permit = match Arc::clone(&limiter).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let outcome = ItemOutcome::Failed {
                        error: format!("worker pool unavailable: {e}"),
                    };
                    ctx.set_status(ItemStatus::InProgress).await;
                    ctx.set_status(outcome.status()).await;
                    outcomes.push((item_id, outcome));
                    continue;
                }
            };

            let handle = tasks.spawn(async move {
                let _permit = permit;
                task::run_item_task(&ctx).await
            });
            items_by_task.insert(handle.id(), item_id);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    let item_id = items_by_task.remove(&id).unwrap_or_default();
                    outcomes.push((item_id, outcome));
                }
                Err(join_error) => {
                    let item_id = items_by_task
                        .remove(&join_error.id())
                        .unwrap_or_default();
                    tracing::warn!(
                        job_id = %job_id,
                        item_id = %item_id,
                        error = %join_error,
                        "failure: {} (task aborted)",
                        item_id
                    );
                    self.record_aborted(job_id, &item_id).await;
                    outcomes.push((
                        item_id,
                        ItemOutcome::Failed {
                            error: join_error.to_string(),
                        },
                    ));
                }
            }
        }

        let report = JobReport { job_id, outcomes };
        let complete = report.count(ItemStatus::Complete);
        let failed = report.count(ItemStatus::Failed);
        let no_data_to_download = report.count(ItemStatus::NoDataToDownload);

        tracing::info!(
            job_id = %job_id,
            complete,
            failed,
            no_data_to_download,
            "job finished"
        );
        let _ = self.event_tx.send(Event::JobFinished {
            job_id,
            complete,
            failed,
            no_data_to_download,
        });

        report
    }

    /// Mark an item whose task died before recording a terminal status
    async fn record_aborted(&self, job_id: JobId, item_id: &str) {
        // The task may have died before its in_progress write
        if let Ok(ItemStatus::Queued) = self.registry.item_status(job_id, item_id).await {
            let _ = self
                .registry
                .set_item_status(job_id, item_id, ItemStatus::InProgress)
                .await;
        }
        if let Err(e) = self
            .registry
            .set_item_status(job_id, item_id, ItemStatus::Failed)
            .await
        {
            tracing::error!(job_id = %job_id, item_id, error = %e, "could not record item status");
            return;
        }
        let _ = self.event_tx.send(Event::ItemStatusChanged {
            job_id,
            item_id: item_id.to_string(),
            status: ItemStatus::Failed,
        });
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("output_dir", &self.output_dir)
            .field("artifact_extension", &self.artifact_extension)
            .field("max_concurrent_tasks", &self.max_concurrent_tasks)
            .finish_non_exhaustive()
    }
}
