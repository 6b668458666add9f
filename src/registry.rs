//! In-memory job registry
//!
//! Holds the authoritative status of every submitted job and each of its items.
//! A job is inserted fully populated (every item `queued`) in one write, so a
//! reader can never see a job with a missing item. After creation the item set
//! of a job is fixed; each item status lives in its own atomic cell, so the task
//! that owns an item updates it under the shared read lock without blocking
//! readers or the job's other tasks.

use crate::error::RegistryError;
use crate::types::{ItemStatus, JobId, JobStatus, JobSummary};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::RwLock;

/// Registered state of one job
#[derive(Debug)]
struct JobEntry {
    project_id: String,
    created_at: DateTime<Utc>,
    items: HashMap<String, AtomicU8>,
}

impl JobEntry {
    fn snapshot(&self) -> JobStatus {
        self.items
            .iter()
            .map(|(item_id, cell)| {
                (
                    item_id.clone(),
                    ItemStatus::from_u8(cell.load(Ordering::Acquire)),
                )
            })
            .collect()
    }
}

/// Process-wide table of jobs and per-item statuses
///
/// Jobs are never removed while the process runs.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job with every item `queued`
    ///
    /// Duplicate item ids collapse into a single status entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateJob`] if `job_id` is already registered;
    /// the existing job is left untouched.
    pub async fn create_job<I, S>(
        &self,
        job_id: JobId,
        project_id: &str,
        item_ids: I,
    ) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: HashMap<String, AtomicU8> = item_ids
            .into_iter()
            .map(|id| (id.into(), AtomicU8::new(ItemStatus::Queued.to_u8())))
            .collect();

        let entry = Arc::new(JobEntry {
            project_id: project_id.to_string(),
            created_at: Utc::now(),
            items,
        });

        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job_id) {
            return Err(RegistryError::DuplicateJob { job_id });
        }
        tracing::debug!(
            job_id = %job_id,
            project_id,
            items = entry.items.len(),
            "job registered"
        );
        jobs.insert(job_id, entry);
        Ok(())
    }

    /// Overwrite the status of one item
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownJob`] or [`RegistryError::UnknownItem`] if
    /// either key is absent.
    pub async fn set_item_status(
        &self,
        job_id: JobId,
        item_id: &str,
        status: ItemStatus,
    ) -> Result<(), RegistryError> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(&job_id)
            .ok_or(RegistryError::UnknownJob { job_id })?;
        let cell = entry
            .items
            .get(item_id)
            .ok_or_else(|| RegistryError::UnknownItem {
                job_id,
                item_id: item_id.to_string(),
            })?;
        cell.store(status.to_u8(), Ordering::Release);
        Ok(())
    }

    /// Point-in-time copy of every item status in a job
    pub async fn job_status(&self, job_id: JobId) -> Result<JobStatus, RegistryError> {
        let entry = self.entry(job_id).await?;
        Ok(entry.snapshot())
    }

    /// Status of a single item
    pub async fn item_status(
        &self,
        job_id: JobId,
        item_id: &str,
    ) -> Result<ItemStatus, RegistryError> {
        let entry = self.entry(job_id).await?;
        entry
            .items
            .get(item_id)
            .map(|cell| ItemStatus::from_u8(cell.load(Ordering::Acquire)))
            .ok_or_else(|| RegistryError::UnknownItem {
                job_id,
                item_id: item_id.to_string(),
            })
    }

    /// Aggregate counts for a job, including whether every item is terminal
    pub async fn job_summary(&self, job_id: JobId) -> Result<JobSummary, RegistryError> {
        let entry = self.entry(job_id).await?;
        let status = entry.snapshot();
        Ok(JobSummary::from_status(
            job_id,
            entry.project_id.clone(),
            entry.created_at,
            &status,
        ))
    }

    /// Whether a job with this id has been registered
    pub async fn contains(&self, job_id: JobId) -> bool {
        self.jobs.read().await.contains_key(&job_id)
    }

    /// Number of registered jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no job has been registered yet
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn entry(&self, job_id: JobId) -> Result<Arc<JobEntry>, RegistryError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(RegistryError::UnknownJob { job_id })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_job_has_every_item_queued_and_nothing_else() {
        let registry = JobRegistry::new();
        let job_id = JobId::new_v4();

        registry
            .create_job(job_id, "NP1173", ["S1", "S2", "S3"])
            .await
            .unwrap();

        let status = registry.job_status(job_id).await.unwrap();
        assert_eq!(status.len(), 3);
        assert!(status.values().all(|s| *s == ItemStatus::Queued));
        assert!(status.contains_key("S1"));
        assert!(status.contains_key("S3"));
    }

    #[tokio::test]
    async fn duplicate_job_is_rejected_and_first_entry_is_kept() {
        let registry = JobRegistry::new();
        let job_id = JobId::new_v4();

        registry.create_job(job_id, "P", ["S1"]).await.unwrap();
        registry
            .set_item_status(job_id, "S1", ItemStatus::Complete)
            .await
            .unwrap();

        let err = registry
            .create_job(job_id, "P", ["S1", "S2"])
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateJob { job_id });

        let status = registry.job_status(job_id).await.unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status["S1"], ItemStatus::Complete);
    }

    #[tokio::test]
    async fn duplicate_item_ids_collapse_into_one_entry() {
        let registry = JobRegistry::new();
        let job_id = JobId::new_v4();

        registry
            .create_job(job_id, "P", ["S1", "S1", "S2"])
            .await
            .unwrap();

        assert_eq!(registry.job_status(job_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_status_on_unknown_job_or_item_fails() {
        let registry = JobRegistry::new();
        let job_id = JobId::new_v4();

        let err = registry
            .set_item_status(job_id, "S1", ItemStatus::InProgress)
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownJob { job_id });

        registry.create_job(job_id, "P", ["S1"]).await.unwrap();
        let err = registry
            .set_item_status(job_id, "S9", ItemStatus::InProgress)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownItem {
                job_id,
                item_id: "S9".into()
            }
        );
    }

    #[tokio::test]
    async fn status_query_for_unknown_job_fails() {
        let registry = JobRegistry::new();
        let job_id = JobId::new_v4();
        assert_eq!(
            registry.job_status(job_id).await.unwrap_err(),
            RegistryError::UnknownJob { job_id }
        );
        assert!(registry.job_summary(job_id).await.is_err());
    }

    #[tokio::test]
    async fn snapshot_is_a_copy_not_a_live_view() {
        let registry = JobRegistry::new();
        let job_id = JobId::new_v4();
        registry.create_job(job_id, "P", ["S1"]).await.unwrap();

        let before = registry.job_status(job_id).await.unwrap();
        registry
            .set_item_status(job_id, "S1", ItemStatus::InProgress)
            .await
            .unwrap();

        assert_eq!(before["S1"], ItemStatus::Queued);
        assert_eq!(
            registry.item_status(job_id, "S1").await.unwrap(),
            ItemStatus::InProgress
        );
    }

    #[tokio::test]
    async fn summary_tracks_terminal_progress() {
        let registry = JobRegistry::new();
        let job_id = JobId::new_v4();
        registry
            .create_job(job_id, "MSC", ["S1", "S2"])
            .await
            .unwrap();

        let summary = registry.job_summary(job_id).await.unwrap();
        assert_eq!(summary.queued, 2);
        assert!(!summary.finished);

        registry
            .set_item_status(job_id, "S1", ItemStatus::Failed)
            .await
            .unwrap();
        registry
            .set_item_status(job_id, "S2", ItemStatus::Complete)
            .await
            .unwrap();

        let summary = registry.job_summary(job_id).await.unwrap();
        assert_eq!(summary.project_id, "MSC");
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.complete, 1);
        assert!(summary.finished);
    }

    #[tokio::test]
    async fn concurrent_writers_on_disjoint_items_all_land() {
        let registry = Arc::new(JobRegistry::new());
        let job_id = JobId::new_v4();
        let items: Vec<String> = (0..50).map(|i| format!("S{i}")).collect();
        registry
            .create_job(job_id, "P", items.clone())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for item in items {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .set_item_status(job_id, &item, ItemStatus::InProgress)
                    .await
                    .unwrap();
                registry
                    .set_item_status(job_id, &item, ItemStatus::Complete)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let status = registry.job_status(job_id).await.unwrap();
        assert_eq!(status.len(), 50);
        assert!(status.values().all(|s| *s == ItemStatus::Complete));
        assert_eq!(registry.len().await, 1);
    }
}
