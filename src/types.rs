//! Core types for archive-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a download job
///
/// Job identifiers are supplied by the client at submission time and must be
/// valid UUIDs.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random job identifier
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| crate::error::Error::InvalidJobId(format!("{s:?}: {e}")))
    }
}

/// Per-item download status
///
/// ```text
/// queued -> in_progress -> complete
///                        -> failed
///                        -> no_data_to_download
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for a worker slot
    Queued,
    /// A worker is fetching this item
    InProgress,
    /// Artifact is on disk (downloaded now or already present)
    Complete,
    /// Credential resolution, connection, listing or transfer failed
    Failed,
    /// The subject exists but has no experiments
    NoDataToDownload,
}

impl ItemStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Queued => "queued",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Complete => "complete",
            ItemStatus::Failed => "failed",
            ItemStatus::NoDataToDownload => "no_data_to_download",
        }
    }

    /// Whether no further transition can happen from this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Complete | ItemStatus::Failed | ItemStatus::NoDataToDownload
        )
    }

    /// Convert status to its compact code for atomic storage
    pub fn to_u8(&self) -> u8 {
        match self {
            ItemStatus::Queued => 0,
            ItemStatus::InProgress => 1,
            ItemStatus::Complete => 2,
            ItemStatus::Failed => 3,
            ItemStatus::NoDataToDownload => 4,
        }
    }

    /// Convert a compact code back to a status
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => ItemStatus::Queued,
            1 => ItemStatus::InProgress,
            2 => ItemStatus::Complete,
            4 => ItemStatus::NoDataToDownload,
            _ => ItemStatus::Failed, // Unknown codes are never written; treat as failed
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of every item's status in a job
pub type JobStatus = BTreeMap<String, ItemStatus>;

/// Job-level aggregate derived from item statuses
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobSummary {
    /// Job identifier
    pub job_id: JobId,
    /// Project the items belong to
    pub project_id: String,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// Number of distinct items in the job
    pub total: usize,
    /// Items still waiting for a worker
    pub queued: usize,
    /// Items currently being fetched
    pub in_progress: usize,
    /// Items whose artifact is on disk
    pub complete: usize,
    /// Items that failed
    pub failed: usize,
    /// Items without experiments
    pub no_data_to_download: usize,
    /// True once every item has reached a terminal status
    pub finished: bool,
}

impl JobSummary {
    /// Aggregate a status snapshot into counts
    pub fn from_status(
        job_id: JobId,
        project_id: impl Into<String>,
        created_at: DateTime<Utc>,
        status: &JobStatus,
    ) -> Self {
        let mut summary = Self {
            job_id,
            project_id: project_id.into(),
            created_at,
            total: status.len(),
            queued: 0,
            in_progress: 0,
            complete: 0,
            failed: 0,
            no_data_to_download: 0,
            finished: false,
        };

        for item_status in status.values() {
            match item_status {
                ItemStatus::Queued => summary.queued += 1,
                ItemStatus::InProgress => summary.in_progress += 1,
                ItemStatus::Complete => summary.complete += 1,
                ItemStatus::Failed => summary.failed += 1,
                ItemStatus::NoDataToDownload => summary.no_data_to_download += 1,
            }
        }
        summary.finished = summary.queued == 0 && summary.in_progress == 0;
        summary
    }
}

/// Final result of one item task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The experiment archive was transferred to `path`
    Downloaded {
        /// Artifact location
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },
    /// The artifact already existed; no transfer was made
    AlreadyPresent {
        /// Artifact location
        path: PathBuf,
    },
    /// The subject has no experiments
    NoData,
    /// The task failed; `error` carries the cause
    Failed {
        /// Error message
        error: String,
    },
}

impl ItemOutcome {
    /// Terminal status recorded for this outcome
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemOutcome::Downloaded { .. } | ItemOutcome::AlreadyPresent { .. } => {
                ItemStatus::Complete
            }
            ItemOutcome::NoData => ItemStatus::NoDataToDownload,
            ItemOutcome::Failed { .. } => ItemStatus::Failed,
        }
    }
}

/// Per-task outcomes collected once every task of a job has been joined
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobReport {
    /// Job identifier
    pub job_id: JobId,
    /// One entry per submitted item, in completion order
    pub outcomes: Vec<(String, ItemOutcome)>,
}

impl JobReport {
    /// Number of outcomes with the given terminal status
    pub fn count(&self, status: ItemStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.status() == status)
            .count()
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and all items queued
    JobSubmitted {
        /// Job ID
        job_id: JobId,
        /// Project ID
        project_id: String,
        /// Number of item tasks that will run
        items: usize,
    },

    /// An item moved to a new status
    ItemStatusChanged {
        /// Job ID
        job_id: JobId,
        /// Item (subject) ID
        item_id: String,
        /// New status
        status: ItemStatus,
    },

    /// Every task of the job has finished
    JobFinished {
        /// Job ID
        job_id: JobId,
        /// Items that completed
        complete: usize,
        /// Items that failed
        failed: usize,
        /// Items without data
        no_data_to_download: usize,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

impl Event {
    /// Short event name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Event::JobSubmitted { .. } => "job_submitted",
            Event::ItemStatusChanged { .. } => "item_status_changed",
            Event::JobFinished { .. } => "job_finished",
            Event::Shutdown => "shutdown",
        }
    }
}
