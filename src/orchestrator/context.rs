//! Per-item task context: shared handles plus the item's identity.

use crate::archive::ArchiveClient;
use crate::credentials::CredentialResolver;
use crate::error::{Error, Result};
use crate::registry::JobRegistry;
use crate::types::{Event, ItemStatus, JobId};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Everything one item task needs, so helpers don't take long parameter lists.
pub(crate) struct TaskContext {
    pub(crate) job_id: JobId,
    pub(crate) project_id: Arc<str>,
    pub(crate) item_id: String,
    pub(crate) auth_token: Arc<str>,
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) archive: Arc<dyn ArchiveClient>,
    pub(crate) credentials: Arc<dyn CredentialResolver>,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    pub(crate) output_dir: Arc<Path>,
    pub(crate) artifact_extension: Arc<str>,
}

impl TaskContext {
    /// Record a new status for this item and broadcast it.
    ///
    /// The item key was registered with the job, so a registry error here means
    /// the job was never created; it is logged and otherwise ignored.
    pub(super) async fn set_status(&self, status: ItemStatus) {
        if let Err(e) = self
            .registry
            .set_item_status(self.job_id, &self.item_id, status)
            .await
        {
            tracing::error!(
                job_id = %self.job_id,
                item_id = %self.item_id,
                error = %e,
                "could not record item status"
            );
            return;
        }

        // No receivers is fine
        let _ = self.event_tx.send(Event::ItemStatusChanged {
            job_id: self.job_id,
            item_id: self.item_id.clone(),
            status,
        });
    }

    /// `output_dir/project_id/item_id.ext`
    ///
    /// Ids that would escape the project directory are rejected.
    pub(super) fn artifact_path(&self) -> Result<PathBuf> {
        let project = single_component(&self.project_id, "project id")?;
        let item = single_component(&self.item_id, "item id")?;

        let mut file_name = item.to_string();
        if !self.artifact_extension.is_empty() {
            file_name.push('.');
            file_name.push_str(&self.artifact_extension);
        }
        Ok(self.output_dir.join(project).join(file_name))
    }
}

fn single_component<'a>(id: &'a str, what: &str) -> Result<&'a str> {
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !id.contains(['/', '\\']) => Ok(id),
        _ => Err(Error::Validation(format!(
            "{what} {id:?} is not a valid file name"
        ))),
    }
}
