//! Remote imaging archive access
//!
//! [`ArchiveClient`] opens authenticated sessions; an [`ArchiveSession`] lists
//! subjects and experiments and transfers one experiment's files to disk. The
//! production implementation talks to an XNAT instance ([`XnatClient`]); tests
//! substitute scripted fakes.

mod xnat;

pub use xnat::XnatClient;

use crate::credentials::Credentials;
use crate::error::ArchiveError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One imaging session (experiment) recorded for a subject
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Archive-wide experiment accession id
    pub id: String,
    /// Human-readable experiment label
    pub label: String,
}

/// Opens sessions against the archive
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Authenticate and open a new session
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Authentication`] when the archive refuses the credentials,
    /// [`ArchiveError::Connection`] when it cannot be reached.
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ArchiveSession>, ArchiveError>;
}

/// An open, authenticated archive session
#[async_trait]
pub trait ArchiveSession: Send + Sync {
    /// Labels of every subject in a project
    async fn list_subjects(&self, project_id: &str) -> Result<Vec<String>, ArchiveError>;

    /// Experiments recorded for one subject; empty when the subject has none
    async fn list_experiments(
        &self,
        project_id: &str,
        subject_id: &str,
    ) -> Result<Vec<Experiment>, ArchiveError>;

    /// Transfer an experiment's files to `destination`, returning the bytes written
    ///
    /// `destination` only exists once the transfer has fully succeeded.
    async fn download(
        &self,
        experiment: &Experiment,
        destination: &Path,
    ) -> Result<u64, ArchiveError>;

    /// Release the session on the archive side
    async fn close(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}
