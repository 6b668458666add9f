//! Login/logout and the project/subject catalog.

use crate::credentials::{CredentialResolver, Credentials};
use crate::error::{ArchiveError, AuthError, Result};

use super::ArchiveDownloader;

impl ArchiveDownloader {
    /// Check credentials against the archive and open a local session
    ///
    /// Returns the session token item tasks resolve back to these credentials.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] when the archive rejects the login;
    /// other archive failures are returned as [`crate::Error::Archive`].
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let credentials = Credentials::new(username, password);
        let session = match self.archive.connect(&credentials).await {
            Ok(session) => session,
            Err(ArchiveError::Authentication(reason)) => {
                tracing::info!(username, reason = %reason, "login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "archive session close failed after login");
        }

        let token = self.sessions.insert(credentials).await;
        tracing::info!(username, "user logged in");
        Ok(token)
    }

    /// Drop a session token; returns whether it existed
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.remove(token).await
    }

    /// Projects offered for download
    pub fn list_projects(&self) -> Vec<String> {
        self.config.archive.projects.clone()
    }

    /// Subject labels of a project
    ///
    /// Uses the credentials behind `token` if given, anonymous access otherwise.
    pub async fn list_subjects(&self, project_id: &str, token: Option<&str>) -> Result<Vec<String>> {
        let credentials = match token {
            Some(token) => self.sessions.resolve_credentials(token).await?,
            None => std::sync::Arc::new(Credentials::anonymous()),
        };

        let session = self.archive.connect(&credentials).await?;
        let subjects = session.list_subjects(project_id).await;
        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "archive session close failed");
        }
        Ok(subjects?)
    }
}
