//! XNAT REST client

use super::{ArchiveClient, ArchiveSession, Experiment};
use crate::credentials::Credentials;
use crate::error::ArchiveError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{StatusCode, header};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Suffix of the in-flight file a transfer streams into before it is renamed
const PARTIAL_SUFFIX: &str = "part";

/// [`ArchiveClient`] for an XNAT server (e.g. CNDA)
#[derive(Clone, Debug)]
pub struct XnatClient {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl XnatClient {
    /// Create a client for the archive at `base_url`
    ///
    /// `request_timeout` bounds connecting, logging in and listings. Artifact
    /// transfers have no overall deadline.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ArchiveError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ArchiveError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ArchiveError::InvalidUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(concat!("archive-dl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArchiveError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            request_timeout,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Append percent-encoded path segments to the base URL
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ArchiveError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ArchiveError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .push("data")
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl ArchiveClient for XnatClient {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ArchiveSession>, ArchiveError> {
        let Some((username, password)) = credentials.basic_auth() else {
            tracing::debug!("opening anonymous archive session");
            return Ok(Box::new(XnatSession {
                http: self.http.clone(),
                base_url: self.base_url.clone(),
                request_timeout: self.request_timeout,
                jsession_id: None,
            }));
        };

        let url = endpoint(&self.base_url, &["JSESSION"])?;
        let response = self
            .http
            .post(url.clone())
            .basic_auth(username, Some(password))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ArchiveError::Connection(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ArchiveError::Authentication(format!(
                    "archive refused login for user {username}"
                )));
            }
            status => {
                return Err(ArchiveError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
        }

        let jsession_id = response
            .text()
            .await
            .map_err(|e| ArchiveError::Connection(e.to_string()))?
            .trim()
            .to_string();
        if jsession_id.is_empty() {
            return Err(ArchiveError::InvalidResponse(
                "empty session id from JSESSION".to_string(),
            ));
        }

        tracing::debug!(username, "archive session opened");
        Ok(Box::new(XnatSession {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            request_timeout: self.request_timeout,
            jsession_id: Some(jsession_id),
        }))
    }
}

/// Session bound to one `JSESSIONID` cookie (or none for guest access)
struct XnatSession {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    jsession_id: Option<String>,
}

/// `{"ResultSet": {"Result": [...]}}` envelope used by XNAT listings
#[derive(Deserialize)]
struct ResultSetEnvelope<T> {
    #[serde(rename = "ResultSet")]
    result_set: ResultSet<T>,
}

#[derive(Deserialize)]
struct ResultSet<T> {
    #[serde(rename = "Result", default = "Vec::new")]
    result: Vec<T>,
}

#[derive(Deserialize)]
struct SubjectRow {
    label: String,
}

#[derive(Deserialize)]
struct ExperimentRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    label: String,
}

impl XnatSession {
    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.jsession_id {
            Some(id) => request.header(header::COOKIE, format!("JSESSIONID={id}")),
            None => request,
        }
    }

    async fn get_listing<T>(&self, url: Url, what: &str) -> Result<Vec<T>, ArchiveError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut url = url;
        url.query_pairs_mut().append_pair("format", "json");

        let response = self
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ArchiveError::Connection(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ArchiveError::NotFound(what.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ArchiveError::Authentication(format!("access denied to {what}")));
            }
            status => {
                return Err(ArchiveError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
        }

        let envelope: ResultSetEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ArchiveError::InvalidResponse(format!("{what}: {e}")))?;
        Ok(envelope.result_set.result)
    }

    async fn stream_to(&self, url: Url, partial: &Path) -> Result<u64, ArchiveError> {
        let response = self
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ArchiveError::Transfer(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ArchiveError::Transfer(format!(
                "HTTP {} for {url}",
                response.status().as_u16()
            )));
        }

        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| ArchiveError::Transfer(format!("{}: {e}", partial.display())))?;
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ArchiveError::Transfer(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ArchiveError::Transfer(e.to_string()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ArchiveError::Transfer(e.to_string()))?;
        Ok(written)
    }
}

/// `<destination>.<transfer id>.part`, unique per transfer so concurrent
/// fetches of the same artifact never share a file
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(format!(".{}.", uuid::Uuid::new_v4().simple()));
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Move a finished partial into place
///
/// Losing a rename race to another transfer of the same artifact still leaves a
/// complete file at `destination` and counts as success.
async fn promote_partial(partial: &Path, destination: &Path) -> Result<(), ArchiveError> {
    match tokio::fs::rename(partial, destination).await {
        Ok(()) => Ok(()),
        Err(e) => match tokio::fs::metadata(destination).await {
            Ok(meta) if meta.is_file() => {
                tracing::debug!(
                    path = %destination.display(),
                    error = %e,
                    "artifact delivered by a concurrent transfer"
                );
                Ok(())
            }
            _ => Err(ArchiveError::Transfer(format!(
                "{}: {e}",
                destination.display()
            ))),
        },
    }
}

async fn remove_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                path = %partial.display(),
                error = %e,
                "could not remove partial download"
            );
        }
    }
}

#[async_trait]
impl ArchiveSession for XnatSession {
    async fn list_subjects(&self, project_id: &str) -> Result<Vec<String>, ArchiveError> {
        let url = endpoint(&self.base_url, &["projects", project_id, "subjects"])?;
        let rows: Vec<SubjectRow> = self
            .get_listing(url, &format!("project {project_id}"))
            .await?;
        Ok(rows.into_iter().map(|row| row.label).collect())
    }

    async fn list_experiments(
        &self,
        project_id: &str,
        subject_id: &str,
    ) -> Result<Vec<Experiment>, ArchiveError> {
        let url = endpoint(
            &self.base_url,
            &["projects", project_id, "subjects", subject_id, "experiments"],
        )?;
        let rows: Vec<ExperimentRow> = self
            .get_listing(url, &format!("subject {subject_id} in project {project_id}"))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Experiment {
                id: row.id,
                label: row.label,
            })
            .collect())
    }

    async fn download(
        &self,
        experiment: &Experiment,
        destination: &Path,
    ) -> Result<u64, ArchiveError> {
        let mut url = endpoint(
            &self.base_url,
            &["experiments", &experiment.id, "scans", "ALL", "files"],
        )?;
        url.query_pairs_mut().append_pair("format", "zip");

        let partial = partial_path(destination);
        let result = match self.stream_to(url, &partial).await {
            Ok(bytes) => promote_partial(&partial, destination).await.map(|()| bytes),
            Err(e) => Err(e),
        };
        // Gone after a successful rename; otherwise never trusted
        remove_partial(&partial).await;
        result
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        let Some(id) = &self.jsession_id else {
            return Ok(());
        };
        let url = endpoint(&self.base_url, &["JSESSION"])?;
        self.http
            .delete(url)
            .header(header::COOKIE, format!("JSESSIONID={id}"))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ArchiveError::Connection(e.to_string()))?;
        Ok(())
    }
}
