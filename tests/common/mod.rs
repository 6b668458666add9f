//! Common test utilities for archive-dl integration tests
//!
//! [`MockXnat`] stands up a wiremock server that speaks the subset of the XNAT
//! REST API the downloader uses.

#![allow(dead_code)]

use archive_dl::{ArchiveDownloader, Config, ItemStatus, JobId};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{basic_auth, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

/// Session id handed out by [`MockXnat::mount_login`]
pub const JSESSION_ID: &str = "0123456789ABCDEF";

/// wiremock-backed XNAT archive
pub struct MockXnat {
    pub server: MockServer,
}

impl MockXnat {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Accept exactly `username`/`password`; anything else is a 401
    pub async fn mount_login(&self, username: &str, password: &str) {
        Mock::given(method("POST"))
            .and(path("/data/JSESSION"))
            .and(basic_auth(username, password))
            .respond_with(ResponseTemplate::new(200).set_body_string(JSESSION_ID))
            .with_priority(1)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/data/JSESSION"))
            .respond_with(ResponseTemplate::new(401))
            .with_priority(2)
            .mount(&self.server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/data/JSESSION"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// Subjects of `project`
    pub async fn mount_subjects(&self, project: &str, subjects: &[&str]) {
        let rows: Vec<_> = subjects
            .iter()
            .enumerate()
            .map(|(i, label)| json!({ "ID": format!("XNAT_S{i:05}"), "label": label }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/data/projects/{project}/subjects")))
            .and(query_param("format", "json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ResultSet": { "Result": rows } })),
            )
            .mount(&self.server)
            .await;
    }

    /// Experiments of `subject`, each `(id, label)`; requires the session cookie
    pub async fn mount_experiments(
        &self,
        project: &str,
        subject: &str,
        experiments: &[(&str, &str)],
    ) {
        let rows: Vec<_> = experiments
            .iter()
            .map(|(id, label)| json!({ "ID": id, "label": label }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!(
                "/data/projects/{project}/subjects/{subject}/experiments"
            )))
            .and(query_param("format", "json"))
            .and(header("cookie", format!("JSESSIONID={JSESSION_ID}").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ResultSet": { "Result": rows } })),
            )
            .mount(&self.server)
            .await;
    }

    /// Archive bytes for `experiment_id`; must be fetched `times` times
    pub async fn mount_download(&self, experiment_id: &str, body: &[u8], times: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/data/experiments/{experiment_id}/scans/ALL/files"
            )))
            .and(query_param("format", "zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .expect(times)
            .mount(&self.server)
            .await;
    }
}

/// Configuration pointing at `archive_url` and writing into a fresh temp dir
pub fn test_config(archive_url: &str) -> (Config, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.archive.base_url = archive_url.to_string();
    config.archive.request_timeout = Duration::from_secs(5);
    config.download.output_dir = temp_dir.path().join("downloads");
    config.download.shutdown_timeout = Duration::from_secs(5);
    config.server.api.rate_limit.enabled = false;
    (config, temp_dir)
}

/// Downloader talking to `archive_url`
pub async fn create_downloader(archive_url: &str) -> (Arc<ArchiveDownloader>, TempDir) {
    let (config, temp_dir) = test_config(archive_url);
    let downloader = ArchiveDownloader::new(config).await.unwrap();
    (Arc::new(downloader), temp_dir)
}

/// Poll until every item of `job_id` is terminal
pub async fn wait_for_job(downloader: &ArchiveDownloader, job_id: JobId) {
    for _ in 0..500 {
        let status = downloader.job_status(job_id).await.unwrap();
        if status.values().all(ItemStatus::is_terminal) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish in time");
}
