use super::*;
use crate::downloader::test_helpers::{FakeArchive, SubjectScript};
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceExt;


/// Downloader over `archive` wrapped in Arc, with the config to build a router from
async fn create_test_downloader(
    archive: FakeArchive,
) -> (Arc<ArchiveDownloader>, Arc<Config>, tempfile::TempDir) {
    let (downloader, temp_dir) = crate::downloader::test_helpers::create_test_downloader(archive).await;
    let config = downloader.get_config();
    (Arc::new(downloader), config, temp_dir)
}

/// Router over `archive` with the default test configuration
async fn test_app(archive: FakeArchive) -> (Router, Arc<ArchiveDownloader>, tempfile::TempDir) {
    let (downloader, config, temp_dir) = create_test_downloader(archive).await;
    (create_router(downloader.clone(), config), downloader, temp_dir)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, config, _temp_dir) = create_test_downloader(FakeArchive::default()).await;

    let mut config = (*config).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, config, _temp_dir) = create_test_downloader(FakeArchive::default()).await;

    let mut config = (*config).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let (downloader, config, _temp_dir) = create_test_downloader(FakeArchive::default()).await;

    let mut config = (*config).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(downloader, Arc::new(config));

    let response = send(&app, get("/swagger-ui/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_server_stops_after_shutdown() {
    let (downloader, config, _temp_dir) = create_test_downloader(FakeArchive::default()).await;

    let mut config = (*config).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let server = tokio::spawn({
        let downloader = downloader.clone();
        async move { start_api_server(downloader, config).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    downloader.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop once shutdown completes")
        .unwrap();
    assert!(result.is_ok());
}
