//! Application state for the API server

use crate::{ArchiveDownloader, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The main ArchiveDownloader instance
    pub downloader: Arc<ArchiveDownloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<ArchiveDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
