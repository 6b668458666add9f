//! `archive-dl` server binary
//!
//! Reads configuration from the environment (see [`archive_dl::config`]),
//! serves the REST API and shuts down gracefully on SIGINT/SIGTERM.

use archive_dl::{ArchiveDownloader, Config, logging, run_with_shutdown};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let downloader = Arc::new(ArchiveDownloader::new(config).await?);

    let mut server = downloader.spawn_api_server();

    let signalled = tokio::select! {
        result = run_with_shutdown(ArchiveDownloader::clone(&downloader)) => Some(result),
        // Only completes first when the server fails to bind or crashes
        joined = &mut server => {
            joined??;
            None
        }
    };

    if let Some(result) = signalled {
        result?;
        // Shutdown cancels the server; wait for in-flight requests to finish
        server.await??;
    }

    Ok(())
}
