//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::ArchiveDownloader;

impl ArchiveDownloader {
    /// Gracefully shut down the downloader
    ///
    /// 1. Stops accepting new jobs (submissions fail with `ShuttingDown`)
    /// 2. Waits for running jobs to drain, up to `download.shutdown_timeout`
    /// 3. Cancels the shutdown token, which stops the API server
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Jobs still running after the timeout are left to the runtime; their item
    /// statuses stay queryable until the process exits.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.job_state.accepting_new.store(false, Ordering::SeqCst);
        self.job_state.in_flight.close();
        tracing::info!(
            jobs_in_flight = self.job_state.in_flight.len(),
            "Stopped accepting new jobs"
        );

        // 2. Wait for running jobs with timeout
        let shutdown_timeout = self.config.download.shutdown_timeout;
        match tokio::time::timeout(shutdown_timeout, self.job_state.in_flight.wait()).await {
            Ok(()) => tracing::info!("All running jobs completed"),
            Err(_) => tracing::warn!(
                remaining = self.job_state.in_flight.len(),
                "Timeout waiting for jobs to complete, proceeding with shutdown"
            ),
        }

        // 3. Stop the API server
        self.job_state.shutdown_token.cancel();

        // 4. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new jobs are accepted
    pub fn is_accepting_jobs(&self) -> bool {
        self.job_state.accepting_new.load(Ordering::SeqCst)
    }
}
