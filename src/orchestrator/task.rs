//! Execution of one item: the `in_progress` transition, the remote work and
//! the terminal transition.

use super::context::TaskContext;
use crate::archive::ArchiveSession;
use crate::error::Result;
use crate::types::{ItemOutcome, ItemStatus};

/// Run one item to a terminal status. Never fails; errors become
/// [`ItemOutcome::Failed`].
pub(crate) async fn run_item_task(ctx: &TaskContext) -> ItemOutcome {
    ctx.set_status(ItemStatus::InProgress).await;

    let outcome = match fetch_item(ctx).await {
        Ok(outcome) => outcome,
        Err(e) => ItemOutcome::Failed {
            error: e.to_string(),
        },
    };

    log_outcome(ctx, &outcome);
    ctx.set_status(outcome.status()).await;
    outcome
}

async fn fetch_item(ctx: &TaskContext) -> Result<ItemOutcome> {
    let credentials = ctx.credentials.resolve_credentials(&ctx.auth_token).await?;
    let session = ctx.archive.connect(&credentials).await?;

    let result = fetch_with_session(ctx, session.as_ref()).await;

    if let Err(e) = session.close().await {
        tracing::debug!(
            job_id = %ctx.job_id,
            item_id = %ctx.item_id,
            error = %e,
            "archive session close failed"
        );
    }
    result
}

async fn fetch_with_session(
    ctx: &TaskContext,
    session: &dyn ArchiveSession,
) -> Result<ItemOutcome> {
    let experiments = session
        .list_experiments(&ctx.project_id, &ctx.item_id)
        .await?;

    // Only the subject's first experiment is fetched
    let Some(experiment) = experiments.first() else {
        return Ok(ItemOutcome::NoData);
    };

    let path = ctx.artifact_path()?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if tokio::fs::try_exists(&path).await? {
        return Ok(ItemOutcome::AlreadyPresent { path });
    }

    tracing::debug!(
        job_id = %ctx.job_id,
        item_id = %ctx.item_id,
        experiment = %experiment.id,
        path = %path.display(),
        "downloading experiment"
    );
    let bytes = session.download(experiment, &path).await?;
    Ok(ItemOutcome::Downloaded { path, bytes })
}

fn log_outcome(ctx: &TaskContext, outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Downloaded { path, bytes } => tracing::info!(
            job_id = %ctx.job_id,
            project_id = %ctx.project_id,
            item_id = %ctx.item_id,
            path = %path.display(),
            bytes,
            "success: downloaded data for {} and {}",
            ctx.project_id,
            ctx.item_id
        ),
        ItemOutcome::AlreadyPresent { path } => tracing::info!(
            job_id = %ctx.job_id,
            project_id = %ctx.project_id,
            item_id = %ctx.item_id,
            path = %path.display(),
            "success: data for {} and {} already present, skipping",
            ctx.project_id,
            ctx.item_id
        ),
        ItemOutcome::NoData => tracing::info!(
            job_id = %ctx.job_id,
            project_id = %ctx.project_id,
            item_id = %ctx.item_id,
            "success: no data to download for {} and {}",
            ctx.project_id,
            ctx.item_id
        ),
        ItemOutcome::Failed { error } => tracing::warn!(
            job_id = %ctx.job_id,
            project_id = %ctx.project_id,
            item_id = %ctx.item_id,
            error = %error,
            "failure: could not download data for {} and {}",
            ctx.project_id,
            ctx.item_id
        ),
    }
}
