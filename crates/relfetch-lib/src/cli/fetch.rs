use crate::batch::{BatchReport, ConcurrencyController};
use crate::cli::params::FetchParams;
use crate::cli::summary::print_summary;
use crate::credentials::token_or_warn;
use crate::error::RelfetchError;
use crate::progress::ProgressTracker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the batch and prints the summary table to stdout. The caller maps
/// [`BatchReport::any_failed`] to the exit status.
pub async fn run_fetch(params: FetchParams) -> Result<BatchReport, RelfetchError> {
    let FetchParams {
        app_config,
        repo_ids,
        credentials,
    } = params;

    let token = token_or_warn(&credentials);
    let tracker = Arc::new(ProgressTracker::new(
        app_config.render_interval(),
        app_config.redraw_on_progress,
    ));
    if !tracker.is_interactive() {
        tracing::debug!("stderr is not a terminal, live progress disabled");
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning in-flight downloads");
            interrupt.cancel();
        }
    });

    let concurrency = app_config.concurrency;
    let controller = ConcurrencyController::new(app_config, token, tracker, cancel);
    let report = controller.run_batch(&repo_ids, concurrency).await?;

    print_summary(&report, &mut std::io::stdout().lock())?;
    Ok(report)
}
