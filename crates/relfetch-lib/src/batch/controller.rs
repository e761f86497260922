use super::retry::{RetryPolicy, with_retry};
use super::types::{BatchReport, JobOutcome};
use crate::config::Config;
use crate::download::{DownloadJob, Downloader, JobStatus};
use crate::error::{FetchError, RelfetchError};
use crate::http::HttpSession;
use crate::progress::ProgressTracker;
use crate::release::{ReleaseResolver, RepoId};
use crate::selector::AssetSelector;
use crate::utils::destination_path;
use crate::verification::{VerificationOutcome, Verifier, parse_checksum_file};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type JobQueue = Arc<Mutex<VecDeque<(usize, RepoId)>>>;

fn next_job(queue: &JobQueue) -> Option<(usize, RepoId)> {
    queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
}

/// Runs the resolve, select, download and verify pipeline for one job at a
/// time. Each worker owns one runner and therefore one HTTP session.
pub struct JobRunner {
    resolver: ReleaseResolver,
    selector: AssetSelector,
    downloader: Downloader,
    verifier: Verifier,
    policy: RetryPolicy,
    output_dir: PathBuf,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
}

impl JobRunner {
    pub fn new(
        app_config: &Config,
        session: HttpSession,
        tracker: Arc<ProgressTracker>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            resolver: ReleaseResolver::new(session.clone(), &app_config.api_base_url),
            selector: AssetSelector::from_config(app_config),
            downloader: Downloader::from_config(session, app_config, cancel.clone()),
            verifier: Verifier::new(app_config.chunk_size),
            policy: RetryPolicy::from_config(app_config),
            output_dir: app_config.output_dir.clone(),
            tracker,
            cancel,
        }
    }

    /// Never fails; errors become a failed outcome.
    pub async fn run_job(&self, repo_id: &RepoId) -> JobOutcome {
        let mut job = DownloadJob::new(repo_id.clone());
        self.tracker.set_status(repo_id, JobStatus::Pending);

        match self.execute(&mut job).await {
            Ok(message) => {
                tracing::info!(repo = %repo_id, "{message}");
                JobOutcome::succeeded(repo_id.clone(), message)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(repo = %repo_id, error = %message, "Job failed");
                if let Err(e) = job.fail(message.clone()) {
                    tracing::debug!(repo = %repo_id, error = %e, "Job already settled");
                }
                self.tracker.set_status(repo_id, JobStatus::Failed);
                JobOutcome::failed(repo_id.clone(), message)
            }
        }
    }

    fn advance(&self, job: &mut DownloadJob, status: JobStatus) {
        if let Err(e) = job.transition(status) {
            tracing::debug!(repo = %job.repo_id, error = %e, "Ignoring status change");
            return;
        }
        self.tracker.set_status(&job.repo_id, status);
    }

    async fn execute(&self, job: &mut DownloadJob) -> Result<String, FetchError> {
        let repo_id = job.repo_id.clone();
        let repo_id = &repo_id;
        let mut budget = self.policy.budget();
        let resolver = &self.resolver;
        let downloader = &self.downloader;
        let tracker = self.tracker.as_ref();

        let release = with_retry(&self.policy, &mut budget, &self.cancel, repo_id, "resolve", move || {
            resolver.fetch_latest_release(repo_id)
        })
        .await?;

        let selected = self.selector.select(&release)?;
        let primary = &selected.primary;
        let destination = destination_path(&self.output_dir, &primary.name);
        job.assign(primary.clone(), destination.clone());
        let destination = destination.as_path();

        self.advance(job, JobStatus::Downloading);
        with_retry(&self.policy, &mut budget, &self.cancel, repo_id, "download", move || {
            downloader.download(primary, destination, move |done, total| {
                tracker.report_progress(repo_id, &primary.name, done, total)
            })
        })
        .await?;

        let outcome = match &selected.checksum {
            None => VerificationOutcome::Unavailable,
            Some(checksum) => {
                self.advance(job, JobStatus::Verifying);
                let content = with_retry(&self.policy, &mut budget, &self.cancel, repo_id, "checksum", move || {
                    downloader.fetch_text(checksum)
                })
                .await?;
                let expected = primary.with_digest(parse_checksum_file(&checksum.name, &primary.name, &content)?);

                let verifier = self.verifier;
                let path = destination.to_path_buf();
                tokio::task::spawn_blocking(move || verifier.verify(&expected, &path))
                    .await
                    .map_err(|e| FetchError::io(destination, std::io::Error::other(e)))??;
                VerificationOutcome::Verified
            }
        };

        self.advance(job, JobStatus::Completed);

        let note = match outcome {
            VerificationOutcome::Verified => "verified",
            VerificationOutcome::Unavailable => "unverified, no checksum published",
        };
        Ok(format!(
            "{} {} -> {} ({note})",
            primary.name,
            release.version,
            destination.display()
        ))
    }

    async fn work(self, queue: JobQueue, results: mpsc::UnboundedSender<(usize, JobOutcome)>) {
        while let Some((index, repo_id)) = next_job(&queue) {
            let outcome = self.run_job(&repo_id).await;
            if results.send((index, outcome)).is_err() {
                break;
            }
        }
    }
}

/// Bounded pool of workers draining a shared job queue.
pub struct ConcurrencyController {
    app_config: Config,
    token: Option<String>,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
}

impl ConcurrencyController {
    pub fn new(
        app_config: Config,
        token: Option<String>,
        tracker: Arc<ProgressTracker>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            app_config,
            token,
            tracker,
            cancel,
        }
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }

    /// Runs every job with exactly `concurrency_limit` workers. One job's
    /// failure never stops the others.
    pub async fn run_batch(
        &self,
        repo_ids: &[RepoId],
        concurrency_limit: usize,
    ) -> Result<BatchReport, RelfetchError> {
        let workers = concurrency_limit.max(1);
        tracing::info!(jobs = repo_ids.len(), workers, "Starting batch");

        self.tracker.reset();
        let queue: JobQueue = Arc::new(Mutex::new(repo_ids.iter().cloned().enumerate().collect()));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let sessions = (0..workers)
            .map(|_| HttpSession::new(&self.app_config, self.token.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut handles = Vec::with_capacity(workers);
        for session in sessions {
            let runner = JobRunner::new(
                &self.app_config,
                session,
                Arc::clone(&self.tracker),
                self.cancel.clone(),
            );
            handles.push(tokio::spawn(runner.work(Arc::clone(&queue), results_tx.clone())));
        }
        drop(results_tx);

        let stop_rendering = CancellationToken::new();
        let maintenance = self.tracker.spawn_maintenance(stop_rendering.clone());

        let mut settled: Vec<Option<JobOutcome>> = vec![None; repo_ids.len()];
        while let Some((index, outcome)) = results_rx.recv().await {
            tracing::debug!(repo = %outcome.repo_id, success = outcome.success, "Job settled");
            settled[index] = Some(outcome);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker terminated unexpectedly");
            }
        }
        stop_rendering.cancel();
        if let Err(e) = maintenance.await {
            tracing::debug!(error = %e, "Progress renderer stopped abnormally");
        }
        self.tracker.finish();

        let outcomes: Vec<JobOutcome> = settled
            .into_iter()
            .zip(repo_ids)
            .map(|(outcome, repo_id)| {
                outcome.unwrap_or_else(|| JobOutcome::failed(repo_id.clone(), "Worker terminated unexpectedly"))
            })
            .collect();

        let report = BatchReport { outcomes };
        tracing::info!(succeeded = report.succeeded(), failed = report.failed(), "Batch finished");
        Ok(report)
    }
}
