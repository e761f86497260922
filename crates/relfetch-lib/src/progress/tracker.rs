use crate::download::JobStatus;
use crate::release::RepoId;
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const ROW_TEMPLATE: &str = "[{bar:30.cyan/blue}] {msg}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Active,
    Done,
}

/// Live state of one download row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub display_name: String,
    pub bytes_downloaded: u64,
    pub total_bytes: u64,
    /// 1-based terminal row
    pub line: usize,
    pub state: EntryState,
}

impl ProgressEntry {
    pub fn percent(&self) -> u64 {
        if self.total_bytes == 0 {
            return 0;
        }
        (self.bytes_downloaded.min(self.total_bytes) * 100) / self.total_bytes
    }
}

/// Aggregate counters shown on the summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub completed: usize,
    pub failed: usize,
    pub active: usize,
    pub bytes_downloaded: u64,
    pub known_bytes: u64,
}

/// Text drawn next to a row's bar.
pub fn format_row(entry: &ProgressEntry) -> String {
    format!(
        "{:>2}. {} {}/{} ({}%)",
        entry.line,
        entry.display_name,
        HumanBytes(entry.bytes_downloaded),
        HumanBytes(entry.total_bytes),
        entry.percent()
    )
}

pub fn summary_line(counts: &ProgressCounts) -> String {
    format!(
        "Completed: {} | Failed: {} | Active: {} | Downloaded: {} / {}",
        counts.completed,
        counts.failed,
        counts.active,
        HumanBytes(counts.bytes_downloaded),
        HumanBytes(counts.known_bytes)
    )
}

struct Row {
    entry: ProgressEntry,
    bar: ProgressBar,
}

#[derive(Default)]
struct TrackerState {
    rows: Vec<Row>,
    rows_by_job: HashMap<RepoId, usize>,
    statuses: HashMap<RepoId, JobStatus>,
    downloading: usize,
    peak_downloading: usize,
}

impl TrackerState {
    fn counts(&self) -> ProgressCounts {
        let mut counts = ProgressCounts::default();
        for status in self.statuses.values() {
            match status {
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Downloading | JobStatus::Verifying => counts.active += 1,
                JobStatus::Pending => {}
            }
        }
        for row in &self.rows {
            counts.bytes_downloaded += row.entry.bytes_downloaded;
            counts.known_bytes += row.entry.total_bytes;
        }
        counts
    }
}

/// Shared registry of per-download rows. Every read or write of the row
/// table happens under one mutex; rendering composes the whole frame while
/// holding it.
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    multi: MultiProgress,
    summary: ProgressBar,
    row_style: ProgressStyle,
    interactive: bool,
    redraw_on_progress: bool,
    render_interval: Duration,
}

impl ProgressTracker {
    /// Draws to stderr only when it is a terminal.
    pub fn new(render_interval: Duration, redraw_on_progress: bool) -> Self {
        let interactive = console::Term::stderr().is_term();
        Self::with_interactive(interactive, render_interval, redraw_on_progress)
    }

    pub fn hidden() -> Self {
        Self::with_interactive(false, Duration::from_millis(100), false)
    }

    pub fn with_interactive(interactive: bool, render_interval: Duration, redraw_on_progress: bool) -> Self {
        let render_interval = render_interval.max(Duration::from_millis(1));
        let target = if interactive {
            let hz = (1000 / render_interval.as_millis().max(1)).clamp(1, 60) as u8;
            ProgressDrawTarget::stderr_with_hz(hz)
        } else {
            ProgressDrawTarget::hidden()
        };
        let multi = MultiProgress::with_draw_target(target);

        let summary = multi.add(ProgressBar::new(0));
        summary.set_style(ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_bar()));
        let row_style = ProgressStyle::with_template(ROW_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");

        Self {
            state: Mutex::new(TrackerState::default()),
            multi,
            summary,
            row_style,
            interactive,
            redraw_on_progress,
            render_interval,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops every row ahead of a new batch.
    pub fn reset(&self) {
        let mut state = self.lock();
        for row in state.rows.drain(..) {
            self.multi.remove(&row.bar);
        }
        *state = TrackerState::default();
    }

    /// Records a job status. Terminal statuses retire the job's row.
    pub fn set_status(&self, repo_id: &RepoId, status: JobStatus) {
        let mut state = self.lock();
        let previous = state.statuses.insert(repo_id.clone(), status);

        if previous == Some(JobStatus::Downloading) && status != JobStatus::Downloading {
            state.downloading = state.downloading.saturating_sub(1);
        }
        if status == JobStatus::Downloading && previous != Some(JobStatus::Downloading) {
            state.downloading += 1;
            state.peak_downloading = state.peak_downloading.max(state.downloading);
        }

        if let Some(&index) = state.rows_by_job.get(repo_id) {
            let row = &mut state.rows[index];
            let labelled = |label: &str| format!("{} {label}", format_row(&row.entry));
            match status {
                JobStatus::Verifying => row.bar.set_message(labelled("verifying")),
                JobStatus::Completed => {
                    row.bar.finish_with_message(labelled("done"));
                    row.entry.state = EntryState::Done;
                }
                JobStatus::Failed => {
                    // Failed rows keep their last-known position on screen
                    row.bar.abandon_with_message(labelled("failed"));
                    row.entry.state = EntryState::Done;
                }
                JobStatus::Pending | JobStatus::Downloading => {}
            }
        }
    }

    /// Updates a job's row, registering it on the first report.
    pub fn report_progress(&self, repo_id: &RepoId, display_name: &str, bytes_downloaded: u64, total_bytes: u64) {
        {
            let mut state = self.lock();
            match state.rows_by_job.get(repo_id).copied() {
                Some(index) => {
                    let entry = &mut state.rows[index].entry;
                    entry.bytes_downloaded = bytes_downloaded;
                    entry.total_bytes = total_bytes;
                }
                None => {
                    let line = state.rows.len() + 1;
                    let bar = self
                        .multi
                        .insert_before(&self.summary, ProgressBar::new(total_bytes));
                    let entry = ProgressEntry {
                        display_name: display_name.to_string(),
                        bytes_downloaded,
                        total_bytes,
                        line,
                        state: EntryState::Active,
                    };
                    bar.set_style(self.row_style.clone());
                    bar.set_position(bytes_downloaded);
                    bar.set_message(format_row(&entry));

                    tracing::trace!(repo = %repo_id, asset = display_name, line, "Registered progress row");
                    state.rows.push(Row { entry, bar });
                    state.rows_by_job.insert(repo_id.clone(), line - 1);
                }
            }
        }

        if self.redraw_on_progress {
            self.render();
        }
    }

    /// Pushes the current row table and summary to the display as one frame.
    pub fn render(&self) {
        let state = self.lock();
        for row in state.rows.iter().filter(|row| row.entry.state == EntryState::Active) {
            row.bar.set_length(row.entry.total_bytes);
            row.bar.set_position(row.entry.bytes_downloaded);
            row.bar.set_message(format_row(&row.entry));
        }
        self.summary.set_message(summary_line(&state.counts()));
        self.summary.tick();
    }

    pub fn has_active(&self) -> bool {
        self.lock()
            .rows
            .iter()
            .any(|row| row.entry.state == EntryState::Active)
    }

    pub fn entries(&self) -> Vec<ProgressEntry> {
        self.lock().rows.iter().map(|row| row.entry.clone()).collect()
    }

    pub fn counts(&self) -> ProgressCounts {
        self.lock().counts()
    }

    pub fn status(&self, repo_id: &RepoId) -> Option<JobStatus> {
        self.lock().statuses.get(repo_id).copied()
    }

    /// Jobs currently in `Downloading`.
    pub fn downloading(&self) -> usize {
        self.lock().downloading
    }

    /// Highest number of jobs seen in `Downloading` at once.
    pub fn peak_downloading(&self) -> usize {
        self.lock().peak_downloading
    }

    /// Redraws every `render_interval` while rows are active, until `stop`
    /// fires. Draws one last frame on the way out.
    pub fn spawn_maintenance(self: &Arc<Self>, stop: CancellationToken) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tracker.render_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if tracker.has_active() {
                            tracker.render();
                        }
                    }
                }
            }
            tracker.render();
        })
    }

    /// Final frame. The summary stays on screen.
    pub fn finish(&self) {
        self.render();
        let message = summary_line(&self.counts());
        self.summary.finish_with_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> RepoId {
        RepoId::new("owner", name)
    }

    #[test]
    fn test_rows_assigned_in_first_report_order() {
        let tracker = ProgressTracker::hidden();

        tracker.report_progress(&repo("b"), "b.AppImage", 10, 100);
        tracker.report_progress(&repo("a"), "a.AppImage", 5, 50);
        tracker.report_progress(&repo("b"), "b.AppImage", 60, 100);

        let entries = tracker.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].display_name, "b.AppImage");
        assert_eq!(entries[0].line, 1);
        assert_eq!(entries[0].bytes_downloaded, 60);
        assert_eq!(entries[1].display_name, "a.AppImage");
        assert_eq!(entries[1].line, 2);
    }

    #[test]
    fn test_terminal_status_retires_row_but_keeps_it() {
        let tracker = ProgressTracker::hidden();
        tracker.set_status(&repo("a"), JobStatus::Downloading);
        tracker.report_progress(&repo("a"), "a.AppImage", 30, 100);
        assert!(tracker.has_active());

        tracker.set_status(&repo("a"), JobStatus::Failed);

        assert!(!tracker.has_active());
        let entries = tracker.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].state, EntryState::Done);
        assert_eq!(entries[0].bytes_downloaded, 30);
    }

    #[test]
    fn test_downloading_count_and_peak() {
        let tracker = ProgressTracker::hidden();
        tracker.set_status(&repo("a"), JobStatus::Downloading);
        tracker.set_status(&repo("b"), JobStatus::Downloading);
        tracker.set_status(&repo("a"), JobStatus::Verifying);
        tracker.set_status(&repo("c"), JobStatus::Downloading);
        tracker.set_status(&repo("b"), JobStatus::Failed);

        assert_eq!(tracker.downloading(), 1);
        assert_eq!(tracker.peak_downloading(), 2);
    }

    #[test]
    fn test_summary_line_counts() {
        let tracker = ProgressTracker::hidden();
        tracker.set_status(&repo("a"), JobStatus::Downloading);
        tracker.report_progress(&repo("a"), "a.AppImage", 1024, 2048);
        tracker.set_status(&repo("a"), JobStatus::Completed);
        tracker.set_status(&repo("b"), JobStatus::Failed);
        tracker.set_status(&repo("c"), JobStatus::Downloading);
        tracker.report_progress(&repo("c"), "c.AppImage", 0, 2048);

        let counts = tracker.counts();
        assert_eq!(
            counts,
            ProgressCounts {
                completed: 1,
                failed: 1,
                active: 1,
                bytes_downloaded: 1024,
                known_bytes: 4096,
            }
        );
        assert_eq!(
            summary_line(&counts),
            "Completed: 1 | Failed: 1 | Active: 1 | Downloaded: 1.00 KiB / 4.00 KiB"
        );
    }

    #[test]
    fn test_render_draws_row_text_and_summary() {
        let tracker = ProgressTracker::hidden();
        tracker.report_progress(&repo("a"), "a.AppImage", 0, 1024);
        tracker.report_progress(&repo("a"), "a.AppImage", 512, 1024);

        tracker.render();

        let state = tracker.lock();
        let row = &state.rows[0];
        assert_eq!(row.bar.message(), format_row(&row.entry));
        assert_eq!(row.bar.message(), " 1. a.AppImage 512 B/1.00 KiB (50%)");
        assert_eq!(row.bar.position(), 512);
        assert!(tracker.summary.message().starts_with("Completed: 0"));
    }

    #[test]
    fn test_terminal_status_labels_rendered_row() {
        let tracker = ProgressTracker::hidden();
        tracker.report_progress(&repo("a"), "a.AppImage", 1024, 1024);

        tracker.set_status(&repo("a"), JobStatus::Failed);

        assert_eq!(
            tracker.lock().rows[0].bar.message(),
            " 1. a.AppImage 1.00 KiB/1.00 KiB (100%) failed"
        );
    }

    #[test]
    fn test_reset_clears_rows() {
        let tracker = ProgressTracker::hidden();
        tracker.set_status(&repo("a"), JobStatus::Downloading);
        tracker.report_progress(&repo("a"), "a.AppImage", 1, 2);

        tracker.reset();

        assert!(tracker.entries().is_empty());
        assert_eq!(tracker.peak_downloading(), 0);
        assert_eq!(tracker.status(&repo("a")), None);
    }

    #[test]
    fn test_concurrent_reports_keep_unique_lines() {
        let tracker = Arc::new(ProgressTracker::hidden());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    let id = repo(&format!("r{i}"));
                    for bytes in 0..50 {
                        tracker.report_progress(&id, &format!("r{i}.AppImage"), bytes, 50);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut lines: Vec<usize> = tracker.entries().iter().map(|e| e.line).collect();
        lines.sort_unstable();
        assert_eq!(lines, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_maintenance_loop_stops_on_signal() {
        let tracker = Arc::new(ProgressTracker::with_interactive(false, Duration::from_millis(5), true));
        tracker.report_progress(&repo("a"), "a.AppImage", 1, 10);

        let stop = CancellationToken::new();
        let handle = tracker.spawn_maintenance(stop.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("maintenance loop should stop")
            .unwrap();
    }
}
