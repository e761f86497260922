mod tracker;

pub use tracker::{EntryState, ProgressCounts, ProgressEntry, ProgressTracker, format_row, summary_line};
