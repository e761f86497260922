#[allow(clippy::module_inception)]
mod download;
mod types;

pub use download::Downloader;
pub use types::{DownloadJob, InvalidTransition, JobStatus};
