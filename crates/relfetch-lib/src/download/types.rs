use crate::release::{ReleaseAsset, RepoId};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Downloading,
    Verifying,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Statuses only move forward. Verification is skipped when no
    /// checksum was published, and any live status may fail.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Pending, Downloading) => true,
            (Downloading, Verifying) | (Downloading, Completed) => true,
            (Verifying, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid job status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One repository's trip through resolve, select, download and verify.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub repo_id: RepoId,
    /// Known once the release has been resolved and an asset selected
    pub asset: Option<ReleaseAsset>,
    pub destination_path: Option<PathBuf>,
    status: JobStatus,
    error_message: Option<String>,
}

impl DownloadJob {
    pub fn new(repo_id: RepoId) -> Self {
        Self {
            repo_id,
            asset: None,
            destination_path: None,
            status: JobStatus::Pending,
            error_message: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn assign(&mut self, asset: ReleaseAsset, destination_path: PathBuf) {
        self.asset = Some(asset);
        self.destination_path = Some(destination_path);
    }

    pub fn transition(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        tracing::trace!(repo = %self.repo_id, from = %self.status, to = %next, "Job status changed");
        self.status = next;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }
}
