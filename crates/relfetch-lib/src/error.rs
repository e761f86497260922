use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelfetchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid command line arguments: {details}")]
    CliArgumentValidation { details: String },

    #[error("Invalid repository identifier '{value}': {reason}")]
    InvalidRepositoryId { value: String, reason: String },

    #[error("Credential store at {path} failed: {reason}")]
    CredentialStore { path: PathBuf, reason: String },

    #[error("Failed to build HTTP client: {reason}")]
    HttpClient { reason: String },

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] eyre::Report),
}

/// Failure of a single job. The batch controller uses [`FetchError::is_retryable`]
/// and [`FetchError::retry_wait`] to decide whether another attempt is made.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transient API error from {url}: {reason}")]
    TransientApi { url: String, reason: String },

    #[error("Rate limited by {url}, limit resets in {}s", .wait.as_secs())]
    RateLimited { url: String, wait: Duration },

    #[error("No release found for {repo} (HTTP {status})")]
    ReleaseNotFound { repo: String, status: u16 },

    #[error("No asset ending in '{suffix}' in the latest release of {repo}")]
    AssetNotFound { repo: String, suffix: String },

    #[error("Download of {url} failed: {cause}")]
    DownloadFailed { url: String, cause: String },

    #[error("Unsupported digest algorithm '{algorithm}' for {asset}")]
    UnsupportedDigestAlgorithm { asset: String, algorithm: String },

    #[error("Digest mismatch for {asset}: expected {expected}, got {actual}")]
    DigestMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    #[error("Malformed checksum file {asset}: {reason}")]
    MalformedChecksum { asset: String, reason: String },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("Unexpected HTTP {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt may succeed. Integrity failures are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientApi { .. } | Self::RateLimited { .. } | Self::DownloadFailed { .. }
        )
    }

    /// Server-dictated wait before the next attempt, if any.
    pub fn retry_wait(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { wait, .. } => Some(*wait),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_failures_are_not_retryable() {
        let mismatch = FetchError::DigestMismatch {
            asset: "app.AppImage".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        let unsupported = FetchError::UnsupportedDigestAlgorithm {
            asset: "app.AppImage".to_string(),
            algorithm: "md5".to_string(),
        };

        assert!(!mismatch.is_retryable());
        assert!(!unsupported.is_retryable());
    }

    #[test]
    fn test_rate_limited_carries_wait() {
        let err = FetchError::RateLimited {
            url: "https://api.github.com".to_string(),
            wait: Duration::from_secs(3),
        };

        assert!(err.is_retryable());
        assert_eq!(err.retry_wait(), Some(Duration::from_secs(3)));
        assert_eq!(
            err.to_string(),
            "Rate limited by https://api.github.com, limit resets in 3s"
        );
    }

    #[test]
    fn test_digest_mismatch_message_shows_both_digests() {
        let err = FetchError::DigestMismatch {
            asset: "app.AppImage".to_string(),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        let message = err.to_string();

        assert!(message.contains("expected abc"));
        assert!(message.contains("got def"));
    }
}
