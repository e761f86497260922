use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Base URL of the release API, without a trailing slash
    pub api_base_url: String,
    /// Number of parallel workers
    pub concurrency: usize,
    /// Attempt ceiling shared by the resolve and download steps of a job
    pub max_attempts: u32,
    /// Base delay for exponential backoff on transient non-rate-limit failures
    pub retry_base_delay_ms: u64,
    /// Streaming chunk size used by both the downloader and the verifier
    pub chunk_size: usize,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Redraw period of the progress view
    pub render_interval_ms: u64,
    /// Redraw immediately on every progress callback as well as on the timer
    pub redraw_on_progress: bool,
    /// File-name suffix identifying the primary artifact
    pub asset_suffix: String,
    /// Suffixes appended to the primary artifact name to find its checksum file, in priority order
    pub checksum_suffixes: Vec<String>,
    pub output_dir: PathBuf,
    /// Leave partially written files on disk when a download fails
    pub keep_partial_files: bool,
    pub user_agent: String,
    /// Overrides the default token file location
    pub token_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: 500,
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            render_interval_ms: 100,
            redraw_on_progress: false,
            asset_suffix: ".AppImage".to_string(),
            checksum_suffixes: vec![".sha256sum".to_string(), ".sha256".to_string()],
            output_dir: PathBuf::from("."),
            keep_partial_files: true,
            user_agent: concat!("relfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            token_path: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
