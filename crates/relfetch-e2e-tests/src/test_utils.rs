use eyre::Result;
use httpmock::prelude::*;
use httpmock::Mock;
use relfetch_lib::Config;
use relfetch_lib::batch::ConcurrencyController;
use relfetch_lib::progress::ProgressTracker;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const OWNER: &str = "fixtures";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn release_path(repo: &str) -> String {
    format!("/repos/{OWNER}/{repo}/releases/latest")
}

pub fn download_path(repo: &str, asset_name: &str) -> String {
    format!("/download/{repo}/{asset_name}")
}

/// One asset entry of a release payload.
pub fn asset_json(server: &MockServer, repo: &str, name: &str, content: &[u8]) -> Value {
    json!({
        "name": name,
        "size": content.len(),
        "digest": format!("sha256:{}", sha256_hex(content)),
        "browser_download_url": server.url(download_path(repo, name)),
    })
}

pub fn release_json(tag: &str, assets: Vec<Value>) -> Value {
    json!({ "tag_name": tag, "prerelease": false, "assets": assets })
}

/// A fake repository whose latest release carries `asset_name` and, when
/// given, a `<asset_name>.sha256sum` file with `checksum_content`.
pub struct FixtureRepo<'a> {
    pub repo: &'a str,
    pub asset_name: &'a str,
    pub content: &'a [u8],
    pub checksum_content: Option<String>,
}

impl FixtureRepo<'_> {
    pub fn checksum_name(&self) -> String {
        format!("{}.sha256sum", self.asset_name)
    }

    pub fn release(&self, server: &MockServer) -> Value {
        let mut assets = vec![asset_json(server, self.repo, self.asset_name, self.content)];
        if let Some(checksum) = &self.checksum_content {
            assets.push(asset_json(
                server,
                self.repo,
                &self.checksum_name(),
                checksum.as_bytes(),
            ));
        }
        release_json("v1.0.0", assets)
    }

    /// Serves the asset files only.
    pub async fn mock_downloads(&self, server: &MockServer) {
        let content = self.content.to_vec();
        server
            .mock_async(|when, then| {
                when.method(GET).path(download_path(self.repo, self.asset_name));
                then.status(200).body(content);
            })
            .await;

        if let Some(checksum) = self.checksum_content.clone() {
            server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path(download_path(self.repo, &self.checksum_name()));
                    then.status(200).body(checksum);
                })
                .await;
        }
    }

    pub async fn mock_release<'s>(&self, server: &'s MockServer) -> Mock<'s> {
        let release = self.release(server);
        server
            .mock_async(|when, then| {
                when.method(GET).path(release_path(self.repo));
                then.status(200)
                    .header("x-ratelimit-limit", "60")
                    .header("x-ratelimit-remaining", "59")
                    .json_body(release);
            })
            .await
    }

    pub async fn mock_all(&self, server: &MockServer) {
        self.mock_release(server).await;
        self.mock_downloads(server).await;
    }
}

pub async fn mock_missing_repo<'s>(server: &'s MockServer, repo: &str) -> Mock<'s> {
    server
        .mock_async(|when, then| {
            when.method(GET).path(release_path(repo));
            then.status(404).json_body(json!({ "message": "Not Found" }));
        })
        .await
}

pub fn test_config(server: &MockServer, output_dir: &Path) -> Config {
    Config {
        api_base_url: server.base_url(),
        output_dir: output_dir.to_path_buf(),
        retry_base_delay_ms: 10,
        request_timeout_secs: 10,
        ..Config::default()
    }
}

pub fn controller(app_config: Config) -> ConcurrencyController {
    ConcurrencyController::new(
        app_config,
        None,
        Arc::new(ProgressTracker::with_interactive(false, Duration::from_millis(20), false)),
        CancellationToken::new(),
    )
}

pub fn setup_output_dir() -> Result<TempDir> {
    Ok(tempfile::tempdir()?)
}
