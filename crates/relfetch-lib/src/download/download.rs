use crate::config::Config;
use crate::error::FetchError;
use crate::http::{HttpSession, RateLimitInfo};
use crate::release::ReleaseAsset;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Streams release assets to disk.
#[derive(Clone, Debug)]
pub struct Downloader {
    session: HttpSession,
    chunk_size: usize,
    keep_partial_files: bool,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(session: HttpSession, chunk_size: usize, cancel: CancellationToken) -> Self {
        Self {
            session,
            chunk_size: chunk_size.max(1),
            keep_partial_files: true,
            cancel,
        }
    }

    pub fn from_config(session: HttpSession, app_config: &Config, cancel: CancellationToken) -> Self {
        Self::new(session, app_config.chunk_size, cancel).keep_partial_files(app_config.keep_partial_files)
    }

    pub fn keep_partial_files(mut self, keep: bool) -> Self {
        self.keep_partial_files = keep;
        self
    }

    /// Writes `asset` to `destination` in `chunk_size` slices, calling
    /// `on_progress(bytes_so_far, total_bytes)` after every slice. The file
    /// is made executable once complete.
    pub async fn download<F>(
        &self,
        asset: &ReleaseAsset,
        destination: &Path,
        mut on_progress: F,
    ) -> Result<PathBuf, FetchError>
    where
        F: FnMut(u64, u64),
    {
        let url = asset.download_url.as_str();
        tracing::info!(asset = %asset.name, output = %destination.display(), "Downloading");

        let response = self.send(url).await?;
        let total_bytes = response
            .content_length()
            .filter(|len| *len > 0)
            .unwrap_or(asset.size_bytes);

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| local_failure(url, parent, e))?;
        }

        let result = self
            .write_body(response, url, destination, total_bytes, &mut on_progress)
            .await;

        match result {
            Ok(written) => {
                make_executable(destination)
                    .await
                    .map_err(|e| local_failure(url, destination, e))?;
                tracing::info!(asset = %asset.name, bytes = written, output = %destination.display(), "Downloaded");
                Ok(destination.to_path_buf())
            }
            Err(err) => {
                if !self.keep_partial_files && !matches!(err, FetchError::Cancelled) {
                    if let Err(e) = tokio::fs::remove_file(destination).await {
                        tracing::debug!(output = %destination.display(), error = %e, "Could not remove partial file");
                    }
                }
                Err(err)
            }
        }
    }

    /// Fetches a small asset (such as a checksum file) into memory.
    pub async fn fetch_text(&self, asset: &ReleaseAsset) -> Result<String, FetchError> {
        let url = asset.download_url.as_str();
        tracing::debug!(asset = %asset.name, "Fetching");

        self.send(url)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::DownloadFailed {
                url: url.to_string(),
                cause: e.to_string(),
            })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let response = self
            .session
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::DownloadFailed {
                url: url.to_string(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        rate_limit.log(url);

        if rate_limit.is_rate_limited(status) {
            return Err(FetchError::RateLimited {
                url: url.to_string(),
                wait: rate_limit.wait_from(SystemTime::now()),
            });
        }
        if !status.is_success() {
            return Err(FetchError::DownloadFailed {
                url: url.to_string(),
                cause: format!("HTTP {}", status.as_u16()),
            });
        }

        Ok(response)
    }

    async fn write_body<F>(
        &self,
        response: reqwest::Response,
        url: &str,
        destination: &Path,
        total_bytes: u64,
        on_progress: &mut F,
    ) -> Result<u64, FetchError>
    where
        F: FnMut(u64, u64),
    {
        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| local_failure(url, destination, e))?;

        let streamed = self
            .stream_into(&mut file, response, url, destination, total_bytes, on_progress)
            .await;
        // Bytes already reported through `on_progress` must be on disk even
        // when the stream broke off.
        let flushed = file.flush().await;

        let downloaded = streamed?;
        flushed.map_err(|e| local_failure(url, destination, e))?;
        Ok(downloaded)
    }

    async fn stream_into<F>(
        &self,
        file: &mut tokio::fs::File,
        response: reqwest::Response,
        url: &str,
        destination: &Path,
        total_bytes: u64,
        on_progress: &mut F,
    ) -> Result<u64, FetchError>
    where
        F: FnMut(u64, u64),
    {
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(item) = stream.next().await {
            let bytes = item.map_err(|e| FetchError::DownloadFailed {
                url: url.to_string(),
                cause: e.to_string(),
            })?;

            for slice in bytes.chunks(self.chunk_size) {
                if self.cancel.is_cancelled() {
                    tracing::debug!(output = %destination.display(), downloaded, "Download abandoned");
                    return Err(FetchError::Cancelled);
                }
                file.write_all(slice)
                    .await
                    .map_err(|e| local_failure(url, destination, e))?;
                downloaded += slice.len() as u64;
                on_progress(downloaded, total_bytes.max(downloaded));
            }
        }

        Ok(downloaded)
    }
}

/// Local I/O failures while downloading are retried like network failures.
fn local_failure(url: &str, path: &Path, err: std::io::Error) -> FetchError {
    FetchError::DownloadFailed {
        url: url.to_string(),
        cause: format!("{}: {err}", path.display()),
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    tokio::fs::set_permissions(path, permissions).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
