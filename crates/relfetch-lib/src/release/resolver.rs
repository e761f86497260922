use super::types::{RawAsset, RawRelease, ReleaseAsset, ReleaseDetails, RepoId};
use crate::error::FetchError;
use crate::http::{HttpSession, RateLimitInfo};
use crate::utils::strip_version_prefix;
use reqwest::StatusCode;
use std::time::SystemTime;

/// Queries the release API for the latest release of a repository.
#[derive(Clone, Debug)]
pub struct ReleaseResolver {
    session: HttpSession,
    api_base_url: String,
}

impl ReleaseResolver {
    pub fn new(session: HttpSession, api_base_url: &str) -> Self {
        Self {
            session,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn latest_release_url(&self, repo: &RepoId) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base_url, repo.owner, repo.repo
        )
    }

    /// One attempt; retrying is left to the caller, which can tell transient
    /// failures apart through [`FetchError::is_retryable`].
    pub async fn fetch_latest_release(&self, repo: &RepoId) -> Result<ReleaseDetails, FetchError> {
        let url = self.latest_release_url(repo);
        tracing::debug!(repo = %repo, url = %url, "Fetching latest release");

        let response = self
            .session
            .api_get(&url)
            .send()
            .await
            .map_err(|e| FetchError::TransientApi {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        rate_limit.log(&url);

        if rate_limit.is_rate_limited(status) {
            return Err(FetchError::RateLimited {
                url,
                wait: rate_limit.wait_from(SystemTime::now()),
            });
        }

        match status {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(FetchError::ReleaseNotFound {
                    repo: repo.to_string(),
                    status: status.as_u16(),
                });
            }
            s if s.is_server_error() => {
                return Err(FetchError::TransientApi {
                    url,
                    reason: format!("HTTP {}", s.as_u16()),
                });
            }
            s => {
                return Err(FetchError::UnexpectedStatus {
                    url,
                    status: s.as_u16(),
                });
            }
        }

        let body = response.text().await.map_err(|e| FetchError::TransientApi {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let raw: RawRelease =
            serde_json::from_str(&body).map_err(|e| FetchError::InvalidResponse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        Ok(build_release_details(repo, raw))
    }
}

/// Types the raw release, dropping (and logging) assets that do not carry
/// every required field.
pub(crate) fn build_release_details(repo: &RepoId, raw: RawRelease) -> ReleaseDetails {
    let mut assets = Vec::with_capacity(raw.assets.len());

    for (index, value) in raw.assets.into_iter().enumerate() {
        let typed = serde_json::from_value::<RawAsset>(value)
            .map_err(|e| e.to_string())
            .and_then(ReleaseAsset::try_from);

        match typed {
            Ok(asset) => assets.push(asset),
            Err(reason) => {
                tracing::warn!(repo = %repo, index, reason = %reason, "Skipping malformed release asset");
            }
        }
    }

    let version = raw
        .tag_name
        .as_deref()
        .map(strip_version_prefix)
        .unwrap_or_default()
        .to_string();

    tracing::debug!(repo = %repo, version = %version, assets = assets.len(), "Resolved latest release");

    ReleaseDetails {
        owner: repo.owner.clone(),
        repo: repo.repo.clone(),
        version,
        prerelease: raw.prerelease,
        assets,
    }
}
