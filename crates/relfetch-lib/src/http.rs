use crate::config::Config;
use crate::error::RelfetchError;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const GITHUB_JSON: &str = "application/vnd.github+json";

const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// One worker's HTTP client. Workers never share a session.
#[derive(Clone, Debug)]
pub struct HttpSession {
    client: Client,
    token: Option<String>,
}

impl HttpSession {
    pub fn new(app_config: &Config, token: Option<String>) -> Result<Self, RelfetchError> {
        let client = Client::builder()
            .user_agent(app_config.user_agent.clone())
            .connect_timeout(app_config.connect_timeout())
            .timeout(app_config.request_timeout())
            .build()
            .map_err(|e| RelfetchError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self { client, token })
    }

    /// `GET` against the release API.
    pub fn api_get(&self, url: &str) -> RequestBuilder {
        self.get(url).header(ACCEPT, GITHUB_JSON)
    }

    /// Plain authenticated `GET`.
    pub fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }
}

/// Values of the `X-RateLimit-*` headers of one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Unix timestamp at which the window resets
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        Self {
            limit: read(RATE_LIMIT_LIMIT),
            remaining: read(RATE_LIMIT_REMAINING),
            reset: read(RATE_LIMIT_RESET),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// 429 and an exhausted 403 are handled the same way.
    pub fn is_rate_limited(&self, status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN && self.is_exhausted())
    }

    /// Wait before the next attempt, measured from `now`.
    pub fn wait_from(&self, now: SystemTime) -> Duration {
        match self.reset {
            Some(reset) => rate_limit_wait(reset, now),
            None => Duration::from_secs(1),
        }
    }

    pub fn log(&self, url: &str) {
        tracing::debug!(
            url,
            limit = ?self.limit,
            remaining = ?self.remaining,
            reset = ?self.reset,
            "Rate limit status"
        );
    }
}

/// `max(1, reset - now)` whole seconds.
pub fn rate_limit_wait(reset: u64, now: SystemTime) -> Duration {
    let now_secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Duration::from_secs(reset.saturating_sub(now_secs).max(1))
}
