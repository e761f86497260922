use crate::error::RelfetchError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// `owner/repo` pair keying one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

fn valid_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl FromStr for RepoId {
    type Err = RelfetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RelfetchError::InvalidRepositoryId {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let (owner, repo) = value
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected owner/repo"))?;

        if !valid_component(owner) || !valid_component(repo) {
            return Err(invalid(
                "owner and repo must be non-empty and contain only letters, digits, '-', '_' or '.'",
            ));
        }

        Ok(Self::new(owner, repo))
    }
}

/// Parsed `"<algorithm>:<hex>"` digest. Any algorithm name parses; only
/// `sha256` can be verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDigest {
    pub algorithm: String,
    pub hex: String,
}

impl AssetDigest {
    pub const SHA256: &'static str = "sha256";

    pub fn sha256(hex: impl Into<String>) -> Self {
        Self {
            algorithm: Self::SHA256.to_string(),
            hex: hex.into().to_ascii_lowercase(),
        }
    }

    pub fn is_sha256(&self) -> bool {
        self.algorithm == Self::SHA256
    }
}

impl fmt::Display for AssetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestParseError(pub String);

impl fmt::Display for DigestParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetDigest {
    type Err = DigestParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex_digest) = value
            .trim()
            .split_once(':')
            .ok_or_else(|| DigestParseError(format!("'{value}' is not of the form algorithm:hex")))?;

        if algorithm.is_empty() {
            return Err(DigestParseError(format!("'{value}' has no algorithm")));
        }
        if hex_digest.is_empty() || hex::decode(hex_digest).is_err() {
            return Err(DigestParseError(format!("'{value}' has an invalid hex digest")));
        }

        Ok(Self {
            algorithm: algorithm.to_ascii_lowercase(),
            hex: hex_digest.to_ascii_lowercase(),
        })
    }
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// Asset file name, unique within a release
    pub name: String,
    pub size_bytes: u64,
    /// Digest published by the release API
    pub digest: AssetDigest,
    /// Absolute download URL
    pub download_url: Url,
}

impl ReleaseAsset {
    /// Same asset with a different expected digest.
    pub fn with_digest(&self, digest: AssetDigest) -> Self {
        Self {
            digest,
            ..self.clone()
        }
    }
}

/// Metadata of the latest release of one repository. Built fresh per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDetails {
    pub owner: String,
    pub repo: String,
    /// Tag name without a leading `v`
    pub version: String,
    pub prerelease: bool,
    pub assets: Vec<ReleaseAsset>,
}

/// Wire shape of `GET /repos/{owner}/{repo}/releases/latest`. Assets stay
/// untyped until each one is validated on its own.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRelease {
    pub tag_name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAsset {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub digest: Option<String>,
    pub browser_download_url: Option<String>,
}

impl TryFrom<RawAsset> for ReleaseAsset {
    type Error = String;

    fn try_from(raw: RawAsset) -> Result<Self, Self::Error> {
        let name = raw.name.filter(|n| !n.is_empty()).ok_or("missing name")?;
        let size_bytes = raw.size.ok_or("missing size")?;
        let digest = raw
            .digest
            .ok_or("missing digest")?
            .parse::<AssetDigest>()
            .map_err(|e| e.to_string())?;
        let download_url = raw
            .browser_download_url
            .ok_or("missing browser_download_url")?;
        let download_url = Url::parse(&download_url)
            .map_err(|e| format!("invalid browser_download_url '{download_url}': {e}"))?;

        Ok(Self {
            name,
            size_bytes,
            digest,
            download_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_parses_owner_and_repo() {
        let id: RepoId = "pbek/QOwnNotes".parse().expect("valid id");

        assert_eq!(id.owner, "pbek");
        assert_eq!(id.repo, "QOwnNotes");
        assert_eq!(id.to_string(), "pbek/QOwnNotes");
    }

    #[test]
    fn test_repo_id_rejects_malformed_values() {
        for value in ["pbek", "/repo", "owner/", "a/b/c", "own er/repo", ""] {
            assert!(value.parse::<RepoId>().is_err(), "{value:?} should be rejected");
        }
    }

    #[test]
    fn test_digest_parses_and_normalises_case() {
        let digest: AssetDigest = "SHA256:ABCDEF01".parse().expect("valid digest");

        assert_eq!(digest.algorithm, "sha256");
        assert_eq!(digest.hex, "abcdef01");
        assert!(digest.is_sha256());
        assert_eq!(digest.to_string(), "sha256:abcdef01");
    }

    #[test]
    fn test_digest_accepts_other_algorithms() {
        let digest: AssetDigest = "sha512:00ff".parse().expect("valid digest");

        assert_eq!(digest.algorithm, "sha512");
        assert!(!digest.is_sha256());
    }

    #[test]
    fn test_digest_rejects_malformed_values() {
        for value in ["abcdef", ":abcd", "sha256:", "sha256:xyz", "sha256:abc"] {
            assert!(value.parse::<AssetDigest>().is_err(), "{value:?} should be rejected");
        }
    }

    #[test]
    fn test_raw_asset_requires_every_field() {
        let complete = RawAsset {
            name: Some("app.AppImage".to_string()),
            size: Some(10),
            digest: Some("sha256:00".to_string()),
            browser_download_url: Some("https://example.com/app.AppImage".to_string()),
        };
        let asset = ReleaseAsset::try_from(complete).expect("complete asset");
        assert_eq!(asset.name, "app.AppImage");
        assert_eq!(asset.size_bytes, 10);

        let missing_digest = RawAsset {
            name: Some("app.AppImage".to_string()),
            size: Some(10),
            digest: None,
            browser_download_url: Some("https://example.com/app.AppImage".to_string()),
        };
        assert_eq!(
            ReleaseAsset::try_from(missing_digest).unwrap_err(),
            "missing digest"
        );

        let relative_url = RawAsset {
            name: Some("app.AppImage".to_string()),
            size: Some(10),
            digest: Some("sha256:00".to_string()),
            browser_download_url: Some("app.AppImage".to_string()),
        };
        assert!(ReleaseAsset::try_from(relative_url).is_err());
    }
}
