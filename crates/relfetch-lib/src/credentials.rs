use crate::config::Config;
use crate::error::RelfetchError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Source of the API token. Implementations own their storage.
pub trait CredentialProvider: Send + Sync {
    fn get_token(&self) -> Result<Option<String>, RelfetchError>;
    fn save_token(&self, token: &str) -> Result<(), RelfetchError>;
    /// Returns whether a stored token was removed.
    fn delete_token(&self) -> Result<bool, RelfetchError>;
}

/// Token for outgoing requests, or `None` with an `AuthenticationMissing`
/// warning. Anonymous requests still work at lower rate limits.
pub fn token_or_warn(provider: &dyn CredentialProvider) -> Option<String> {
    match provider.get_token() {
        Ok(Some(token)) => Some(token),
        Ok(None) => {
            tracing::warn!("AuthenticationMissing: no API token configured, using anonymous requests");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "AuthenticationMissing: could not read API token, using anonymous requests");
            None
        }
    }
}

/// Token kept in a single owner-only file, `~/.config/relfetch/token` by default.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    read_env: bool,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_env: true,
        }
    }

    pub fn default_path() -> Result<PathBuf, RelfetchError> {
        let home = home::home_dir().ok_or_else(|| RelfetchError::CredentialStore {
            path: PathBuf::from("~"),
            reason: "could not determine home directory".to_string(),
        })?;
        Ok(home.join(".config").join("relfetch").join("token"))
    }

    pub fn from_config(app_config: &Config) -> Result<Self, RelfetchError> {
        match &app_config.token_path {
            Some(path) => Ok(Self::new(path)),
            None => Ok(Self::new(Self::default_path()?)),
        }
    }

    /// Ignore `GITHUB_TOKEN` and read only the file.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, err: impl ToString) -> RelfetchError {
        RelfetchError::CredentialStore {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}

impl CredentialProvider for FileCredentialStore {
    fn get_token(&self) -> Result<Option<String>, RelfetchError> {
        if self.read_env {
            if let Some(token) = std::env::var(TOKEN_ENV_VAR)
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
            {
                tracing::debug!("Using token from {TOKEN_ENV_VAR}");
                return Ok(Some(token));
            }
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.store_error(e)),
        }
    }

    fn save_token(&self, token: &str) -> Result<(), RelfetchError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(self.store_error("refusing to store an empty token"));
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.store_error(e))?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| self.store_error(e))?;
        file.write_all(token.as_bytes())
            .map_err(|e| self.store_error(e))?;

        // Files created before we owned them keep their old mode otherwise
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.store_error(e))?;
        }

        tracing::info!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    fn delete_token(&self) -> Result<bool, RelfetchError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Token deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.store_error(e)),
        }
    }
}

/// In-memory provider.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: Mutex<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn get_token(&self) -> Result<Option<String>, RelfetchError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_token(&self, token: &str) -> Result<(), RelfetchError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn delete_token(&self) -> Result<bool, RelfetchError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> FileCredentialStore {
        FileCredentialStore::new(dir.path().join("nested").join("token")).without_env()
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert_eq!(store.get_token().unwrap(), None);
        store.save_token("  ghp_secret\n").unwrap();
        assert_eq!(store.get_token().unwrap().as_deref(), Some("ghp_secret"));

        assert!(store.delete_token().unwrap());
        assert!(!store.delete_token().unwrap());
        assert_eq!(store.get_token().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "old").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        store.save_token("new").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_rejects_empty_token() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(&dir).save_token("   ").unwrap_err();

        assert!(matches!(err, RelfetchError::CredentialStore { .. }));
    }

    #[test]
    fn test_from_config_uses_token_path() {
        let app_config = Config {
            token_path: Some(PathBuf::from("/tmp/relfetch-test/token")),
            ..Config::default()
        };

        let store = FileCredentialStore::from_config(&app_config).unwrap();
        assert_eq!(store.path(), Path::new("/tmp/relfetch-test/token"));
    }

    #[test]
    fn test_static_credentials() {
        let provider = StaticCredentials::default();
        assert_eq!(token_or_warn(&provider), None);

        provider.save_token("abc").unwrap();
        assert_eq!(token_or_warn(&provider).as_deref(), Some("abc"));
        assert!(provider.delete_token().unwrap());
        assert_eq!(provider.get_token().unwrap(), None);
    }
}
