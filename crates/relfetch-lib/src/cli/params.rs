use crate::config::Config;
use crate::credentials::FileCredentialStore;
use crate::release::RepoId;

#[derive(Debug, Clone)]
pub struct FetchParams {
    pub app_config: Config,
    pub repo_ids: Vec<RepoId>,
    pub credentials: FileCredentialStore,
}

#[derive(Debug, Clone)]
pub struct TokenParams {
    pub credentials: FileCredentialStore,
}
