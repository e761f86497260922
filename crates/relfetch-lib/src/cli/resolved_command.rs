use crate::cli::args::Command;
use crate::cli::params::{FetchParams, TokenParams};
use crate::config::{Config, load_config, validate_config};
use crate::credentials::FileCredentialStore;
use crate::error::RelfetchError;
use crate::release::RepoId;
use itertools::Itertools;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum ResolvedCommand {
    Fetch(FetchParams),
    SetToken(TokenParams, String),
    DeleteToken(TokenParams),
    TokenStatus(TokenParams),
}

fn token_params(app_config: &Config) -> Result<TokenParams, RelfetchError> {
    Ok(TokenParams {
        credentials: FileCredentialStore::from_config(app_config)?,
    })
}

/// Parses repository identifiers, keeping the first occurrence of duplicates.
pub fn parse_repo_ids(repos: &[String]) -> Result<Vec<RepoId>, RelfetchError> {
    let parsed: Vec<RepoId> = repos
        .iter()
        .map(|value| value.parse::<RepoId>())
        .collect::<Result<_, _>>()?;

    let total = parsed.len();
    let unique: Vec<RepoId> = parsed.into_iter().unique().collect();
    if unique.len() != total {
        tracing::warn!(dropped = total - unique.len(), "Ignoring repeated repositories");
    }

    Ok(unique)
}

pub fn resolve_command(command: Command) -> Result<ResolvedCommand, RelfetchError> {
    match command {
        Command::Fetch {
            config_path,
            repos,
            concurrency,
            output_dir,
            max_attempts,
        } => {
            if repos.is_empty() {
                return Err(RelfetchError::CliArgumentValidation {
                    details: "At least one --repo OWNER/REPO is required.".to_string(),
                });
            }

            let mut app_config = load_config(config_path.as_deref())?;
            if let Some(concurrency) = concurrency {
                app_config.concurrency = concurrency;
            }
            if let Some(output_dir) = output_dir {
                app_config.output_dir = PathBuf::from(output_dir);
            }
            if let Some(max_attempts) = max_attempts {
                app_config.max_attempts = max_attempts;
            }
            validate_config(&app_config)?;

            let repo_ids = parse_repo_ids(&repos)?;
            let credentials = FileCredentialStore::from_config(&app_config)?;

            Ok(ResolvedCommand::Fetch(FetchParams {
                app_config,
                repo_ids,
                credentials,
            }))
        }
        Command::SetToken { config_path, token } => {
            if token.trim().is_empty() {
                return Err(RelfetchError::CliArgumentValidation {
                    details: "--set-token requires a non-empty token.".to_string(),
                });
            }
            let app_config = load_config(config_path.as_deref())?;
            Ok(ResolvedCommand::SetToken(token_params(&app_config)?, token))
        }
        Command::DeleteToken { config_path } => {
            let app_config = load_config(config_path.as_deref())?;
            Ok(ResolvedCommand::DeleteToken(token_params(&app_config)?))
        }
        Command::TokenStatus { config_path } => {
            let app_config = load_config(config_path.as_deref())?;
            Ok(ResolvedCommand::TokenStatus(token_params(&app_config)?))
        }
    }
}
