use crate::cli::params::TokenParams;
use crate::credentials::{CredentialProvider, TOKEN_ENV_VAR};
use crate::error::RelfetchError;

pub fn run_set_token(params: TokenParams, token: &str) -> Result<(), RelfetchError> {
    params.credentials.save_token(token)?;
    println!("Token saved to {}", params.credentials.path().display());
    Ok(())
}

pub fn run_delete_token(params: TokenParams) -> Result<(), RelfetchError> {
    if params.credentials.delete_token()? {
        println!("Token deleted from {}", params.credentials.path().display());
    } else {
        println!("No token stored at {}", params.credentials.path().display());
    }
    Ok(())
}

pub fn run_token_status(params: TokenParams) -> Result<(), RelfetchError> {
    let from_env = std::env::var(TOKEN_ENV_VAR).is_ok_and(|t| !t.trim().is_empty());
    let stored = params.credentials.clone().without_env().get_token()?.is_some();

    match (from_env, stored) {
        (true, _) => println!("Token available from {TOKEN_ENV_VAR}"),
        (false, true) => println!("Token stored at {}", params.credentials.path().display()),
        (false, false) => println!("No token configured; requests are anonymous"),
    }
    Ok(())
}
