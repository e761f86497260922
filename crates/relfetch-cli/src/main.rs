use relfetch_lib::cli::{
    ResolvedCommand, parse_args, resolve_command, run_delete_token, run_fetch, run_set_token,
    run_token_status,
};
use relfetch_lib::error::RelfetchError;
use std::process::ExitCode;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<ExitCode, RelfetchError> {
    color_eyre::install()?;

    let args = parse_args();
    let command = resolve_command(args.command)?;

    match command {
        ResolvedCommand::Fetch(params) => {
            let report = run_fetch(params).await?;
            if report.any_failed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        ResolvedCommand::SetToken(params, token) => run_set_token(params, &token)?,
        ResolvedCommand::DeleteToken(params) => run_delete_token(params)?,
        ResolvedCommand::TokenStatus(params) => run_token_status(params)?,
    }

    Ok(ExitCode::SUCCESS)
}
