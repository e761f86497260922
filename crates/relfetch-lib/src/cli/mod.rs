mod args;
mod fetch;
mod params;
mod resolved_command;
mod summary;
mod token;

pub use args::{Args, Command, parse_args};
pub use fetch::run_fetch;
pub use params::{FetchParams, TokenParams};
pub use resolved_command::{ResolvedCommand, parse_repo_ids, resolve_command};
pub use summary::{FAILURE_GLYPH, SUCCESS_GLYPH, format_summary, print_summary};
pub use token::{run_delete_token, run_set_token, run_token_status};
