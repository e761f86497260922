use clap::{ArgAction, Parser};
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fetch {
        config_path: Option<String>,
        repos: Vec<String>,
        concurrency: Option<usize>,
        output_dir: Option<String>,
        max_attempts: Option<u32>,
    },
    SetToken {
        config_path: Option<String>,
        token: String,
    },
    DeleteToken {
        config_path: Option<String>,
    },
    TokenStatus {
        config_path: Option<String>,
    },
}

pub struct Args {
    pub command: Command,
    pub log_level: Level,
}

#[derive(Debug, Parser)]
#[command(
    name = "relfetch",
    version,
    about = "Download, verify and install the latest release assets of GitHub repositories"
)]
struct Cli {
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Sets the level of verbosity",
        action = ArgAction::Count,
        global = true
    )]
    verbose: u8,

    #[arg(
        long = "config",
        value_name = "FILE",
        help = "Optional config file (YAML or TOML)"
    )]
    config: Option<String>,

    #[arg(
        short = 'r',
        long = "repo",
        value_name = "OWNER/REPO",
        help = "Repository to fetch the latest release of (repeatable)",
        action = ArgAction::Append,
        required_unless_present_any = ["set_token", "delete_token", "token_status"]
    )]
    repos: Vec<String>,

    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help = "Number of parallel downloads [default: 4]"
    )]
    concurrency: Option<usize>,

    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        help = "Directory to write assets to [default: current directory]"
    )]
    output_dir: Option<String>,

    #[arg(
        long = "max-attempts",
        value_name = "N",
        help = "Attempts per job before a transient failure becomes permanent [default: 5]"
    )]
    max_attempts: Option<u32>,

    #[command(flatten)]
    token: TokenArgs,
}

#[derive(Debug, clap::Args)]
#[group(multiple = false)]
struct TokenArgs {
    /// Store an API token and exit
    #[arg(long = "set-token", value_name = "TOKEN")]
    set_token: Option<String>,

    /// Remove the stored API token and exit
    #[arg(long = "delete-token")]
    delete_token: bool,

    /// Report whether an API token is available and exit
    #[arg(long = "token-status")]
    token_status: bool,
}

impl Args {
    /// Parses without touching global logging state.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_cli(Cli::try_parse_from(args)?))
    }

    fn from_cli(cli: Cli) -> Self {
        let log_level = match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let config_path = cli.config;
        let command = if let Some(token) = cli.token.set_token {
            Command::SetToken { config_path, token }
        } else if cli.token.delete_token {
            Command::DeleteToken { config_path }
        } else if cli.token.token_status {
            Command::TokenStatus { config_path }
        } else {
            Command::Fetch {
                config_path,
                repos: cli.repos,
                concurrency: cli.concurrency,
                output_dir: cli.output_dir,
                max_attempts: cli.max_attempts,
            }
        };

        Args { command, log_level }
    }
}

pub fn parse_args() -> Args {
    let args = Args::from_cli(Cli::parse());

    let mut filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .from_env_lossy();
    for directive in ["hyper_util=warn", "reqwest=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    args
}
