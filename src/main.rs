//! tvshows - Browse and watch TV shows from a home media server
//!
//! # Usage
//!
//! ```bash
//! tvshows home
//! tvshows episodes "Star Plus" "Anupamaa" --all
//! tvshows watch "Star Plus" "Anupamaa" "Episode 512"
//! tvshows hosts --json
//! ```

use clap::Parser;
use tracing::warn;

use tvshows::cli::{Cli, Command, ExitCode, Output};
use tvshows::commands::{self, AppContext};
use tvshows::config::Config;
use tvshows::logging;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let loaded = Config::load(cli.config.as_deref());
    let config = loaded.as_ref().cloned().unwrap_or_default();
    logging::init(config.log_filter.as_deref(), cli.verbose);
    if let Err(e) = loaded {
        warn!("Ignoring config, using defaults: {:#}", e);
    }

    run_cli(cli, config).await.into()
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: Config) -> ExitCode {
    let output = Output::new(&cli);

    let ctx = match AppContext::new(config, &cli.hosts) {
        Ok(ctx) => ctx,
        Err(e) => return output.error(format!("Invalid configuration: {}", e), ExitCode::InvalidArgs),
    };

    match cli.command {
        Command::Home => commands::home_cmd(&ctx, &output).await,

        Command::Episodes(cmd) => commands::episodes_cmd(cmd, &ctx, &output).await,

        Command::Parts(cmd) => commands::parts_cmd(cmd, &ctx, &output).await,

        Command::Next(cmd) => commands::next_cmd(cmd, &ctx, &output).await,

        Command::Watch(cmd) => commands::watch_cmd(cmd, &ctx, &output).await,

        Command::Hosts(cmd) => commands::hosts_cmd(cmd, &ctx, &output),
    }
}
