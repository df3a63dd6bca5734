mod commands;

use anyhow::Result;
use clap::Parser;

use geisli_cli::{Cli, Commands, verbosity_to_log_level};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(verbosity_to_log_level(cli.verbose))
        .init();

    match cli.command {
        Commands::Decode(args) => commands::decode::run(args).await,
        Commands::Config { action } => commands::config::run(action),
    }
}
