//! `sayd` entry point.

use clap::Parser;

use sayd_cli::config::apply_overrides;
use sayd_cli::logging::init_tracing;
use sayd_cli::{Cli, CliError, Commands, handlers, load_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "sayd failed");
        eprintln!("sayd: {e}");
        std::process::exit(e.exit_code());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let command = cli.subcommand();
    let mut config = load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, cli.socket);

    match command {
        Commands::Run => handlers::run::execute(config).await,
        Commands::CheckConfig => {
            handlers::check_config::execute(&config);
            Ok(())
        }
    }
}
