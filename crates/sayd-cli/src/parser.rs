//! Root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Speech dispatcher daemon.
///
/// Clients connect over a Unix socket and queue messages; sayd decides
/// what is spoken, in which order, and by which output module.
#[derive(Parser)]
#[command(name = "sayd")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON); defaults to the per-user config directory
    #[arg(short, long, env = "SAYD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Client socket path, overriding the configuration file
    #[arg(short, long, env = "SAYD_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand, `run` when none was given.
    pub fn subcommand(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::parse_from(["sayd"]);
        assert_eq!(cli.subcommand(), Commands::Run);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "sayd",
            "check-config",
            "--config",
            "/etc/sayd.json",
            "-v",
            "--socket",
            "/tmp/s.sock",
        ]);
        assert_eq!(cli.subcommand(), Commands::CheckConfig);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/sayd.json")));
        assert_eq!(cli.socket, Some(PathBuf::from("/tmp/s.sock")));
    }
}
