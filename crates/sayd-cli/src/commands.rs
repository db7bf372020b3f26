//! Subcommands.

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the daemon in the foreground (default)
    Run,

    /// Load and validate the configuration, then print the module table
    CheckConfig,
}
