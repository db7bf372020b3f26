//! The `sayd` binary: argument parsing, configuration loading and the
//! composition root.
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by main.rs only
use dotenvy as _;

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod parser;

pub use bootstrap::run_daemon;
pub use commands::Commands;
pub use config::load_config;
pub use error::CliError;
pub use parser::Cli;
