//! One output module: a worker process and the connection to it.

mod connection;
mod output_module;

pub use connection::ModuleConnection;
pub use output_module::{LoadOptions, OutputModule};
