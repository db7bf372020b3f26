//! Client-facing side of the sayd daemon.
//!
//! - `dispatcher` - the single lock around `CoreState`, the wake signal and
//!   every client-visible action
//! - `coordinator` - the task that moves messages from the queues to the
//!   output modules and reacts to their events
//! - `command` - the client line protocol: command parsing and reply
//!   formatting
//! - `connection` - one task per connected client
//! - `admin` - reload and shutdown on signals
//! - `server` - the Unix socket accept loop

pub mod admin;
pub mod command;
pub mod connection;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod server;

pub use admin::run_admin;
pub use command::{Command, CommandError, Setting};
pub use coordinator::run_coordinator;
pub use dispatcher::Dispatcher;
pub use error::ServerError;
pub use server::{bind_socket, remove_socket, serve};
