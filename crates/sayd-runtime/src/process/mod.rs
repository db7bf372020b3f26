//! OS-level process helpers for worker processes.
//!
//! - `shutdown` - SIGTERM → SIGKILL escalation for a `tokio::process::Child`
//! - `stream` - lossy line reading and stderr forwarding

pub mod shutdown;
mod stream;

pub use shutdown::shutdown_child;
pub use stream::{LineReader, spawn_stderr_reader};
