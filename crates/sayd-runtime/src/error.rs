//! Error types for the module runtime.

use std::time::Duration;

use sayd_core::OutputError;
use thiserror::Error;

use crate::protocol::Reply;

/// A line from a worker that does not follow the reply grammar.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed reply line: {0:?}")]
    Malformed(String),

    #[error("Unknown event code {0}")]
    UnknownEvent(u16),

    #[error("Index mark event without a mark name")]
    MissingMark,
}

/// Errors from talking to one worker process.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Spawning the executable failed.
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker refused `INIT`.
    #[error("Worker failed to initialise: {0}")]
    Init(String),

    /// Writing to the worker failed.
    #[error("Worker I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker's reply pipe closed.
    #[error("Worker closed its reply pipe")]
    Closed,

    #[error("No reply to {request} within {timeout:?}")]
    Timeout {
        request: &'static str,
        timeout: Duration,
    },

    /// The worker answered with a 3xx/4xx reply.
    #[error("Worker rejected {request}: {reply}")]
    Rejected { request: &'static str, reply: Reply },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ModuleError {
    /// Whether the worker must be considered dead after this error.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    /// Translate to the port-level error for `module`.
    pub fn into_output(self, module: &str) -> OutputError {
        let module = module.to_string();
        match self {
            Self::Rejected { request, reply } => OutputError::Rejected {
                module,
                request: request.to_string(),
                code: reply.code,
                text: reply.text,
            },
            Self::Timeout { request, .. } => OutputError::Timeout {
                module,
                request: request.to_string(),
            },
            Self::Spawn(e) => OutputError::Load {
                module,
                reason: e.to_string(),
            },
            Self::Init(reason) => OutputError::Load { module, reason },
            other @ (Self::Io(_) | Self::Closed | Self::Protocol(_)) => OutputError::Crashed {
                module,
                reason: other.to_string(),
            },
        }
    }
}
