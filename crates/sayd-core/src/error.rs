//! Core error type for semantic dispatcher errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::ClientId;
use crate::ports::OutputError;

/// Canonical error type of the dispatcher core.
///
/// Adapters map this to their own surface: the client protocol turns it into
/// 4xx replies, the binary into exit codes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A message was rejected before reaching the queues.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A setting value was out of range or unknown.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// The addressed client is not connected.
    #[error("Unknown client {0}")]
    UnknownClient(ClientId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Output(#[from] OutputError),

    /// Internal error (unexpected condition, e.g. a poisoned lock).
    #[error("Internal error: {0}")]
    Internal(String),
}
