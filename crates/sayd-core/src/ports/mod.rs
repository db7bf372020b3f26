//! Port definitions (trait abstractions) for external systems.
//!
//! The dispatcher core only talks to output modules through
//! [`SpeechOutput`]; the module runtime implements it over worker processes
//! and tests implement it with recording mocks.
//!
//! # Design Rules
//!
//! - No process, pipe or socket types in any signature
//! - Intent-based methods (speak, stop, pause), not protocol verbs
//! - Worker events flow back over a channel, never through return values

pub mod speech_output;

use thiserror::Error;

pub use speech_output::{
    FALLBACK_MODULE, ModuleEvent, ModuleInfo, SpeechOutput, SpeechRequest, WorkerEvent,
};

/// Errors reported by an output port implementation.
///
/// Every variant is contained by the caller: the current message is
/// abandoned, but the dispatcher keeps running.
#[derive(Debug, Error)]
pub enum OutputError {
    /// No module by that name, or it is marked not working.
    #[error("Output module '{0}' is not available")]
    Unavailable(String),

    /// The module answered with a 3xx/4xx reply.
    #[error("Output module '{module}' rejected {request}: {code} {text}")]
    Rejected {
        module: String,
        request: String,
        code: u16,
        text: String,
    },

    /// Broken pipe, EOF or an unparseable reply.
    #[error("Output module '{module}' failed: {reason}")]
    Crashed { module: String, reason: String },

    /// No terminal reply within the configured timeout.
    #[error("Output module '{module}' timed out waiting for {request}")]
    Timeout { module: String, request: String },

    /// Spawning or handshaking a module failed.
    #[error("Failed to load output module '{module}': {reason}")]
    Load { module: String, reason: String },
}

impl OutputError {
    /// Name of the module the error is about.
    pub fn module(&self) -> &str {
        match self {
            Self::Unavailable(module)
            | Self::Rejected { module, .. }
            | Self::Crashed { module, .. }
            | Self::Timeout { module, .. }
            | Self::Load { module, .. } => module,
        }
    }

    /// Whether the module should be considered dead after this error.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Crashed { .. } | Self::Timeout { .. } | Self::Load { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_replies_do_not_kill_the_module() {
        let err = OutputError::Rejected {
            module: "espeak".into(),
            request: "SPEAK".into(),
            code: 401,
            text: "ERR NOT YET IMPLEMENTED".into(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.module(), "espeak");
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn crashes_are_fatal() {
        let err = OutputError::Crashed {
            module: "flite".into(),
            reason: "broken pipe".into(),
        };
        assert!(err.is_fatal());
    }
}
