//! Output module runtime for sayd.
//!
//! Everything that touches a worker process lives here:
//!
//! - `protocol` - the worker line protocol: request encoding, reply and
//!   event framing
//! - `module` - one worker: its pipes, the single-slot request/reply
//!   connection and the load/speak/stop/quit lifecycle
//! - `supervisor` - the module table, module selection with fallback,
//!   reload and shutdown; implements [`sayd_core::SpeechOutput`]
//! - `process` - child shutdown with signal escalation and lossy line
//!   reading of worker output
#![deny(unsafe_code)]

pub mod error;
pub mod module;
pub mod process;
pub mod protocol;
pub mod supervisor;

pub use error::{ModuleError, ProtocolError};
pub use module::{LoadOptions, ModuleConnection, OutputModule};
pub use supervisor::ModuleSupervisor;
