//! Core domain for the sayd speech dispatcher.
//!
//! This crate holds everything the dispatcher decides without touching a
//! process or a socket:
//!
//! - `domain` - ids, priorities, messages, settings snapshots, notifications
//! - `queue` - the five-tier priority queue set, its resolution rules and the
//!   paused message list
//! - `session` - per-client session records
//! - `speaking` - the single active-utterance record
//! - `state` - `CoreState`, the one value guarded by the dispatcher lock
//! - `marks` - index marking and resume-position handling
//! - `ports` - the output port implemented by the module runtime
//! - `config` - the resolved daemon configuration
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod error;
pub mod marks;
pub mod ports;
pub mod queue;
pub mod session;
pub mod speaking;
pub mod state;

pub use config::{ConfigError, DaemonConfig, ModuleConfig, Timeouts};
pub use domain::{
    CapLetRecogn, ClientId, GroupId, Message, MessageId, MessageKind, Notification,
    NotificationKind, NotificationMask, Priority, PunctuationMode, Voice, VoiceSettings,
    VoiceType,
};
pub use error::CoreError;
pub use ports::{
    FALLBACK_MODULE, ModuleEvent, ModuleInfo, OutputError, SpeechOutput, SpeechRequest,
    WorkerEvent,
};
pub use queue::{PausedMessageList, PriorityQueueSet, Resolution};
pub use session::{ClientSession, SessionTable, Target};
pub use speaking::{ActiveUtterance, SpeakingPhase, SpeakingState};
pub use state::{ControlRequest, CoreState, Dispatch, PauseTarget};
