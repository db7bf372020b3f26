//! Output port: what the dispatcher needs from the output modules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::OutputError;
use crate::domain::{Message, MessageId, MessageKind, Voice, VoiceSettings};

/// Name of the in-process module used when no real module can speak.
pub const FALLBACK_MODULE: &str = "dummy";

/// One speech request handed to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub message: MessageId,
    pub kind: MessageKind,
    /// Payload as it should reach the module (already marked for text).
    pub text: String,
    /// Settings pushed to the module right before the payload.
    pub settings: VoiceSettings,
}

impl SpeechRequest {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            message: msg.id,
            kind: msg.kind,
            text: msg.text.clone(),
            settings: msg.settings.clone(),
        }
    }
}

/// Summary of one configured module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub working: bool,
    pub voice_count: usize,
}

/// Asynchronous event reported by a worker while an utterance is outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Begin,
    End,
    /// Canceled in flight after a `STOP`.
    Stopped,
    Paused,
    Resumed,
    IndexMark(String),
    /// The worker's reply pipe closed: the process is gone.
    Closed,
}

/// A worker event tagged with the module that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEvent {
    pub module: String,
    pub event: WorkerEvent,
}

impl ModuleEvent {
    pub fn new(module: impl Into<String>, event: WorkerEvent) -> Self {
        Self {
            module: module.into(),
            event,
        }
    }
}

/// The set of output modules, seen from the dispatcher.
///
/// Implementations must never block the caller on audio: `speak` returns as
/// soon as the module accepted the request, and progress is reported as
/// [`ModuleEvent`]s on the channel the implementation was built with.
///
/// # Design Rules
///
/// - Express intent, not protocol verbs
/// - Errors are per call and never tear the dispatcher down
/// - `resolve_module` always yields something that can speak
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Pick the module for a message: the requested one, then the default,
    /// then any working module, finally [`FALLBACK_MODULE`].
    fn resolve_module(&self, requested: Option<&str>) -> String;

    /// Push the request's settings and hand its payload to `module`.
    async fn speak(&self, module: &str, request: SpeechRequest) -> Result<(), OutputError>;

    /// Ask `module` to cancel the current utterance. Best effort.
    async fn stop(&self, module: &str) -> Result<(), OutputError>;

    /// Ask `module` to pause the current utterance. Best effort.
    async fn pause(&self, module: &str) -> Result<(), OutputError>;

    /// Every configured module plus the fallback.
    async fn list_modules(&self) -> Vec<ModuleInfo>;

    /// Cached voice list of `module`.
    async fn list_voices(&self, module: &str) -> Result<Vec<Voice>, OutputError>;

    /// Turn worker debug logging on or off for every working module.
    async fn set_debug(&self, enabled: bool) -> Result<(), OutputError>;

    /// Reap dead workers and reload every module that is not working.
    async fn reload(&self) -> Vec<ModuleInfo>;

    /// Stop and terminate every worker.
    async fn shutdown(&self);
}
