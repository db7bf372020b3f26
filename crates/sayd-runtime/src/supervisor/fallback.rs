//! The always-available fallback module.

use sayd_core::{FALLBACK_MODULE, ModuleEvent, SpeechRequest, WorkerEvent};
use tokio::sync::mpsc;
use tracing::warn;

/// In-process stand-in used when no worker can speak.
///
/// It produces no audio; it logs why and reports `begin` and `end` right
/// away so the client still receives its terminal notification.
#[derive(Debug, Clone)]
pub struct FallbackModule {
    events: mpsc::UnboundedSender<ModuleEvent>,
}

impl FallbackModule {
    pub const fn new(events: mpsc::UnboundedSender<ModuleEvent>) -> Self {
        Self { events }
    }

    pub fn speak(&self, request: &SpeechRequest) {
        warn!(
            message = %request.message,
            "No working output module; speech is unavailable until a module is reloaded"
        );
        for event in [WorkerEvent::Begin, WorkerEvent::End] {
            let _ = self.events.send(ModuleEvent::new(FALLBACK_MODULE, event));
        }
    }
}
