//! Recording output port shared by the server tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sayd_core::{
    CoreState, MessageId, ModuleEvent, ModuleInfo, OutputError, SpeechOutput, SpeechRequest,
    Voice, VoiceSettings, WorkerEvent,
};
use sayd_server::{Dispatcher, run_coordinator};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const MODULE: &str = "mock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Speak { message: MessageId, text: String },
    Stop,
    Pause,
}

/// Records every call; emits worker events only when told to, or right
/// away (`begin` + `end`) in auto-complete mode.
pub struct RecordingOutput {
    calls: Mutex<Vec<Call>>,
    events: mpsc::UnboundedSender<ModuleEvent>,
    auto_complete: bool,
    fail_speak: bool,
}

impl RecordingOutput {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Speak { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn emit(&self, event: WorkerEvent) {
        self.events.send(ModuleEvent::new(MODULE, event)).unwrap();
    }
}

#[async_trait]
impl SpeechOutput for RecordingOutput {
    fn resolve_module(&self, _requested: Option<&str>) -> String {
        MODULE.to_string()
    }

    async fn speak(&self, module: &str, request: SpeechRequest) -> Result<(), OutputError> {
        if self.fail_speak {
            return Err(OutputError::Crashed {
                module: module.to_string(),
                reason: "broken pipe".into(),
            });
        }
        self.calls.lock().unwrap().push(Call::Speak {
            message: request.message,
            text: request.text,
        });
        if self.auto_complete {
            self.emit(WorkerEvent::Begin);
            self.emit(WorkerEvent::End);
        }
        Ok(())
    }

    async fn stop(&self, _module: &str) -> Result<(), OutputError> {
        self.calls.lock().unwrap().push(Call::Stop);
        Ok(())
    }

    async fn pause(&self, _module: &str) -> Result<(), OutputError> {
        self.calls.lock().unwrap().push(Call::Pause);
        Ok(())
    }

    async fn list_modules(&self) -> Vec<ModuleInfo> {
        vec![ModuleInfo {
            name: MODULE.to_string(),
            working: true,
            voice_count: 1,
        }]
    }

    async fn list_voices(&self, _module: &str) -> Result<Vec<Voice>, OutputError> {
        Ok(vec![Voice::new("kal", "en", "none")])
    }

    async fn set_debug(&self, _enabled: bool) -> Result<(), OutputError> {
        Ok(())
    }

    async fn reload(&self) -> Vec<ModuleInfo> {
        self.list_modules().await
    }

    async fn shutdown(&self) {}
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub output: Arc<RecordingOutput>,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn start() -> Self {
        Self::with(false, false)
    }

    pub fn auto_complete() -> Self {
        Self::with(true, false)
    }

    pub fn failing() -> Self {
        Self::with(false, true)
    }

    fn with(auto_complete: bool, fail_speak: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Arc::new(RecordingOutput {
            calls: Mutex::new(Vec::new()),
            events: tx,
            auto_complete,
            fail_speak,
        });
        let dispatcher = Arc::new(Dispatcher::new(
            CoreState::new(VoiceSettings::default()),
            Arc::clone(&output) as Arc<dyn SpeechOutput>,
        ));
        let cancel = CancellationToken::new();
        tokio::spawn(run_coordinator(Arc::clone(&dispatcher), rx, cancel.clone()));
        Self {
            dispatcher,
            output,
            cancel,
        }
    }

    /// Poll until `check` holds, failing the test after two seconds.
    pub async fn wait_for(&self, what: &str, check: impl Fn(&[Call]) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if check(&self.output.calls()) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}; calls: {:?}",
                self.output.calls()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub async fn wait_for_speaks(&self, n: usize) {
        self.wait_for("speak", |calls| {
            calls.iter().filter(|c| matches!(c, Call::Speak { .. })).count() >= n
        })
        .await;
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
