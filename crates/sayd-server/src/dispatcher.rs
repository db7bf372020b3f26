//! The dispatcher: one lock over all core state, plus the wake signal.
//!
//! Connection tasks and the coordinator share one `Dispatcher`. Every
//! method that touches `CoreState` is a single short critical section on a
//! std mutex that is never held across an await; anything that talks to
//! an output module happens after the lock is released.

use std::sync::{Arc, Mutex};

use sayd_core::{
    ClientId, ControlRequest, CoreError, CoreState, Dispatch, MessageId, MessageKind, ModuleEvent,
    ModuleInfo, Notification, PauseTarget, SpeechOutput, Target, Voice,
};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info};

use crate::command::Setting;

pub struct Dispatcher {
    state: Mutex<CoreState>,
    wake: Notify,
    output: Arc<dyn SpeechOutput>,
}

impl Dispatcher {
    pub fn new(state: CoreState, output: Arc<dyn SpeechOutput>) -> Self {
        Self {
            state: Mutex::new(state),
            wake: Notify::new(),
            output,
        }
    }

    pub fn output(&self) -> &Arc<dyn SpeechOutput> {
        &self.output
    }

    /// Run `f` under the core lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut CoreState) -> R) -> Result<R, CoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CoreError::Internal("core state lock poisoned".to_string()))?;
        Ok(f(&mut state))
    }

    /// Wake the coordinator. A wake with nobody waiting is kept until the
    /// coordinator next waits.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub async fn woken(&self) {
        self.wake.notified().await;
    }

    // ── Sessions ──────────────────────────────────────────────────────────

    pub fn connect(&self, events: mpsc::UnboundedSender<Notification>) -> Result<ClientId, CoreError> {
        self.with_state(|state| state.connect(events))
    }

    pub fn disconnect(&self, uid: ClientId) -> Result<(), CoreError> {
        self.with_state(|state| state.disconnect(uid))?;
        self.wake();
        Ok(())
    }

    pub fn set(&self, target: Target, caller: ClientId, setting: &Setting) -> Result<usize, CoreError> {
        self.with_state(|state| {
            state.update_sessions(target, caller, |session| {
                setting.apply(session);
                Ok(())
            })
        })?
    }

    pub fn block_begin(&self, uid: ClientId) -> Result<(), CoreError> {
        self.with_state(|state| state.block_begin(uid))?
    }

    pub fn block_end(&self, uid: ClientId) -> Result<(), CoreError> {
        self.with_state(|state| state.block_end(uid))?
    }

    // ── Speech ────────────────────────────────────────────────────────────

    pub fn enqueue(&self, uid: ClientId, kind: MessageKind, text: &str) -> Result<MessageId, CoreError> {
        let id = self.with_state(|state| state.enqueue(uid, kind, text))??;
        self.wake();
        Ok(id)
    }

    pub fn stop(&self, target: Target, caller: ClientId) -> Result<bool, CoreError> {
        let stopped = self.with_state(|state| state.stop(target, caller))?;
        self.wake();
        Ok(stopped)
    }

    pub fn cancel(&self, target: Target, caller: ClientId) -> Result<usize, CoreError> {
        let purged = self.with_state(|state| state.cancel(target, caller))?;
        self.wake();
        Ok(purged)
    }

    pub fn pause(&self, target: Target, caller: ClientId) -> Result<(), CoreError> {
        let target = pause_target(target, caller);
        self.with_state(|state| state.request_control(ControlRequest::Pause(target)))?;
        self.wake();
        Ok(())
    }

    pub fn resume(&self, target: Target, caller: ClientId) -> Result<(), CoreError> {
        let target = pause_target(target, caller);
        self.with_state(|state| state.request_control(ControlRequest::Resume(target)))?;
        self.wake();
        Ok(())
    }

    // ── Output modules ────────────────────────────────────────────────────

    pub async fn list_modules(&self) -> Vec<ModuleInfo> {
        self.output.list_modules().await
    }

    /// Voices of the module `uid`'s next message would go to.
    pub async fn list_voices(&self, uid: ClientId) -> Result<Vec<Voice>, CoreError> {
        let requested = self.with_state(|state| {
            state
                .session(uid)
                .map(|session| session.settings.output_module.clone())
        })??;
        let module = self.output.resolve_module(requested.as_deref());
        Ok(self.output.list_voices(&module).await?)
    }

    pub async fn set_debug(&self, enabled: bool) -> Result<(), CoreError> {
        Ok(self.output.set_debug(enabled).await?)
    }

    /// Clear an utterance held by a dead module, then reload every module
    /// that is not working.
    pub async fn reload(&self) -> Result<Vec<ModuleInfo>, CoreError> {
        let dead: Vec<String> = self
            .output
            .list_modules()
            .await
            .into_iter()
            .filter(|m| !m.working)
            .map(|m| m.name)
            .collect();
        self.with_state(|state| {
            for name in &dead {
                state.abandon_module(name);
            }
        })?;
        let modules = self.output.reload().await;
        info!(
            working = modules.iter().filter(|m| m.working).count(),
            "Output modules reloaded"
        );
        self.wake();
        Ok(modules)
    }

    // ── Coordinator ───────────────────────────────────────────────────────

    pub fn next_dispatch(&self) -> Result<Option<Dispatch>, CoreError> {
        let output = &self.output;
        self.with_state(|state| state.next_dispatch(|requested| output.resolve_module(requested)))
    }

    /// Returns whether the coordinator should look for the next message.
    pub fn on_worker_event(&self, event: ModuleEvent) -> Result<bool, CoreError> {
        debug!(module = %event.module, event = ?event.event, "Module event");
        self.with_state(|state| state.on_worker_event(&event.module, event.event))
    }

    pub fn abandon(&self, id: MessageId) -> Result<(), CoreError> {
        self.with_state(|state| state.abandon(id))
    }

    pub fn abandon_module(&self, module: &str) -> Result<bool, CoreError> {
        self.with_state(|state| state.abandon_module(module))
    }
}

fn pause_target(target: Target, caller: ClientId) -> PauseTarget {
    match target {
        Target::Caller => PauseTarget::Client(caller),
        Target::Client(uid) => PauseTarget::Client(uid),
        Target::All => PauseTarget::All,
    }
}
