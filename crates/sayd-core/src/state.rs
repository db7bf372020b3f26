//! `CoreState`: every piece of mutable dispatcher state behind one lock.
//!
//! The server wraps a `CoreState` in a single mutex. Each method here is one
//! critical section; none of them awaits. Work that needs an output module
//! is returned as a [`Dispatch`] and performed by the coordinator after the
//! lock is released.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{
    ClientId, IdGenerator, Message, MessageId, MessageKind, Notification, NotificationKind,
    VoiceSettings,
};
use crate::error::CoreError;
use crate::marks;
use crate::ports::{SpeechRequest, WorkerEvent};
use crate::queue::{PausedMessageList, PriorityQueueSet, Resolution};
use crate::session::{ClientSession, SessionTable, Target};
use crate::speaking::{ActiveUtterance, SpeakingPhase, SpeakingState};

/// Whose speech a pause or resume applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseTarget {
    Client(ClientId),
    All,
}

/// Pause/resume requests, applied by the coordinator on its next wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Pause(PauseTarget),
    Resume(PauseTarget),
}

/// One action the coordinator must perform against the output modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A message was selected; `SpeakingState` already records it.
    Speak {
        module: String,
        request: SpeechRequest,
    },
    /// Cancel the active utterance.
    Stop { module: String },
    /// Pause the active utterance.
    Pause { module: String },
}

/// All mutable dispatcher state.
#[derive(Debug)]
pub struct CoreState {
    pub queues: PriorityQueueSet,
    pub paused: PausedMessageList,
    pub sessions: SessionTable,
    pub speaking: SpeakingState,
    ids: IdGenerator,
    controls: VecDeque<ControlRequest>,
    defaults: VoiceSettings,
}

impl CoreState {
    /// Create an empty state; new sessions start from `defaults`.
    pub fn new(defaults: VoiceSettings) -> Self {
        Self {
            queues: PriorityQueueSet::new(),
            paused: PausedMessageList::new(),
            sessions: SessionTable::new(),
            speaking: SpeakingState::new(),
            ids: IdGenerator::new(),
            controls: VecDeque::new(),
            defaults,
        }
    }

    // ── Sessions ──────────────────────────────────────────────────────────

    /// Register a new client whose notifications go to `events`.
    pub fn connect(&mut self, events: mpsc::UnboundedSender<Notification>) -> ClientId {
        let uid = self.ids.client();
        let progress_group = self.ids.group();
        self.sessions.insert(ClientSession::new(
            uid,
            self.defaults.clone(),
            progress_group,
            events,
        ));
        info!(client = %uid, "Client connected");
        uid
    }

    /// Forget a client and purge everything it still had queued.
    ///
    /// A message of this client that is being spoken keeps playing; its
    /// events are dropped since nobody is left to receive them.
    pub fn disconnect(&mut self, uid: ClientId) {
        let mut purged = self.queues.remove_all_for(uid);
        purged.extend(self.paused.remove_all_for(uid));
        self.sessions.remove(uid);
        info!(client = %uid, purged = purged.len(), "Client disconnected");
    }

    pub fn session(&self, uid: ClientId) -> Result<&ClientSession, CoreError> {
        self.sessions.get(uid).ok_or(CoreError::UnknownClient(uid))
    }

    pub fn session_mut(&mut self, uid: ClientId) -> Result<&mut ClientSession, CoreError> {
        self.sessions
            .get_mut(uid)
            .ok_or(CoreError::UnknownClient(uid))
    }

    /// Apply `update` to every session `target` names.
    ///
    /// Returns how many sessions were updated; the first error aborts.
    pub fn update_sessions(
        &mut self,
        target: Target,
        caller: ClientId,
        update: impl Fn(&mut ClientSession) -> Result<(), CoreError>,
    ) -> Result<usize, CoreError> {
        let uids = self.sessions.resolve(target, caller);
        if uids.is_empty() {
            if let Target::Client(uid) = target {
                return Err(CoreError::UnknownClient(uid));
            }
        }
        for uid in &uids {
            if let Some(session) = self.sessions.get_mut(*uid) {
                update(session)?;
            }
        }
        Ok(uids.len())
    }

    /// Start a block: following messages of `uid` share one group.
    pub fn block_begin(&mut self, uid: ClientId) -> Result<(), CoreError> {
        let group = self.ids.group();
        let session = self.session_mut(uid)?;
        if session.block_group.is_some() {
            return Err(CoreError::InvalidMessage("already inside a block".into()));
        }
        session.block_group = Some(group);
        Ok(())
    }

    pub fn block_end(&mut self, uid: ClientId) -> Result<(), CoreError> {
        let session = self.session_mut(uid)?;
        if session.block_group.take().is_none() {
            return Err(CoreError::InvalidMessage("not inside a block".into()));
        }
        Ok(())
    }

    // ── Queueing ──────────────────────────────────────────────────────────

    /// Queue a message from `uid` using a snapshot of its current settings.
    ///
    /// Appending and resolving happen together; the returned id is valid
    /// even if the resolution immediately discarded the message (the owner
    /// then gets a cancel notification).
    pub fn enqueue(
        &mut self,
        uid: ClientId,
        kind: MessageKind,
        text: &str,
    ) -> Result<MessageId, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::InvalidMessage("empty message".into()));
        }
        let id = self.ids.message();
        let session = self
            .sessions
            .get_mut(uid)
            .ok_or(CoreError::UnknownClient(uid))?;
        let kind = if kind == MessageKind::Text && session.settings.spelling {
            MessageKind::Spell
        } else {
            kind
        };
        let settings = session.settings.clone();
        let group = session.group_for(settings.priority, &mut self.ids);
        session.queued_count += 1;

        let msg = Message::new(id, uid, kind, text, group, settings);
        debug!(client = %uid, message = %id, priority = %msg.priority, group = %group, "Enqueue");
        let resolution = self.queues.enqueue(msg, self.speaking.summary());
        self.apply_resolution(resolution);
        Ok(id)
    }

    fn apply_resolution(&mut self, resolution: Resolution) {
        if resolution.stop_active {
            if let Some(active) = self.speaking.active_mut() {
                debug!(message = %active.id(), "Preempting active utterance");
                active.stop_requested = true;
            }
        }
        for dropped in resolution.dropped {
            self.notify(NotificationKind::Cancel, &dropped);
        }
    }

    fn notify(&self, kind: NotificationKind, msg: &Message) {
        self.sessions.notify(Notification::new(kind, msg.id, msg.owner));
    }

    // ── Client actions ────────────────────────────────────────────────────

    /// Stop the active utterance if it belongs to `target`.
    ///
    /// Returns whether a stop was requested.
    pub fn stop(&mut self, target: Target, caller: ClientId) -> bool {
        let uids = self.sessions.resolve(target, caller);
        let Some(active) = self.speaking.active_mut() else {
            return false;
        };
        if target == Target::All || uids.contains(&active.owner()) {
            active.stop_requested = true;
            return true;
        }
        false
    }

    /// Stop like [`stop`](Self::stop), and also purge queued and paused
    /// messages of `target`.
    pub fn cancel(&mut self, target: Target, caller: ClientId) -> usize {
        self.stop(target, caller);
        let purged = if target == Target::All {
            let mut purged = self.queues.clear();
            purged.extend(self.paused.clear());
            purged
        } else {
            let mut purged = Vec::new();
            for uid in self.sessions.resolve(target, caller) {
                purged.extend(self.queues.remove_all_for(uid));
                purged.extend(self.paused.remove_all_for(uid));
            }
            purged
        };
        for msg in &purged {
            self.notify(NotificationKind::Cancel, msg);
        }
        purged.len()
    }

    /// Record a pause/resume request for the coordinator.
    pub fn request_control(&mut self, request: ControlRequest) {
        self.controls.push_back(request);
    }

    fn pause_targets(&self, target: PauseTarget) -> Vec<ClientId> {
        match target {
            PauseTarget::Client(uid) => self.sessions.resolve(Target::Client(uid), uid),
            PauseTarget::All => self.sessions.resolve(Target::All, ClientId(0)),
        }
    }

    fn apply_controls(&mut self) {
        while let Some(request) = self.controls.pop_front() {
            match request {
                ControlRequest::Pause(target) => {
                    for uid in self.pause_targets(target) {
                        self.pause_client(uid);
                    }
                }
                ControlRequest::Resume(target) => {
                    for uid in self.pause_targets(target) {
                        self.resume_client(uid);
                    }
                }
            }
        }
    }

    fn pause_client(&mut self, uid: ClientId) {
        if let Some(session) = self.sessions.get_mut(uid) {
            session.paused = true;
        }
        if let Some(active) = self.speaking.active_mut() {
            if active.owner() == uid && !active.stop_requested {
                active.pause_requested = true;
            }
        }
        debug!(client = %uid, "Client paused");
    }

    fn resume_client(&mut self, uid: ClientId) {
        if let Some(session) = self.sessions.get_mut(uid) {
            session.paused = false;
        }
        if let Some(active) = self.speaking.active_mut() {
            if active.owner() == uid && !active.pause_sent {
                active.pause_requested = false;
            }
        }
        let parked = self.paused.take_for(uid);
        debug!(client = %uid, parked = parked.len(), "Client resumed");
        for msg in parked {
            let msg = if msg.paused_while_speaking {
                Self::resumed_copy(msg)
            } else {
                msg
            };
            let resolution = self.queues.enqueue(msg, self.speaking.summary());
            self.apply_resolution(resolution);
        }
    }

    /// The rest of a message interrupted by a pause, rewound by the owner's
    /// pause context. Keeps id, priority and group.
    fn resumed_copy(mut msg: Message) -> Message {
        let remainder = if msg.kind.is_markable() {
            marks::resume_text(
                &msg.text,
                msg.last_index_mark.as_deref(),
                msg.settings.pause_context,
            )
        } else {
            msg.text.clone()
        };
        msg.set_text(remainder);
        msg.paused_while_speaking = false;
        msg.last_index_mark = None;
        msg.resumed = true;
        // The remainder is marked-up text now.
        if msg.kind.is_markable() {
            msg.settings.ssml_mode = true;
        }
        msg
    }

    // ── Coordinator ───────────────────────────────────────────────────────

    /// Next action for the coordinator, or `None` when there is nothing to
    /// do until the next wake.
    ///
    /// Pending pause/resume requests are applied first. While an utterance
    /// is active this only yields the pending stop or pause for it; when
    /// idle it selects the next message, records it as active and hands
    /// back the request to send. `resolve` picks the module for a message
    /// from its requested output module.
    pub fn next_dispatch(&mut self, resolve: impl Fn(Option<&str>) -> String) -> Option<Dispatch> {
        self.apply_controls();

        if let Some(active) = self.speaking.active_mut() {
            if active.stop_requested && !active.stop_sent {
                active.stop_sent = true;
                return Some(Dispatch::Stop {
                    module: active.module.clone(),
                });
            }
            if active.pause_requested && !active.pause_sent && !active.stop_sent {
                active.pause_sent = true;
                return Some(Dispatch::Pause {
                    module: active.module.clone(),
                });
            }
            return None;
        }

        let sessions = &self.sessions;
        for msg in self.queues.take_where(|msg| sessions.is_paused(msg.owner)) {
            debug!(message = %msg.id, client = %msg.owner, "Parking message of paused client");
            self.paused.push(msg);
        }

        let mut msg = self.queues.dequeue_highest(|owner| sessions.is_paused(owner))?;
        if msg.kind.is_markable() {
            let marked = marks::mark_text(&msg.text, msg.settings.ssml_mode);
            msg.set_text(marked);
        }
        let module = resolve(msg.settings.output_module.as_deref());
        let request = SpeechRequest::from_message(&msg);
        debug!(message = %msg.id, module = %module, "Dispatching");
        self.speaking.start(ActiveUtterance::new(module.clone(), msg));
        Some(Dispatch::Speak { module, request })
    }

    /// The module refused or failed a speak request for `id`.
    pub fn abandon(&mut self, id: MessageId) {
        if self.speaking.active().is_some_and(|a| a.id() == id) {
            if let Some(active) = self.speaking.finish() {
                warn!(message = %id, module = %active.module, "Abandoning message");
                self.notify(NotificationKind::Cancel, &active.message);
            }
        }
    }

    /// Clear an active utterance held by a module that is no longer usable.
    pub fn abandon_module(&mut self, module: &str) -> bool {
        if !self.speaking.is_speaking(module) {
            return false;
        }
        if let Some(active) = self.speaking.finish() {
            warn!(message = %active.id(), module, "Clearing utterance of dead module");
            self.notify(NotificationKind::End, &active.message);
        }
        true
    }

    /// React to an event reported by `module`.
    ///
    /// Returns whether the speaking state became idle, i.e. whether the
    /// coordinator should look for the next message.
    pub fn on_worker_event(&mut self, module: &str, event: WorkerEvent) -> bool {
        if !self.speaking.is_speaking(module) {
            debug!(module, ?event, "Event for no active utterance");
            return false;
        }
        match event {
            WorkerEvent::Begin => {
                if let Some(active) = self.speaking.active_mut() {
                    active.phase = SpeakingPhase::Speaking;
                }
                if let Some(active) = self.speaking.active() {
                    let kind = if active.message.resumed {
                        NotificationKind::Resume
                    } else {
                        NotificationKind::Begin
                    };
                    self.notify(kind, &active.message);
                }
                false
            }
            WorkerEvent::Resumed => {
                if let Some(active) = self.speaking.active() {
                    self.notify(NotificationKind::Resume, &active.message);
                }
                false
            }
            WorkerEvent::IndexMark(name) => {
                if marks::is_own_mark(&name) {
                    if let Some(active) = self.speaking.active_mut() {
                        active.message.last_index_mark = Some(name);
                    }
                } else if let Some(active) = self.speaking.active() {
                    self.sessions.notify(Notification::index_mark(
                        active.id(),
                        active.owner(),
                        name,
                    ));
                }
                false
            }
            WorkerEvent::End => {
                if let Some(active) = self.speaking.finish() {
                    self.notify(NotificationKind::End, &active.message);
                }
                true
            }
            WorkerEvent::Stopped => {
                if let Some(active) = self.speaking.finish() {
                    if active.pause_requested && !active.stop_requested {
                        self.park_interrupted(active);
                    } else {
                        self.notify(NotificationKind::Cancel, &active.message);
                    }
                }
                true
            }
            WorkerEvent::Paused => {
                if let Some(active) = self.speaking.finish() {
                    // A stop that raced the pause wins.
                    if active.stop_requested {
                        self.notify(NotificationKind::Cancel, &active.message);
                    } else {
                        self.park_interrupted(active);
                    }
                }
                true
            }
            WorkerEvent::Closed => {
                if let Some(active) = self.speaking.finish() {
                    warn!(module, message = %active.id(), "Module closed mid-utterance");
                    self.notify(NotificationKind::End, &active.message);
                }
                true
            }
        }
    }

    /// Park a message the module interrupted for a pause.
    ///
    /// If the owner resumed while the module was still pausing, the
    /// remainder goes straight back into the queues.
    fn park_interrupted(&mut self, active: ActiveUtterance) {
        let mut msg = active.message;
        let Some(owner_paused) = self.sessions.get(msg.owner).map(|s| s.paused) else {
            debug!(message = %msg.id, "Owner gone, dropping paused message");
            return;
        };
        msg.paused_while_speaking = true;
        self.notify(NotificationKind::Pause, &msg);
        if owner_paused {
            self.paused.push(msg);
            return;
        }
        debug!(message = %msg.id, client = %msg.owner, "Owner already resumed, requeueing remainder");
        let resolution = self
            .queues
            .enqueue(Self::resumed_copy(msg), self.speaking.summary());
        self.apply_resolution(resolution);
    }
}
