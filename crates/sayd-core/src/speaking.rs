//! The single active utterance.
//!
//! `SpeakingState` is either idle or holds exactly one `ActiveUtterance`:
//! a module name is set if and only if one message is being spoken.

use crate::domain::{ClientId, GroupId, Message, MessageId, Priority};
use crate::queue::ActiveSummary;

/// Where the active utterance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingPhase {
    /// Handed to the module, `begin` not yet reported.
    Dispatched,
    /// The module reported `begin`.
    Speaking,
}

/// The message currently owned by an output module.
#[derive(Debug, Clone)]
pub struct ActiveUtterance {
    pub module: String,
    pub message: Message,
    pub phase: SpeakingPhase,
    /// A preemption or client request wants this utterance stopped.
    pub stop_requested: bool,
    /// `STOP` has already been written to the module.
    pub stop_sent: bool,
    /// The owner was paused while this was speaking.
    pub pause_requested: bool,
    /// `PAUSE` has already been written to the module.
    pub pause_sent: bool,
}

impl ActiveUtterance {
    pub fn new(module: impl Into<String>, message: Message) -> Self {
        Self {
            module: module.into(),
            message,
            phase: SpeakingPhase::Dispatched,
            stop_requested: false,
            stop_sent: false,
            pause_requested: false,
            pause_sent: false,
        }
    }

    pub const fn owner(&self) -> ClientId {
        self.message.owner
    }

    pub const fn id(&self) -> MessageId {
        self.message.id
    }

    pub const fn priority(&self) -> Priority {
        self.message.priority
    }

    pub const fn group(&self) -> GroupId {
        self.message.group
    }
}

#[derive(Debug, Default)]
pub struct SpeakingState {
    active: Option<ActiveUtterance>,
}

impl SpeakingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub const fn active(&self) -> Option<&ActiveUtterance> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveUtterance> {
        self.active.as_mut()
    }

    /// Name of the module currently speaking.
    pub fn module(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.module.as_str())
    }

    /// What the resolution rules need to know about the active utterance.
    pub fn summary(&self) -> Option<ActiveSummary> {
        self.active.as_ref().map(|a| ActiveSummary {
            priority: a.priority(),
            group: a.group(),
        })
    }

    /// Record a freshly dispatched message. Returns the previous utterance
    /// if one was somehow still recorded.
    pub fn start(&mut self, utterance: ActiveUtterance) -> Option<ActiveUtterance> {
        self.active.replace(utterance)
    }

    /// Clear the state, returning what was being spoken.
    pub fn finish(&mut self) -> Option<ActiveUtterance> {
        self.active.take()
    }

    /// Whether `module` holds the active utterance.
    pub fn is_speaking(&self, module: &str) -> bool {
        self.active.as_ref().is_some_and(|a| a.module == module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageKind, VoiceSettings};

    fn message() -> Message {
        Message::new(
            MessageId(4),
            ClientId(2),
            MessageKind::Text,
            "hello",
            GroupId(9),
            VoiceSettings::default(),
        )
    }

    #[test]
    fn module_is_set_iff_a_message_is_active() {
        let mut state = SpeakingState::new();
        assert!(state.is_idle());
        assert!(state.module().is_none());
        assert!(state.summary().is_none());

        state.start(ActiveUtterance::new("espeak", message()));
        assert_eq!(state.module(), Some("espeak"));
        assert_eq!(
            state.summary(),
            Some(ActiveSummary {
                priority: Priority::Text,
                group: GroupId(9)
            })
        );
        assert!(state.is_speaking("espeak"));
        assert!(!state.is_speaking("flite"));

        let done = state.finish();
        assert_eq!(done.map(|a| a.id()), Some(MessageId(4)));
        assert!(state.is_idle());
    }
}
