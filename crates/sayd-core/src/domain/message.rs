//! Queued speech requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ids::{ClientId, GroupId, MessageId};
use super::priority::Priority;
use super::settings::VoiceSettings;

/// What kind of payload a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Char,
    Key,
    SoundIcon,
    /// Text to be read letter by letter.
    Spell,
}

impl MessageKind {
    /// Whether the payload goes through index marking before dispatch.
    pub const fn is_markable(self) -> bool {
        matches!(self, Self::Text)
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "char" => Ok(Self::Char),
            "key" => Ok(Self::Key),
            "sound_icon" => Ok(Self::SoundIcon),
            "spell" => Ok(Self::Spell),
            other => Err(format!("unknown message kind '{other}'")),
        }
    }
}

/// A speech request owned by the dispatcher.
///
/// The message holds its owner only by id and carries its own copy of the
/// owner's settings, so it stays valid after the owner disconnects or
/// changes settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub enqueued_at: DateTime<Utc>,
    pub owner: ClientId,
    pub text: String,
    pub bytes: usize,
    pub kind: MessageKind,
    pub priority: Priority,
    pub group: GroupId,
    /// Last dispatcher-tracked index mark reported while speaking.
    pub last_index_mark: Option<String>,
    pub paused_while_speaking: bool,
    /// Set on messages re-enqueued by a resume, so `begin` is reported as `resume`.
    pub resumed: bool,
    pub settings: VoiceSettings,
}

impl Message {
    /// Build a message from an owner's current settings snapshot.
    pub fn new(
        id: MessageId,
        owner: ClientId,
        kind: MessageKind,
        text: impl Into<String>,
        group: GroupId,
        settings: VoiceSettings,
    ) -> Self {
        let text = text.into();
        Self {
            id,
            enqueued_at: Utc::now(),
            owner,
            bytes: text.len(),
            text,
            kind,
            priority: settings.priority,
            group,
            last_index_mark: None,
            paused_while_speaking: false,
            resumed: false,
            settings,
        }
    }

    /// Replace the payload, keeping `bytes` in sync.
    pub fn set_text(&mut self, text: String) {
        self.bytes = text.len();
        self.text = text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_takes_priority_from_snapshot() {
        let settings = VoiceSettings {
            priority: Priority::Progress,
            ..VoiceSettings::default()
        };
        let msg = Message::new(
            MessageId(1),
            ClientId(2),
            MessageKind::Text,
            "hello",
            GroupId(3),
            settings,
        );
        assert_eq!(msg.priority, Priority::Progress);
        assert_eq!(msg.bytes, 5);
        assert!(!msg.paused_while_speaking);
        assert!(msg.last_index_mark.is_none());
    }

    #[test]
    fn set_text_updates_length() {
        let mut msg = Message::new(
            MessageId(1),
            ClientId(1),
            MessageKind::Text,
            "hi",
            GroupId(1),
            VoiceSettings::default(),
        );
        msg.set_text("h\u{e9}llo".to_string());
        assert_eq!(msg.bytes, 6);
    }

    #[test]
    fn only_text_is_markable() {
        assert!(MessageKind::Text.is_markable());
        assert!(!MessageKind::Spell.is_markable());
        assert!(!MessageKind::SoundIcon.is_markable());
    }
}
