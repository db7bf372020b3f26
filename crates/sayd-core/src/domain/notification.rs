//! Lifecycle notifications delivered to clients.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ids::{ClientId, MessageId};

bitflags! {
    /// Which lifecycle events a client asked to receive.
    ///
    /// An empty mask (the default) means the client gets no asynchronous
    /// events at all; replies to its commands are unaffected.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[repr(transparent)]
    pub struct NotificationMask: u8 {
        const BEGIN       = 0b0000_0001;
        const END         = 0b0000_0010;
        const CANCEL      = 0b0000_0100;
        const PAUSE       = 0b0000_1000;
        const RESUME      = 0b0001_0000;
        const INDEX_MARKS = 0b0010_0000;
    }
}

impl Default for NotificationMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromStr for NotificationMask {
    type Err = String;

    /// Parse the protocol's notification type keyword.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::all()),
            "begin" => Ok(Self::BEGIN),
            "end" => Ok(Self::END),
            "cancel" => Ok(Self::CANCEL),
            "pause" => Ok(Self::PAUSE),
            "resume" => Ok(Self::RESUME),
            "index_marks" => Ok(Self::INDEX_MARKS),
            other => Err(format!("unknown notification type '{other}'")),
        }
    }
}

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Begin,
    End,
    /// Stopped or discarded before finishing.
    Cancel,
    Pause,
    Resume,
    IndexMark,
}

impl NotificationKind {
    /// The mask bit a client must have set to receive this kind.
    pub const fn mask(self) -> NotificationMask {
        match self {
            Self::Begin => NotificationMask::BEGIN,
            Self::End => NotificationMask::END,
            Self::Cancel => NotificationMask::CANCEL,
            Self::Pause => NotificationMask::PAUSE,
            Self::Resume => NotificationMask::RESUME,
            Self::IndexMark => NotificationMask::INDEX_MARKS,
        }
    }
}

/// One event for one client about one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: MessageId,
    pub client: ClientId,
    /// Mark name, only for `IndexMark`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
}

impl Notification {
    pub const fn new(kind: NotificationKind, message: MessageId, client: ClientId) -> Self {
        Self {
            kind,
            message,
            client,
            mark: None,
        }
    }

    pub const fn index_mark(message: MessageId, client: ClientId, mark: String) -> Self {
        Self {
            kind: NotificationKind::IndexMark,
            message,
            client,
            mark: Some(mark),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_a_distinct_bit() {
        let kinds = [
            NotificationKind::Begin,
            NotificationKind::End,
            NotificationKind::Cancel,
            NotificationKind::Pause,
            NotificationKind::Resume,
            NotificationKind::IndexMark,
        ];
        let combined = kinds
            .iter()
            .fold(NotificationMask::empty(), |acc, kind| acc | kind.mask());
        assert_eq!(combined, NotificationMask::all());
    }

    #[test]
    fn parses_protocol_keywords() {
        assert_eq!("ALL".parse::<NotificationMask>(), Ok(NotificationMask::all()));
        assert_eq!(
            "index_marks".parse::<NotificationMask>(),
            Ok(NotificationMask::INDEX_MARKS)
        );
        assert!("finish".parse::<NotificationMask>().is_err());
    }

    #[test]
    fn notification_serialization_omits_missing_mark() {
        let n = Notification::new(NotificationKind::End, MessageId(3), ClientId(1));
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"kind\":\"end\""));
        assert!(!json.contains("mark"));
    }
}
