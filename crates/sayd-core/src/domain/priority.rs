//! The five urgency tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Priority class of a message.
///
/// Variants are declared from most to least urgent, so the derived `Ord`
/// sorts `Important` first. Use [`Priority::outranks`] instead of comparing
/// directly when the question is "is this more urgent".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Important,
    Message,
    #[default]
    Text,
    Notification,
    Progress,
}

impl Priority {
    /// All priorities in dequeue order (most urgent first).
    pub const ALL: [Self; 5] = [
        Self::Important,
        Self::Message,
        Self::Text,
        Self::Notification,
        Self::Progress,
    ];

    /// Position in [`Priority::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Important => 0,
            Self::Message => 1,
            Self::Text => 2,
            Self::Notification => 3,
            Self::Progress => 4,
        }
    }

    /// Whether `self` is strictly more urgent than `other`.
    pub const fn outranks(self, other: Self) -> bool {
        self.index() < other.index()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Important => "important",
            Self::Message => "message",
            Self::Text => "text",
            Self::Notification => "notification",
            Self::Progress => "progress",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "important" => Ok(Self::Important),
            "message" => Ok(Self::Message),
            "text" => Ok(Self::Text),
            "notification" => Ok(Self::Notification),
            "progress" => Ok(Self::Progress),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_order() {
        assert!(Priority::Important.outranks(Priority::Message));
        assert!(Priority::Text.outranks(Priority::Progress));
        assert!(!Priority::Notification.outranks(Priority::Notification));
        assert!(!Priority::Progress.outranks(Priority::Text));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("IMPORTANT".parse::<Priority>(), Ok(Priority::Important));
        assert_eq!("progress".parse::<Priority>(), Ok(Priority::Progress));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
