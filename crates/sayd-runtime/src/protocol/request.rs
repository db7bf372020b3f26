//! Request encoding.

use std::path::PathBuf;

use sayd_core::MessageKind;

/// Every request the dispatcher sends to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Init,
    Set(Vec<(String, String)>),
    Audio(Vec<(String, String)>),
    LogLevel(u8),
    /// A speech payload; the kind picks the verb.
    Speak(MessageKind, String),
    Stop,
    Pause,
    ListVoices,
    /// `DEBUG ON <path>` when `Some`, `DEBUG OFF` otherwise.
    Debug(Option<PathBuf>),
    Quit,
}

impl Request {
    /// Short name for logs and errors.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Set(_) => "SET",
            Self::Audio(_) => "AUDIO",
            Self::LogLevel(_) => "LOGLEVEL",
            Self::Speak(kind, _) => match kind {
                MessageKind::Text | MessageKind::Spell => "SPEAK",
                MessageKind::Char => "CHAR",
                MessageKind::Key => "KEY",
                MessageKind::SoundIcon => "SOUND_ICON",
            },
            Self::Stop => "STOP",
            Self::Pause => "PAUSE",
            Self::ListVoices => "LIST_VOICES",
            Self::Debug(_) => "DEBUG",
            Self::Quit => "QUIT",
        }
    }

    /// The first line sent, without its newline.
    pub fn verb_line(&self) -> String {
        match self {
            Self::Debug(Some(path)) => format!("DEBUG ON {}", path.display()),
            Self::Debug(None) => "DEBUG OFF".to_string(),
            other => other.name().to_string(),
        }
    }

    /// Body sent after the worker accepted the verb line, including the
    /// terminating `.` line.
    pub fn body(&self) -> Option<String> {
        match self {
            Self::Set(pairs) | Self::Audio(pairs) => Some(encode_block(pairs)),
            Self::LogLevel(level) => Some(encode_block(&[(
                "log_level".to_string(),
                level.to_string(),
            )])),
            Self::Speak(_, text) => Some(escape_payload(text)),
            _ => None,
        }
    }

    /// `STOP` and `PAUSE` are fire-and-forget.
    pub const fn expects_reply(&self) -> bool {
        !matches!(self, Self::Stop | Self::Pause)
    }
}

/// Encode `key=value` lines followed by the terminating `.` line.
///
/// Values are kept on one line; embedded newlines become spaces.
pub fn encode_block(pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push('=');
        out.push_str(&value.replace(['\r', '\n'], " "));
        out.push('\n');
    }
    out.push_str(".\n");
    out
}

/// Encode a payload: lines starting with `.` get the dot doubled, and a
/// final `.` line terminates it.
pub fn escape_payload(text: &str) -> String {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let mut out = String::with_capacity(text.len() + 4);
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(".\n");
    out
}
