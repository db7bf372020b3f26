//! The client line protocol.
//!
//! Every request is one line: a verb followed by space separated
//! arguments, verbs and keywords matched case-insensitively. `SPEAK` is the
//! only multi-line request: its payload follows as data lines up to a line
//! holding a single `.`.
//!
//! Replies mirror the worker protocol: `DDD-text` continuation lines and a
//! terminal `DDD text` line, CRLF terminated. `2xx` is success, `3xx` a
//! malformed request, `4xx` a failure inside the daemon and `7xx` an
//! asynchronous event.

use sayd_core::{
    CapLetRecogn, ClientId, ClientSession, CoreError, Notification, NotificationKind,
    NotificationMask, Priority, PunctuationMode, Target, VoiceSettings, VoiceType,
};
use thiserror::Error;

/// Malformed client input. Rejected before anything reaches the queues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("missing {0}")]
    MissingArgument(&'static str),

    #[error("invalid {what} '{value}'")]
    InvalidArgument { what: &'static str, value: String },

    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: i64 },

    #[error("{0} is not allowed for this target")]
    NotAllowed(&'static str),
}

impl CommandError {
    pub const fn code(&self) -> u16 {
        match self {
            Self::Unknown(_) => 300,
            Self::MissingArgument(_) => 301,
            Self::InvalidArgument { .. } => 302,
            Self::OutOfRange { .. } => 303,
            Self::NotAllowed(_) => 304,
        }
    }

    /// Full reply line for this error.
    pub fn reply(&self) -> String {
        let text = match self {
            Self::Unknown(_) => "ERR UNKNOWN COMMAND",
            Self::MissingArgument(_) => "ERR MISSING ARGUMENT",
            Self::InvalidArgument { .. } => "ERR INVALID ARGUMENT",
            Self::OutOfRange { .. } => "ERR VALUE OUT OF RANGE",
            Self::NotAllowed(_) => "ERR NOT ALLOWED",
        };
        reply(self.code(), text)
    }
}

/// One per-session setting from `SET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    Priority(Priority),
    Rate(i32),
    Pitch(i32),
    Volume(i32),
    Punctuation(PunctuationMode),
    Spelling(bool),
    CapLetRecogn(CapLetRecogn),
    VoiceType(VoiceType),
    SynthesisVoice(String),
    Language(String),
    OutputModule(String),
    Notification(NotificationMask, bool),
    PauseContext(u32),
    SsmlMode(bool),
    ClientName(String),
}

impl Setting {
    /// Store the setting in `session`. Messages already queued keep the
    /// settings they were queued with.
    pub fn apply(&self, session: &mut ClientSession) {
        let settings = &mut session.settings;
        match self {
            Self::Priority(p) => settings.priority = *p,
            Self::Rate(v) => settings.rate = VoiceSettings::clamp_level(*v),
            Self::Pitch(v) => settings.pitch = VoiceSettings::clamp_level(*v),
            Self::Volume(v) => settings.volume = VoiceSettings::clamp_level(*v),
            Self::Punctuation(mode) => settings.punctuation = *mode,
            Self::Spelling(on) => settings.spelling = *on,
            Self::CapLetRecogn(mode) => settings.cap_let_recogn = *mode,
            Self::VoiceType(voice) => settings.voice_type = *voice,
            Self::SynthesisVoice(name) => settings.synthesis_voice = Some(name.clone()),
            Self::Language(lang) => settings.language.clone_from(lang),
            Self::OutputModule(name) => settings.output_module = Some(name.clone()),
            Self::Notification(mask, on) => settings.notification.set(*mask, *on),
            Self::PauseContext(n) => settings.pause_context = *n,
            Self::SsmlMode(on) => settings.ssml_mode = *on,
            Self::ClientName(name) => session.client_name.clone_from(name),
        }
    }
}

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the connection to data mode for a text message.
    Speak,
    Char(String),
    Key(String),
    SoundIcon(String),
    Stop(Target),
    Cancel(Target),
    Pause(Target),
    Resume(Target),
    Set(Target, Setting),
    /// `SET all DEBUG on|off`
    SetDebug(bool),
    ListModules,
    ListVoices,
    /// `HISTORY GET CLIENT_ID`
    GetClientId,
    BlockBegin,
    BlockEnd,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (verb, rest) = split_word(line);
        match verb.to_ascii_uppercase().as_str() {
            "SPEAK" => Ok(Self::Speak),
            "CHAR" => required(rest, "character").map(Self::Char),
            "KEY" => required(rest, "key name").map(Self::Key),
            "SOUND_ICON" => required(rest, "sound icon name").map(Self::SoundIcon),
            "STOP" => parse_target(rest).map(Self::Stop),
            "CANCEL" => parse_target(rest).map(Self::Cancel),
            "PAUSE" => parse_target(rest).map(Self::Pause),
            "RESUME" => parse_target(rest).map(Self::Resume),
            "SET" => parse_set(rest),
            "LIST" => match keyword(rest, "list type")?.as_str() {
                "OUTPUT_MODULES" => Ok(Self::ListModules),
                "SYNTHESIS_VOICES" => Ok(Self::ListVoices),
                _ => Err(invalid("list type", rest)),
            },
            "HISTORY" => {
                if rest.to_ascii_uppercase().split_whitespace().eq(["GET", "CLIENT_ID"]) {
                    Ok(Self::GetClientId)
                } else {
                    Err(invalid("history request", rest))
                }
            }
            "BLOCK" => match keyword(rest, "block action")?.as_str() {
                "BEGIN" => Ok(Self::BlockBegin),
                "END" => Ok(Self::BlockEnd),
                _ => Err(invalid("block action", rest)),
            },
            "QUIT" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    s.split_once(char::is_whitespace)
        .map_or((s, ""), |(word, rest)| (word, rest.trim_start()))
}

fn invalid(what: &'static str, value: &str) -> CommandError {
    CommandError::InvalidArgument {
        what,
        value: value.trim().to_string(),
    }
}

fn required(rest: &str, what: &'static str) -> Result<String, CommandError> {
    let value = rest.trim();
    if value.is_empty() {
        return Err(CommandError::MissingArgument(what));
    }
    Ok(value.to_string())
}

fn keyword(rest: &str, what: &'static str) -> Result<String, CommandError> {
    required(rest, what).map(|k| k.to_ascii_uppercase())
}

fn parse_target(rest: &str) -> Result<Target, CommandError> {
    let (word, extra) = split_word(rest);
    if !extra.is_empty() {
        return Err(invalid("target", rest));
    }
    target_from(word)
}

fn target_from(word: &str) -> Result<Target, CommandError> {
    match word.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::MissingArgument("target")),
        "self" => Ok(Target::Caller),
        "all" => Ok(Target::All),
        other => other
            .parse()
            .map(|uid| Target::Client(ClientId(uid)))
            .map_err(|_| invalid("target", word)),
    }
}

fn parse_set(rest: &str) -> Result<Command, CommandError> {
    let (target, rest) = split_word(rest);
    let target = target_from(target)?;
    let (param, value) = split_word(rest);
    if param.is_empty() {
        return Err(CommandError::MissingArgument("parameter"));
    }
    let param = param.to_ascii_uppercase();
    let value = value.trim();
    if value.is_empty() {
        return Err(CommandError::MissingArgument("value"));
    }

    let setting = match param.as_str() {
        "DEBUG" => {
            if target != Target::All {
                return Err(CommandError::NotAllowed("DEBUG"));
            }
            return parse_switch(value).map(Command::SetDebug);
        }
        "CLIENT_NAME" => {
            if target != Target::Caller {
                return Err(CommandError::NotAllowed("CLIENT_NAME"));
            }
            Setting::ClientName(value.to_string())
        }
        "PRIORITY" => Setting::Priority(parse_keyword(value, "priority")?),
        "RATE" => Setting::Rate(parse_level(value, "rate")?),
        "PITCH" => Setting::Pitch(parse_level(value, "pitch")?),
        "VOLUME" => Setting::Volume(parse_level(value, "volume")?),
        "PUNCTUATION" => Setting::Punctuation(parse_keyword(value, "punctuation mode")?),
        "SPELLING" => Setting::Spelling(parse_switch(value)?),
        "CAP_LET_RECOGN" => Setting::CapLetRecogn(parse_keyword(value, "capital letter mode")?),
        "VOICE_TYPE" => Setting::VoiceType(parse_keyword(value, "voice type")?),
        "SYNTHESIS_VOICE" => Setting::SynthesisVoice(value.to_string()),
        "LANGUAGE" => Setting::Language(value.to_string()),
        "OUTPUT_MODULE" => Setting::OutputModule(value.to_string()),
        "NOTIFICATION" => {
            let (kind, switch) = split_word(value);
            let mask = parse_keyword(kind, "notification type")?;
            Setting::Notification(mask, parse_switch(switch)?)
        }
        "PAUSE_CONTEXT" => Setting::PauseContext(
            value
                .parse()
                .map_err(|_| invalid("pause context", value))?,
        ),
        "SSML_MODE" => Setting::SsmlMode(parse_switch(value)?),
        _ => return Err(invalid("parameter", &param)),
    };
    Ok(Command::Set(target, setting))
}

fn parse_keyword<T: std::str::FromStr>(value: &str, what: &'static str) -> Result<T, CommandError> {
    value.trim().parse().map_err(|_| invalid(what, value))
}

fn parse_switch(value: &str) -> Result<bool, CommandError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        "" => Err(CommandError::MissingArgument("on|off")),
        _ => Err(invalid("switch", value)),
    }
}

fn parse_level(value: &str, what: &'static str) -> Result<i32, CommandError> {
    let n: i64 = value.trim().parse().map_err(|_| invalid(what, value))?;
    if !(-100..=100).contains(&n) {
        return Err(CommandError::OutOfRange { what, value: n });
    }
    i32::try_from(n).map_err(|_| CommandError::OutOfRange { what, value: n })
}

// ── Replies ───────────────────────────────────────────────────────────────

/// A single-line reply.
pub fn reply(code: u16, text: &str) -> String {
    format!("{code} {text}\r\n")
}

/// A reply with continuation lines.
pub fn reply_lines<I, S>(code: u16, lines: I, text: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for line in lines {
        out.push_str(&format!("{code}-{}\r\n", line.as_ref()));
    }
    out.push_str(&reply(code, text));
    out
}

/// Reply for a request the daemon could not carry out.
pub fn error_reply(err: &CoreError) -> String {
    match err {
        CoreError::InvalidMessage(reason) => {
            reply(410, &format!("ERR {}", reason.to_ascii_uppercase()))
        }
        CoreError::InvalidSetting(_) => reply(411, "ERR INVALID SETTING"),
        CoreError::UnknownClient(_) => reply(412, "ERR NO SUCH CLIENT"),
        CoreError::Output(_) => reply(420, "ERR OUTPUT MODULE FAILED"),
        CoreError::Config(_) | CoreError::Internal(_) => reply(400, "ERR INTERNAL"),
    }
}

/// The 7xx event for a notification.
pub fn format_event(n: &Notification) -> String {
    let (code, text) = match n.kind {
        NotificationKind::IndexMark => (700, "INDEX MARK"),
        NotificationKind::Begin => (701, "BEGIN"),
        NotificationKind::End => (702, "END"),
        NotificationKind::Cancel => (703, "CANCELED"),
        NotificationKind::Pause => (704, "PAUSED"),
        NotificationKind::Resume => (705, "RESUMED"),
    };
    let mut lines = vec![n.message.to_string(), n.client.to_string()];
    lines.extend(n.mark.clone());
    reply_lines(code, lines, text)
}
