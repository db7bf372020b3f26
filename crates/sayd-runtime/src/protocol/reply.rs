//! Reply and event framing.

use std::fmt;

use sayd_core::{Voice, WorkerEvent};

use crate::error::ProtocolError;

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    pub code: u16,
    /// `DDD-` continuation rather than the terminal `DDD ` line.
    pub more: bool,
    pub text: String,
}

impl ReplyLine {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let malformed = || ProtocolError::Malformed(line.to_string());

        let digits = line.get(..3).ok_or_else(malformed)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let code = digits.parse().map_err(|_| malformed())?;
        let rest = &line[3..];
        let (more, text) = match rest.chars().next() {
            None => (false, ""),
            Some('-') => (true, &rest[1..]),
            Some(' ') => (false, &rest[1..]),
            Some(_) => return Err(malformed()),
        };
        Ok(Self {
            code,
            more,
            text: text.to_string(),
        })
    }
}

/// A complete reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    /// Texts of the continuation lines, in order.
    pub lines: Vec<String>,
    /// Text of the terminal line.
    pub text: String,
}

impl Reply {
    /// Leading digit of the status code.
    pub const fn class(&self) -> u16 {
        self.code / 100
    }

    pub const fn is_success(&self) -> bool {
        self.class() == 2
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Output of the assembler once a terminal line arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Reply(Reply),
    Event(WorkerEvent),
}

/// Turns a stream of lines into replies and events.
///
/// Event lines (7xx) are buffered separately, so an event interleaved with
/// the continuation lines of a reply does not corrupt either.
#[derive(Debug, Default)]
pub struct ReplyAssembler {
    reply: Vec<String>,
    event: Vec<String>,
}

impl ReplyAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns a frame when it completes one.
    pub fn push(&mut self, line: &str) -> Result<Option<Frame>, ProtocolError> {
        let parsed = ReplyLine::parse(line)?;
        let is_event = (700..800).contains(&parsed.code);
        let buffer = if is_event {
            &mut self.event
        } else {
            &mut self.reply
        };
        if parsed.more {
            buffer.push(parsed.text);
            return Ok(None);
        }
        let lines = std::mem::take(buffer);
        if is_event {
            return event_from(parsed.code, lines).map(|e| Some(Frame::Event(e)));
        }
        Ok(Some(Frame::Reply(Reply {
            code: parsed.code,
            lines,
            text: parsed.text,
        })))
    }
}

fn event_from(code: u16, lines: Vec<String>) -> Result<WorkerEvent, ProtocolError> {
    match code {
        700 => lines
            .into_iter()
            .next()
            .map(WorkerEvent::IndexMark)
            .ok_or(ProtocolError::MissingMark),
        701 => Ok(WorkerEvent::Begin),
        702 => Ok(WorkerEvent::End),
        703 => Ok(WorkerEvent::Stopped),
        704 => Ok(WorkerEvent::Paused),
        705 => Ok(WorkerEvent::Resumed),
        other => Err(ProtocolError::UnknownEvent(other)),
    }
}

/// Parse one `name<TAB>language<TAB>variant` line of a `LIST_VOICES` reply.
pub fn parse_voice(line: &str) -> Option<Voice> {
    let mut fields = line.split('\t');
    let name = fields.next().filter(|n| !n.trim().is_empty())?;
    let language = fields.next().unwrap_or("none");
    let variant = fields.next().unwrap_or("none");
    Some(Voice::new(name.trim(), language.trim(), variant.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(assembler: &mut ReplyAssembler, lines: &[&str]) -> Vec<Frame> {
        lines
            .iter()
            .filter_map(|l| assembler.push(l).unwrap())
            .collect()
    }

    #[test]
    fn parses_terminal_and_continuation_lines() {
        assert_eq!(
            ReplyLine::parse("299-espeak: initialized\r\n").unwrap(),
            ReplyLine {
                code: 299,
                more: true,
                text: "espeak: initialized".into()
            }
        );
        let terminal = ReplyLine::parse("200 OK SPEAKING").unwrap();
        assert!(!terminal.more);
        assert_eq!(terminal.text, "OK SPEAKING");
        assert_eq!(ReplyLine::parse("702").unwrap().text, "");
    }

    #[test]
    fn rejects_garbage() {
        assert!(ReplyLine::parse("OK").is_err());
        assert!(ReplyLine::parse("20x OK").is_err());
        assert!(ReplyLine::parse("200:OK").is_err());
        assert!(ReplyLine::parse("").is_err());
    }

    #[test]
    fn assembles_multi_line_reply() {
        let mut a = ReplyAssembler::new();
        let frames = feed(
            &mut a,
            &["200-voice1\ten\tnone", "200-voice2\tde\tat", "200 OK VOICE LIST SENT"],
        );
        let [Frame::Reply(reply)] = frames.as_slice() else {
            panic!("expected one reply, got {frames:?}");
        };
        assert!(reply.is_success());
        assert_eq!(reply.lines.len(), 2);
        assert_eq!(
            parse_voice(&reply.lines[1]),
            Some(Voice::new("voice2", "de", "at"))
        );
    }

    #[test]
    fn frames_events_separately_from_replies() {
        let mut a = ReplyAssembler::new();
        let frames = feed(
            &mut a,
            &[
                "299-loading",
                "700-__sayd_1",
                "700 INDEX MARK",
                "299 OK LOADED SUCCESSFULLY",
                "701 BEGIN",
            ],
        );
        assert_eq!(
            frames,
            vec![
                Frame::Event(WorkerEvent::IndexMark("__sayd_1".into())),
                Frame::Reply(Reply {
                    code: 299,
                    lines: vec!["loading".into()],
                    text: "OK LOADED SUCCESSFULLY".into(),
                }),
                Frame::Event(WorkerEvent::Begin),
            ]
        );
    }

    #[test]
    fn maps_every_event_code() {
        let mut a = ReplyAssembler::new();
        let frames = feed(&mut a, &["702 END", "703 STOPPED", "704 PAUSED", "705 RESUMED"]);
        assert_eq!(
            frames,
            vec![
                Frame::Event(WorkerEvent::End),
                Frame::Event(WorkerEvent::Stopped),
                Frame::Event(WorkerEvent::Paused),
                Frame::Event(WorkerEvent::Resumed),
            ]
        );
        assert_eq!(a.push("799 WHAT"), Err(ProtocolError::UnknownEvent(799)));
        assert_eq!(a.push("700 INDEX MARK"), Err(ProtocolError::MissingMark));
    }

    #[test]
    fn voice_lines_tolerate_missing_fields() {
        assert_eq!(
            parse_voice("solo"),
            Some(Voice::new("solo", "none", "none"))
        );
        assert_eq!(parse_voice(""), None);
    }
}
