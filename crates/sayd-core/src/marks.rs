//! Index marking and resume positions.
//!
//! Before a text message is dispatched it is wrapped in `<speak>` and gets a
//! dispatcher-owned mark at its start and after every sentence boundary.
//! Modules report marks back as they reach them; the last one seen is where
//! a paused message resumes from.

/// Prefix of marks inserted by the dispatcher itself.
pub const MARK_PREFIX: &str = "__sayd_";

const MARK_OPEN: &str = "<mark name=\"";
const MARK_CLOSE: &str = "\"/>";
const SPEAK_OPEN: &str = "<speak>";
const SPEAK_CLOSE: &str = "</speak>";

/// Whether a reported mark name belongs to the dispatcher.
pub fn is_own_mark(name: &str) -> bool {
    name.starts_with(MARK_PREFIX)
}

/// Sequence number of a dispatcher mark, `None` for foreign marks.
pub fn mark_number(name: &str) -> Option<u32> {
    name.strip_prefix(MARK_PREFIX)?.parse().ok()
}

fn mark_tag(number: u32) -> String {
    format!("{MARK_OPEN}{MARK_PREFIX}{number}{MARK_CLOSE}")
}

/// Escape the characters that would otherwise be read as SSML markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove every dispatcher mark, leaving foreign marks in place.
pub fn strip_own_marks(text: &str) -> String {
    let needle = format!("{MARK_OPEN}{MARK_PREFIX}");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(&needle) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(MARK_CLOSE) {
            Some(end) => rest = &tail[end + MARK_CLOSE.len()..],
            None => {
                // Unterminated tag, keep it verbatim.
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn unwrap_speak(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix(SPEAK_OPEN)
        .and_then(|inner| inner.strip_suffix(SPEAK_CLOSE))
        .unwrap_or(text)
}

/// Wrap `text` for a module and insert dispatcher marks.
///
/// Plain text is escaped first; with `ssml` the payload is trusted as
/// markup. Marking an already marked text yields the same text.
pub fn mark_text(text: &str, ssml: bool) -> String {
    let stripped = strip_own_marks(text);
    let body = if ssml { stripped } else { escape(&stripped) };
    let inner = unwrap_speak(&body);

    let mut next = 0u32;
    let mut out = String::with_capacity(inner.len() + 64);
    out.push_str(SPEAK_OPEN);
    out.push_str(&mark_tag(next));
    next += 1;

    let mut in_tag = false;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '.' | '?' | '!' if !in_tag => {
                if chars.peek().is_some_and(|n| n.is_whitespace()) {
                    out.push_str(&mark_tag(next));
                    next += 1;
                }
            }
            _ => {}
        }
    }
    out.push_str(SPEAK_CLOSE);
    out
}

/// Cut a marked text so it restarts `pause_context` marks before
/// `last_mark`.
///
/// The rewind is clamped to the start of the text; an unknown position
/// returns the text unchanged. The result is again wrapped in `<speak>`.
pub fn resume_text(marked: &str, last_mark: Option<&str>, pause_context: u32) -> String {
    let reached = last_mark.and_then(mark_number).unwrap_or(0);
    let target = reached.saturating_sub(pause_context);
    let Some(position) = marked.find(&mark_tag(target)) else {
        return marked.to_string();
    };
    let remainder = &marked[position..];
    if remainder.ends_with(SPEAK_CLOSE) {
        format!("{SPEAK_OPEN}{remainder}")
    } else {
        format!("{SPEAK_OPEN}{remainder}{SPEAK_CLOSE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKED: &str = "<speak><mark name=\"__sayd_0\"/>Hello world.<mark name=\"__sayd_1\"/> How are you?<mark name=\"__sayd_2\"/> Fine.</speak>";

    #[test]
    fn marks_start_and_sentence_boundaries() {
        assert_eq!(mark_text("Hello world. How are you? Fine.", false), MARKED);
    }

    #[test]
    fn marking_is_idempotent() {
        assert_eq!(mark_text(MARKED, true), MARKED);
    }

    #[test]
    fn plain_text_is_escaped() {
        let marked = mark_text("a < b & c", false);
        assert_eq!(
            marked,
            "<speak><mark name=\"__sayd_0\"/>a &lt; b &amp; c</speak>"
        );
    }

    #[test]
    fn ssml_tags_are_not_sentence_boundaries() {
        let marked = mark_text("<speak><sub alias=\"Dr. Who\">DW</sub> is here. Yes</speak>", true);
        // The dot inside the attribute is skipped, the one in text counts.
        assert_eq!(marked.matches(MARK_PREFIX).count(), 2);
    }

    #[test]
    fn foreign_marks_survive_stripping() {
        let text = "<mark name=\"user\"/>x<mark name=\"__sayd_3\"/>y";
        assert_eq!(strip_own_marks(text), "<mark name=\"user\"/>xy");
    }

    #[test]
    fn mark_numbers() {
        assert_eq!(mark_number("__sayd_12"), Some(12));
        assert_eq!(mark_number("chapter"), None);
        assert!(is_own_mark("__sayd_0"));
        assert!(!is_own_mark("chapter"));
    }

    #[test]
    fn resume_rewinds_by_context() {
        let resumed = resume_text(MARKED, Some("__sayd_2"), 1);
        assert_eq!(
            resumed,
            "<speak><mark name=\"__sayd_1\"/> How are you?<mark name=\"__sayd_2\"/> Fine.</speak>"
        );
        assert!(!resumed.contains("Hello"));
    }

    #[test]
    fn resume_clamps_to_start() {
        assert_eq!(resume_text(MARKED, Some("__sayd_1"), 5), MARKED);
        assert_eq!(resume_text(MARKED, None, 0), MARKED);
    }

    #[test]
    fn resumed_text_can_be_marked_again() {
        let resumed = resume_text(MARKED, Some("__sayd_2"), 0);
        assert_eq!(
            mark_text(&resumed, true),
            "<speak><mark name=\"__sayd_0\"/> Fine.</speak>"
        );
    }
}
