//! Preemption rules applied when a message arrives.
//!
//! | Arriving       | Active utterance                               | Queues                          |
//! |----------------|------------------------------------------------|---------------------------------|
//! | Important      | stopped unless Important                       | Notification, Progress dropped  |
//! | Message        | stopped unless Important or Message            | Text, Notification, Progress dropped |
//! | Text           | stopped if Text-or-lower and of another group  | Text collapsed to earliest group; Notification, Progress dropped |
//! | Notification   | stopped only if Notification of another group  | Notification collapsed to earliest group |
//! | Progress       | untouched                                      | Notification dropped; older Progress of the same group superseded |

use crate::domain::{GroupId, Message, MessageId, Priority};

/// What the resolver needs to know about the utterance being spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSummary {
    pub priority: Priority,
    pub group: GroupId,
}

/// Outcome of one enqueue.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Id of the message that was enqueued.
    pub id: Option<MessageId>,
    /// The active utterance must be stopped.
    pub stop_active: bool,
    /// Queued messages discarded by the rule, oldest first.
    pub dropped: Vec<Message>,
}

impl Resolution {
    pub(crate) fn new(id: MessageId) -> Self {
        Self {
            id: Some(id),
            stop_active: false,
            dropped: Vec::new(),
        }
    }

    /// The arriving message itself was discarded by its own collapse rule.
    pub fn discarded_arrival(&self) -> bool {
        self.id
            .is_some_and(|id| self.dropped.iter().any(|msg| msg.id == id))
    }
}

/// Which queues an arriving priority empties outright.
pub(crate) const fn dropped_priorities(arriving: Priority) -> &'static [Priority] {
    match arriving {
        Priority::Important | Priority::Text => &[Priority::Notification, Priority::Progress],
        Priority::Message => &[Priority::Text, Priority::Notification, Priority::Progress],
        Priority::Notification => &[],
        Priority::Progress => &[Priority::Notification],
    }
}

/// Stop decision for the priorities that do not depend on a collapse.
pub(crate) fn stops_active(arriving: Priority, active: Option<ActiveSummary>) -> bool {
    let Some(active) = active else {
        return false;
    };
    match arriving {
        Priority::Important => active.priority != Priority::Important,
        Priority::Message => !matches!(active.priority, Priority::Important | Priority::Message),
        Priority::Text | Priority::Notification | Priority::Progress => false,
    }
}

/// Stop decision after a group collapse kept `surviving`.
pub(crate) fn stops_active_after_collapse(
    arriving: Priority,
    surviving: GroupId,
    active: Option<ActiveSummary>,
) -> bool {
    let Some(active) = active else {
        return false;
    };
    if active.group == surviving {
        return false;
    }
    match arriving {
        // Never preempt something more urgent than text.
        Priority::Text => !active.priority.outranks(Priority::Text),
        // Anything of a different priority is left alone.
        Priority::Notification => active.priority == Priority::Notification,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(priority: Priority, group: u64) -> Option<ActiveSummary> {
        Some(ActiveSummary {
            priority,
            group: GroupId(group),
        })
    }

    #[test]
    fn important_stops_everything_but_important() {
        assert!(stops_active(Priority::Important, active(Priority::Message, 1)));
        assert!(stops_active(Priority::Important, active(Priority::Progress, 1)));
        assert!(!stops_active(Priority::Important, active(Priority::Important, 1)));
        assert!(!stops_active(Priority::Important, None));
    }

    #[test]
    fn message_spares_important_and_message() {
        assert!(!stops_active(Priority::Message, active(Priority::Important, 1)));
        assert!(!stops_active(Priority::Message, active(Priority::Message, 1)));
        assert!(stops_active(Priority::Message, active(Priority::Text, 1)));
    }

    #[test]
    fn text_collapse_never_stops_more_urgent_speech() {
        let g = GroupId(2);
        assert!(stops_active_after_collapse(Priority::Text, g, active(Priority::Text, 1)));
        assert!(stops_active_after_collapse(
            Priority::Text,
            g,
            active(Priority::Notification, 1)
        ));
        assert!(!stops_active_after_collapse(
            Priority::Text,
            g,
            active(Priority::Message, 1)
        ));
        assert!(!stops_active_after_collapse(Priority::Text, g, active(Priority::Text, 2)));
    }

    #[test]
    fn notification_collapse_leaves_other_priorities_alone() {
        let g = GroupId(5);
        assert!(!stops_active_after_collapse(
            Priority::Notification,
            g,
            active(Priority::Text, 1)
        ));
        assert!(!stops_active_after_collapse(
            Priority::Notification,
            g,
            active(Priority::Progress, 1)
        ));
        assert!(stops_active_after_collapse(
            Priority::Notification,
            g,
            active(Priority::Notification, 1)
        ));
    }

    #[test]
    fn dropped_tables() {
        assert_eq!(
            dropped_priorities(Priority::Message),
            &[Priority::Text, Priority::Notification, Priority::Progress]
        );
        assert!(dropped_priorities(Priority::Notification).is_empty());
        assert_eq!(dropped_priorities(Priority::Progress), &[Priority::Notification]);
    }
}
