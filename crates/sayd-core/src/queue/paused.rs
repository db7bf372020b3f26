//! Messages parked while their owner is paused.

use crate::domain::{ClientId, Message};

/// Messages whose owner was paused when they were selected, or that were
/// interrupted by a pause while being spoken.
///
/// Membership is re-evaluated on every resume: a resumed owner gets all of
/// its parked messages back, in the order they were parked.
#[derive(Debug, Default)]
pub struct PausedMessageList {
    entries: Vec<Message>,
}

impl PausedMessageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.entries.push(msg);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    /// Take every parked message owned by `owner`, oldest first.
    pub fn take_for(&mut self, owner: ClientId) -> Vec<Message> {
        let (taken, kept): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|msg| msg.owner == owner);
        self.entries = kept;
        taken
    }

    /// Same as [`take_for`](Self::take_for); used when the owner goes away.
    pub fn remove_all_for(&mut self, owner: ClientId) -> Vec<Message> {
        self.take_for(owner)
    }

    pub fn clear(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupId, MessageId, MessageKind, VoiceSettings};

    fn msg(id: u64, owner: u64) -> Message {
        Message::new(
            MessageId(id),
            ClientId(owner),
            MessageKind::Text,
            "parked",
            GroupId(id),
            VoiceSettings::default(),
        )
    }

    #[test]
    fn take_for_keeps_other_owners_in_order() {
        let mut list = PausedMessageList::new();
        list.push(msg(1, 1));
        list.push(msg(2, 2));
        list.push(msg(3, 1));
        list.push(msg(4, 2));

        let taken: Vec<_> = list.take_for(ClientId(1)).iter().map(|m| m.id.0).collect();
        assert_eq!(taken, vec![1, 3]);
        let left: Vec<_> = list.iter().map(|m| m.id.0).collect();
        assert_eq!(left, vec![2, 4]);
    }

    #[test]
    fn clear_empties_the_list() {
        let mut list = PausedMessageList::new();
        list.push(msg(1, 1));
        assert_eq!(list.clear().len(), 1);
        assert!(list.is_empty());
    }
}
