//! The five-tier queue set.

use std::collections::VecDeque;

use tracing::debug;

use super::resolution::{
    ActiveSummary, Resolution, dropped_priorities, stops_active, stops_active_after_collapse,
};
use crate::domain::{ClientId, GroupId, Message, Priority};

/// Five FIFO queues, one per priority.
///
/// All mutation happens through `&mut self`; the dispatcher keeps the set
/// inside `CoreState` behind its single lock, so every method here is one
/// critical section.
#[derive(Debug, Default)]
pub struct PriorityQueueSet {
    queues: [VecDeque<Message>; 5],
}

impl PriorityQueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, priority: Priority) -> &VecDeque<Message> {
        &self.queues[priority.index()]
    }

    fn queue_mut(&mut self, priority: Priority) -> &mut VecDeque<Message> {
        &mut self.queues[priority.index()]
    }

    /// Total number of queued messages.
    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    pub fn len_of(&self, priority: Priority) -> usize {
        self.queue(priority).len()
    }

    /// Queued messages of one priority, oldest first.
    pub fn iter(&self, priority: Priority) -> impl Iterator<Item = &Message> {
        self.queue(priority).iter()
    }

    /// Append `msg` to its priority's queue and apply that priority's
    /// resolution rule against the queues and the active utterance.
    pub fn enqueue(&mut self, msg: Message, active: Option<ActiveSummary>) -> Resolution {
        let priority = msg.priority;
        let group = msg.group;
        let mut resolution = Resolution::new(msg.id);
        self.queue_mut(priority).push_back(msg);

        resolution.stop_active = stops_active(priority, active);
        for &victim in dropped_priorities(priority) {
            resolution.dropped.extend(self.queue_mut(victim).drain(..));
        }

        match priority {
            Priority::Text | Priority::Notification => {
                let (surviving, dropped) = self.collapse_to_first_group(priority);
                resolution.dropped.extend(dropped);
                if let Some(surviving) = surviving {
                    resolution.stop_active |=
                        stops_active_after_collapse(priority, surviving, active);
                }
            }
            Priority::Progress => {
                resolution.dropped.extend(self.supersede(priority, group));
            }
            Priority::Important | Priority::Message => {}
        }

        if resolution.stop_active || !resolution.dropped.is_empty() {
            debug!(
                %priority,
                stop_active = resolution.stop_active,
                dropped = resolution.dropped.len(),
                "Resolved priorities"
            );
        }
        resolution
    }

    /// Keep only the group of the oldest queued message in `priority`.
    fn collapse_to_first_group(&mut self, priority: Priority) -> (Option<GroupId>, Vec<Message>) {
        let queue = self.queue_mut(priority);
        let Some(first) = queue.front().map(|msg| msg.group) else {
            return (None, Vec::new());
        };
        let (kept, dropped): (Vec<_>, Vec<_>) =
            queue.drain(..).partition(|msg| msg.group == first);
        *queue = kept.into();
        (Some(first), dropped)
    }

    /// Drop every message of `group` except the most recently inserted one.
    fn supersede(&mut self, priority: Priority, group: GroupId) -> Vec<Message> {
        let queue = self.queue_mut(priority);
        let Some(newest) = queue.iter().rposition(|msg| msg.group == group) else {
            return Vec::new();
        };
        let mut dropped = Vec::new();
        let mut kept = VecDeque::with_capacity(queue.len());
        for (index, msg) in queue.drain(..).enumerate() {
            if msg.group == group && index != newest {
                dropped.push(msg);
            } else {
                kept.push_back(msg);
            }
        }
        *queue = kept;
        dropped
    }

    /// Remove and return the oldest message of the most urgent queue whose
    /// owner is not paused. Messages of paused owners stay where they are.
    pub fn dequeue_highest(&mut self, is_paused: impl Fn(ClientId) -> bool) -> Option<Message> {
        for priority in Priority::ALL {
            let queue = self.queue_mut(priority);
            if let Some(position) = queue.iter().position(|msg| !is_paused(msg.owner)) {
                return queue.remove(position);
            }
        }
        None
    }

    /// Remove every message matching `predicate`, in priority then FIFO order.
    pub fn take_where(&mut self, predicate: impl Fn(&Message) -> bool) -> Vec<Message> {
        let mut taken = Vec::new();
        for queue in &mut self.queues {
            let (matching, kept): (Vec<_>, Vec<_>) = queue.drain(..).partition(&predicate);
            *queue = kept.into();
            taken.extend(matching);
        }
        taken
    }

    /// Purge every queued message owned by `owner`.
    pub fn remove_all_for(&mut self, owner: ClientId) -> Vec<Message> {
        self.take_where(|msg| msg.owner == owner)
    }

    /// Purge everything.
    pub fn clear(&mut self) -> Vec<Message> {
        self.take_where(|_| true)
    }
}
