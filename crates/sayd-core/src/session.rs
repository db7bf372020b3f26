//! Per-client session records.
//!
//! Sessions are created on connect and destroyed on disconnect. Messages the
//! client queued keep only its `ClientId`, so every lookup here tolerates a
//! session that has already gone away.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{ClientId, GroupId, IdGenerator, Notification, Priority, VoiceSettings};

/// Who a STOP/CANCEL/PAUSE/RESUME/SET request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The requesting client itself.
    Caller,
    /// Every connected client.
    All,
    /// One specific client.
    Client(ClientId),
}

/// State the dispatcher keeps for one connected client.
#[derive(Debug)]
pub struct ClientSession {
    pub uid: ClientId,
    /// Free-form `user:application:component` identification.
    pub client_name: String,
    pub connected_at: DateTime<Utc>,
    pub paused: bool,
    /// Current settings; copied into each message at enqueue time.
    pub settings: VoiceSettings,
    /// Group shared by messages queued inside `BLOCK BEGIN`/`BLOCK END`.
    pub block_group: Option<GroupId>,
    /// Group shared by this client's progress messages outside a block.
    pub progress_group: GroupId,
    /// Number of messages this client has queued.
    pub queued_count: u64,
    events: mpsc::UnboundedSender<Notification>,
}

impl ClientSession {
    pub fn new(
        uid: ClientId,
        settings: VoiceSettings,
        progress_group: GroupId,
        events: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            uid,
            client_name: "unknown:unknown:unknown".to_string(),
            connected_at: Utc::now(),
            paused: false,
            settings,
            block_group: None,
            progress_group,
            queued_count: 0,
            events,
        }
    }

    /// Pick the group for the next message this client queues.
    pub fn group_for(&self, priority: Priority, ids: &mut IdGenerator) -> GroupId {
        match (self.block_group, priority) {
            (Some(block), _) => block,
            (None, Priority::Progress) => self.progress_group,
            (None, _) => ids.group(),
        }
    }

    /// Deliver `notification` if this client's mask asks for its kind.
    ///
    /// Returns whether the event was handed to the connection task.
    pub fn notify(&self, notification: Notification) -> bool {
        if !self.settings.notification.contains(notification.kind.mask()) {
            return false;
        }
        if self.events.send(notification).is_err() {
            debug!(client = %self.uid, "Connection task gone, dropping notification");
            return false;
        }
        true
    }
}

/// All connected sessions, keyed by uid.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: BTreeMap<ClientId, ClientSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: ClientSession) {
        self.sessions.insert(session.uid, session);
    }

    pub fn remove(&mut self, uid: ClientId) -> Option<ClientSession> {
        self.sessions.remove(&uid)
    }

    pub fn get(&self, uid: ClientId) -> Option<&ClientSession> {
        self.sessions.get(&uid)
    }

    pub fn get_mut(&mut self, uid: ClientId) -> Option<&mut ClientSession> {
        self.sessions.get_mut(&uid)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientSession> {
        self.sessions.values()
    }

    /// Paused flag of `uid`; a vanished client is never paused.
    pub fn is_paused(&self, uid: ClientId) -> bool {
        self.sessions.get(&uid).is_some_and(|s| s.paused)
    }

    /// Expand a target into concrete, currently connected uids.
    pub fn resolve(&self, target: Target, caller: ClientId) -> Vec<ClientId> {
        match target {
            Target::Caller => self.existing(caller),
            Target::Client(uid) => self.existing(uid),
            Target::All => self.sessions.keys().copied().collect(),
        }
    }

    fn existing(&self, uid: ClientId) -> Vec<ClientId> {
        if self.sessions.contains_key(&uid) {
            vec![uid]
        } else {
            Vec::new()
        }
    }

    /// Route a notification to its client, if still connected.
    pub fn notify(&self, notification: Notification) -> bool {
        match self.sessions.get(&notification.client) {
            Some(session) => session.notify(notification),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, NotificationKind, NotificationMask};

    fn session(
        uid: u64,
        mask: NotificationMask,
    ) -> (ClientSession, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let settings = VoiceSettings {
            notification: mask,
            ..VoiceSettings::default()
        };
        (
            ClientSession::new(ClientId(uid), settings, GroupId(1000 + uid), tx),
            rx,
        )
    }

    #[test]
    fn notify_respects_mask() {
        let (s, mut rx) = session(1, NotificationMask::END);
        assert!(!s.notify(Notification::new(
            NotificationKind::Begin,
            MessageId(1),
            ClientId(1)
        )));
        assert!(s.notify(Notification::new(
            NotificationKind::End,
            MessageId(1),
            ClientId(1)
        )));
        assert_eq!(rx.try_recv().map(|n| n.kind), Ok(NotificationKind::End));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn notify_to_missing_session_is_tolerated() {
        let table = SessionTable::new();
        assert!(!table.notify(Notification::new(
            NotificationKind::End,
            MessageId(1),
            ClientId(9)
        )));
    }

    #[test]
    fn groups_follow_block_then_progress_then_fresh() {
        let mut ids = IdGenerator::new();
        let (mut s, _rx) = session(1, NotificationMask::empty());

        let a = s.group_for(Priority::Text, &mut ids);
        let b = s.group_for(Priority::Text, &mut ids);
        assert_ne!(a, b);
        assert_eq!(s.group_for(Priority::Progress, &mut ids), GroupId(1001));

        s.block_group = Some(GroupId(77));
        assert_eq!(s.group_for(Priority::Text, &mut ids), GroupId(77));
        assert_eq!(s.group_for(Priority::Progress, &mut ids), GroupId(77));
    }

    #[test]
    fn resolve_skips_unknown_clients() {
        let mut table = SessionTable::new();
        let (a, _ra) = session(1, NotificationMask::empty());
        let (b, _rb) = session(2, NotificationMask::empty());
        table.insert(a);
        table.insert(b);

        assert_eq!(table.resolve(Target::Caller, ClientId(1)), vec![ClientId(1)]);
        assert_eq!(
            table.resolve(Target::All, ClientId(1)),
            vec![ClientId(1), ClientId(2)]
        );
        assert!(table.resolve(Target::Client(ClientId(5)), ClientId(1)).is_empty());
    }
}
