//! Monotonic identifiers.
//!
//! Ids are never reused for the lifetime of the daemon. A message keeps its
//! owner's `ClientId` after the client disconnects, so lookups through the
//! session table must tolerate "not found".

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a connected (or formerly connected) client session.
    ClientId
);
id_type!(
    /// Global message identifier, also reported to clients in replies and events.
    MessageId
);
id_type!(
    /// Identifier shared by the parts of one logical utterance.
    GroupId
);

/// Allocator for all three id spaces.
///
/// Lives inside `CoreState`, so it is only ever touched under the core lock.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next_client: u64,
    next_message: u64,
    next_group: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&mut self) -> ClientId {
        self.next_client += 1;
        ClientId(self.next_client)
    }

    pub fn message(&mut self) -> MessageId {
        self.next_message += 1;
        MessageId(self.next_message)
    }

    pub fn group(&mut self) -> GroupId {
        self.next_group += 1;
        GroupId(self.next_group)
    }
}
