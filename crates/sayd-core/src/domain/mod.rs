//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (worker processes, sockets, configuration files).
//!
//! # Structure
//!
//! - `ids` - monotonic identifiers for clients, messages and groups
//! - `priority` - the five urgency tiers
//! - `message` - queued speech requests
//! - `settings` - per-client voice settings and their snapshot
//! - `notification` - lifecycle events reported back to clients
//! - `voice` - voices advertised by output modules

mod ids;
mod message;
mod notification;
mod priority;
mod settings;
mod voice;

pub use ids::{ClientId, GroupId, IdGenerator, MessageId};
pub use message::{Message, MessageKind};
pub use notification::{Notification, NotificationKind, NotificationMask};
pub use priority::Priority;
pub use settings::{CapLetRecogn, PunctuationMode, VoiceSettings, VoiceType};
pub use voice::Voice;
