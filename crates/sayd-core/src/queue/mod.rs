//! Priority queues and the preemption rules between them.
//!
//! - `set` - five FIFO queues and the atomic enqueue-and-resolve operation
//! - `resolution` - what each arriving priority does to the others
//! - `paused` - messages parked while their owner is paused

mod paused;
mod resolution;
mod set;

pub use paused::PausedMessageList;
pub use resolution::{ActiveSummary, Resolution};
pub use set::PriorityQueueSet;
