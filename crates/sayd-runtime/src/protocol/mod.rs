//! The worker line protocol.
//!
//! Requests are single verb lines, optionally followed by a body that ends
//! with a line holding only `.`. Replies are zero or more `DDD-text`
//! continuation lines and one `DDD text` terminal line. Codes 700-799 are
//! asynchronous events and are framed independently of replies.

mod reply;
mod request;

pub use reply::{Frame, Reply, ReplyAssembler, ReplyLine, parse_voice};
pub use request::{Request, encode_block, escape_payload};
