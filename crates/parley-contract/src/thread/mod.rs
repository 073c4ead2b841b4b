//! Persistent thread model: messages and the thread itself.

pub mod message;
pub mod model;

pub use message::{gen_message_id, Message, Role};
pub use model::Thread;
