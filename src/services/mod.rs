//! Services built on top of the broker.

pub mod chatroom;
pub mod typing;

pub use chatroom::ChatroomEvents;
pub use typing::{TypingDebouncer, DEFAULT_TYPING_TIMEOUT};
