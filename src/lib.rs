//! Chatroom Events - real-time event distribution for a multi-user chat.
//!
//! Producers publish domain events to an in-memory broker, which fans them
//! out to a bounded, mutable history and to per-user live streams.
//!
//! - `event`: the closed set of domain events and the user/chat model
//! - `bus`: the broker and its handler workers
//! - `storage`: the bounded history store
//! - `handlers`: projectors maintaining history and live streams
//! - `services`: typing debouncer and the chatroom composition root

pub mod bus;
pub mod config;
pub mod event;
pub mod handlers;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

pub use bus::{EventBroker, EventHandler, Publisher};
pub use config::Config;
pub use event::{Event, EventKind};
pub use services::ChatroomEvents;
