//! Projector implementations.
//!
//! Projectors consume broker events and maintain a view of them:
//! - `history`: the bounded backlog of broadcast events
//! - `stream`: live per-user subscriber channels

pub mod history;
pub mod stream;

pub use history::HistoryProjector;
pub use stream::{EventStream, SubscriptionRegistry};
