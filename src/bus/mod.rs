//! Event bus for in-process fan-out.
//!
//! This module contains:
//! - `EventHandler` trait: consumers registered with the broker
//! - `Publisher` trait: what request handlers depend on to emit events
//! - `EventBroker`: stamps events and fans them out to every handler
//! - `MockPublisher`: records published payloads for tests

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::event::{Event, EventKind};

pub mod broker;
pub mod dispatch;
pub mod mock;

pub use broker::EventBroker;
pub use dispatch::DispatchResult;
pub use mock::MockPublisher;

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors a handler may report back to the broker.
///
/// These never reach the publisher; the dispatch worker logs them.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Handler '{name}' failed: {message}")]
    HandlerFailed { name: String, message: String },
}

/// Handler for processing events from the broker.
pub trait EventHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "handler"
    }

    /// Process an event.
    ///
    /// The event is shared immutably between all handlers; a handler that
    /// needs to keep or mutate it must clone it.
    fn handle(&self, event: Arc<Event>) -> BoxFuture<'static, Result<()>>;
}

/// Entry point for producers of domain events.
///
/// Publishing is fire-and-forget: it never waits for handlers and never
/// reports their failures.
pub trait Publisher: Send + Sync {
    fn publish(&self, kind: EventKind) -> Arc<Event>;
}
