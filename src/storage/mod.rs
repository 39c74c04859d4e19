//! Bounded event history.
//!
//! History keeps the most recent broadcast events so that clients joining
//! late, or reconnecting, can catch up. It is intentionally lossy: once the
//! window is full the oldest event is evicted, and mutations aimed at an
//! evicted chat are dropped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::HistoryConfig;
use crate::event::{ChatId, ChatRecord, Event};

pub mod ring;

pub use ring::RingHistoryStore;

/// Default number of events retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 32;

/// In-place amendment of a stored chat.
pub type ChatMutator = Box<dyn FnOnce(&mut ChatRecord) + Send>;

/// Read access to history, for backlog retrieval.
///
/// Both methods return owned snapshots; no caller ever holds a reference
/// into the store.
#[async_trait]
pub trait HistoryLister: Send + Sync {
    /// All retained events, oldest first.
    async fn all(&self) -> Vec<Event>;

    /// Up to `limit` of the most recent events with `time >= until`,
    /// oldest first. A `limit` of 0 returns every matching event.
    async fn list_events(&self, until: DateTime<Utc>, limit: usize) -> Vec<Event>;
}

/// Interface for history storage.
///
/// Implementations:
/// - `RingHistoryStore`: fixed-capacity in-memory ring buffer
#[async_trait]
pub trait HistoryStore: HistoryLister {
    /// Append an event, evicting the oldest one when full.
    async fn add(&self, event: Event);

    /// Apply `mutate` to the most recent stored `ChatSent` with `chat_id`.
    ///
    /// Returns false, without calling `mutate`, when no such chat is
    /// retained.
    async fn update_chat(&self, chat_id: ChatId, mutate: ChatMutator) -> bool;

    /// Number of retained events.
    async fn len(&self) -> usize;

    /// Maximum number of retained events.
    fn capacity(&self) -> usize;
}

/// Initialize the history store from configuration.
pub fn init_history_store(config: &HistoryConfig) -> Arc<dyn HistoryStore> {
    let store = RingHistoryStore::new(config.capacity);
    info!(capacity = store.capacity(), "History store initialized");
    Arc::new(store)
}
