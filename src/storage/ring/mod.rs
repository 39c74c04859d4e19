//! Fixed-capacity ring buffer history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ChatMutator, HistoryLister, HistoryStore, DEFAULT_HISTORY_CAPACITY};
use crate::event::{ChatId, Event, EventKind};

/// Ring state guarded by the store's lock.
///
/// `next` is the slot the next insert writes to. While the ring is not yet
/// full it equals `events.len()`; once full it points at the oldest event.
/// Either way the oldest-first order is `events[next..]` then
/// `events[..next]`.
struct Ring {
    events: Vec<Event>,
    next: usize,
    capacity: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            next: 0,
            capacity,
        }
    }

    fn push(&mut self, event: Event) {
        if self.events.len() < self.capacity {
            self.events.push(event);
        } else {
            self.events[self.next] = event;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    fn oldest_first(&self) -> impl DoubleEndedIterator<Item = &Event> {
        let (newer, older) = self.events.split_at(self.next);
        older.iter().chain(newer.iter())
    }

    fn oldest_first_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Event> {
        let (newer, older) = self.events.split_at_mut(self.next);
        older.iter_mut().chain(newer.iter_mut())
    }
}

/// In-memory history holding the last `capacity` events.
///
/// Reads take a shared lock and return clones; `add` and `update_chat` take
/// the exclusive lock. Every operation is O(capacity) at worst.
pub struct RingHistoryStore {
    ring: RwLock<Ring>,
    capacity: usize,
}

impl RingHistoryStore {
    /// Create an empty store. A capacity of 0 selects the default.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_HISTORY_CAPACITY
        } else {
            capacity
        };

        Self {
            ring: RwLock::new(Ring::new(capacity)),
            capacity,
        }
    }
}

impl Default for RingHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[async_trait]
impl HistoryLister for RingHistoryStore {
    async fn all(&self) -> Vec<Event> {
        let ring = self.ring.read().await;
        ring.oldest_first().cloned().collect()
    }

    async fn list_events(&self, until: DateTime<Utc>, limit: usize) -> Vec<Event> {
        let ring = self.ring.read().await;
        let limit = if limit == 0 { ring.events.len() } else { limit };

        let mut events: Vec<Event> = ring
            .oldest_first()
            .rev()
            .filter(|e| e.time >= until)
            .take(limit)
            .cloned()
            .collect();
        events.reverse();
        events
    }
}

#[async_trait]
impl HistoryStore for RingHistoryStore {
    async fn add(&self, event: Event) {
        let mut ring = self.ring.write().await;
        debug!(
            event.sequence = event.sequence,
            event.kind = event.kind.name(),
            "Adding event to history"
        );
        ring.push(event);
    }

    async fn update_chat(&self, chat_id: ChatId, mutate: ChatMutator) -> bool {
        let mut ring = self.ring.write().await;

        let chat = ring
            .oldest_first_mut()
            .rev()
            .find_map(|event| match &mut event.kind {
                EventKind::ChatSent(chat) if chat.chat_id == chat_id => Some(chat),
                _ => None,
            });

        match chat {
            Some(chat) => {
                mutate(chat);
                true
            }
            None => false,
        }
    }

    async fn len(&self) -> usize {
        self.ring.read().await.events.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
