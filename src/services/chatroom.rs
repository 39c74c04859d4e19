//! Chatroom event wiring.
//!
//! [`ChatroomEvents`] owns one broker and registers the history projector
//! and the subscription registry on it. Request handlers publish through
//! it, the streaming transport subscribes through it, and backlog requests
//! read history through it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::bus::{EventBroker, Publisher};
use crate::config::Config;
use crate::event::{Event, EventKind, UserDetails, UserId};
use crate::handlers::projectors::{EventStream, HistoryProjector, SubscriptionRegistry};
use crate::services::typing::TypingDebouncer;
use crate::storage::{init_history_store, HistoryStore};

/// The event core of one chatroom.
///
/// Construction spawns the handler workers and must happen inside a Tokio
/// runtime.
pub struct ChatroomEvents {
    broker: Arc<EventBroker>,
    history: Arc<dyn HistoryStore>,
    subscriptions: Arc<SubscriptionRegistry>,
    typing: TypingDebouncer,
}

impl ChatroomEvents {
    pub fn new(config: &Config) -> Self {
        let broker = Arc::new(EventBroker::new());

        let history = init_history_store(&config.history);
        broker.handle(Arc::new(HistoryProjector::new(Arc::clone(&history))));

        let subscriptions = Arc::new(SubscriptionRegistry::from_config(&config.subscriptions));
        broker.handle(subscriptions.clone());

        let typing = TypingDebouncer::from_config(&config.typing);

        info!(
            history_capacity = history.capacity(),
            channel_capacity = subscriptions.channel_capacity(),
            typing_timeout = ?typing.timeout(),
            "Chatroom events initialized"
        );

        Self {
            broker,
            history,
            subscriptions,
            typing,
        }
    }

    /// Publisher handle for request handlers.
    pub fn publisher(&self) -> Arc<dyn Publisher> {
        self.broker.clone()
    }

    pub fn publish(&self, kind: EventKind) -> Arc<Event> {
        self.broker.publish(kind)
    }

    pub fn history(&self) -> Arc<dyn HistoryStore> {
        Arc::clone(&self.history)
    }

    pub fn subscriptions(&self) -> Arc<SubscriptionRegistry> {
        Arc::clone(&self.subscriptions)
    }

    /// Open the live event stream for a connected user.
    pub async fn stream(&self, user_id: UserId) -> EventStream {
        self.subscriptions.subscribe(user_id).await
    }

    /// Backlog for a client catching up.
    ///
    /// Without `until` the whole retained window is eligible. A `limit` of 0
    /// returns everything eligible.
    pub async fn previous_events(&self, until: Option<DateTime<Utc>>, limit: usize) -> Vec<Event> {
        self.history
            .list_events(until.unwrap_or(DateTime::<Utc>::MIN_UTC), limit)
            .await
    }

    /// Report a typing indication, publishing debounced `UserTyping` events.
    pub fn indicate_typing(
        &self,
        user_id: UserId,
        details: UserDetails,
        receiver_id: Option<UserId>,
        typing: bool,
    ) {
        self.typing
            .publish_typing(self.publisher(), user_id, details, receiver_id, typing);
    }

    /// Wait until history and subscribers have seen every event published
    /// so far.
    pub async fn flush(&self) {
        self.broker.flush().await;
    }
}
