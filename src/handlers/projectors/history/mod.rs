//! History projector.
//!
//! Maintains the broadcast backlog: membership and chat events are appended,
//! edits and reactions amend the chat they target, typing and private events
//! never reach history.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::bus::{BusError, EventHandler};
use crate::event::{ChatId, EmojiReply, Event, EventKind};
use crate::storage::{ChatMutator, HistoryStore};

/// Projects broker events into a [`HistoryStore`].
pub struct HistoryProjector {
    store: Arc<dyn HistoryStore>,
}

impl HistoryProjector {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// The store this projector writes to.
    pub fn store(&self) -> Arc<dyn HistoryStore> {
        Arc::clone(&self.store)
    }
}

/// Apply one event to the store.
async fn project(store: &dyn HistoryStore, event: &Event) {
    if let Some(receiver) = event.kind.receiver() {
        debug!(
            event.sequence = event.sequence,
            event.kind = event.kind.name(),
            receiver = %receiver,
            "Private event not kept in history"
        );
        return;
    }

    match &event.kind {
        EventKind::UserTyping(_) => {}
        EventKind::ChatEdited(edit) => {
            let time = event.time;
            let text = edit.text.clone();
            amend(
                store,
                event,
                edit.chat_id,
                Box::new(move |chat| chat.set_edited(time, text)),
            )
            .await;
        }
        EventKind::EmojiReplyAdded(added) => {
            let reply = EmojiReply {
                time: event.time,
                user_id: added.user_id,
                details: added.details.clone(),
                emoji: added.emoji.clone(),
            };
            amend(
                store,
                event,
                added.chat_id,
                Box::new(move |chat| {
                    chat.add_emoji_reply(reply);
                }),
            )
            .await;
        }
        EventKind::EmojiReplyRemoved(removed) => {
            let user_id = removed.user_id;
            amend(
                store,
                event,
                removed.chat_id,
                Box::new(move |chat| {
                    chat.remove_emoji_reply(&user_id);
                }),
            )
            .await;
        }
        EventKind::UserJoined(_)
        | EventKind::UserLeft(_)
        | EventKind::UserUpdated(_)
        | EventKind::UserStatusChanged(_)
        | EventKind::ChatSent(_) => store.add(event.clone()).await,
    }
}

async fn amend(store: &dyn HistoryStore, event: &Event, chat_id: ChatId, mutate: ChatMutator) {
    if !store.update_chat(chat_id, mutate).await {
        debug!(
            event.sequence = event.sequence,
            event.kind = event.kind.name(),
            chat_id = %chat_id,
            "Target chat not in history, dropping"
        );
    }
}

impl EventHandler for HistoryProjector {
    fn name(&self) -> &str {
        "history"
    }

    fn handle(&self, event: Arc<Event>) -> BoxFuture<'static, Result<(), BusError>> {
        let store = Arc::clone(&self.store);

        Box::pin(async move {
            project(store.as_ref(), &event).await;
            Ok(())
        })
    }
}
