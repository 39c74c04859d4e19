//! Test utilities and mock implementations.
//!
//! Builders for events and users plus a counting handler, so unit tests
//! don't repeat payload construction.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::bus::{BusError, EventHandler};
use crate::event::{
    ChatEdited, ChatId, ChatRecord, EmojiReplyAdded, EmojiReplyRemoved, Event, EventKind, Rgb,
    UserDetails, UserFlags, UserId, UserJoined, UserTyping,
};

pub fn details(name: &str) -> UserDetails {
    UserDetails::new(name, Rgb::new(30, 60, 90))
}

/// Event stamped at a fixed base time plus `sequence` seconds.
pub fn make_event(sequence: u64, kind: EventKind) -> Event {
    Event::new(time_at(sequence as i64), sequence, kind)
}

/// Base time plus `secs` seconds.
pub fn time_at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub fn user_joined(name: &str) -> EventKind {
    EventKind::UserJoined(UserJoined {
        user_id: Uuid::new_v4(),
        details: details(name),
        flags: UserFlags::default(),
    })
}

pub fn chat_sent(name: &str, text: &str) -> EventKind {
    EventKind::ChatSent(ChatRecord::new(Uuid::new_v4(), details(name), text))
}

pub fn chat_with_id(chat_id: ChatId, text: &str) -> EventKind {
    let mut chat = ChatRecord::new(Uuid::new_v4(), details("author"), text);
    chat.chat_id = chat_id;
    EventKind::ChatSent(chat)
}

pub fn private_chat(receiver: UserId, text: &str) -> EventKind {
    EventKind::ChatSent(ChatRecord::new(Uuid::new_v4(), details("sender"), text).with_receiver(receiver))
}

pub fn chat_edited(chat_id: ChatId, text: &str) -> EventKind {
    EventKind::ChatEdited(ChatEdited {
        chat_id,
        receiver_id: None,
        text: text.to_string(),
    })
}

pub fn emoji_added(chat_id: ChatId, user_id: UserId, emoji: &str) -> EventKind {
    EventKind::EmojiReplyAdded(EmojiReplyAdded {
        user_id,
        details: details("reactor"),
        chat_id,
        emoji: emoji.to_string(),
    })
}

pub fn emoji_removed(chat_id: ChatId, user_id: UserId) -> EventKind {
    EventKind::EmojiReplyRemoved(EmojiReplyRemoved {
        user_id,
        details: details("reactor"),
        chat_id,
    })
}

pub fn typing(user_id: UserId, receiver_id: Option<UserId>, typing: bool) -> EventKind {
    EventKind::UserTyping(UserTyping {
        user_id,
        details: details("typist"),
        receiver_id,
        typing,
    })
}

/// Handler that records every event it receives.
#[derive(Default)]
pub struct CountingHandler {
    events: Mutex<Vec<Arc<Event>>>,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<Arc<Event>> {
        self.events.lock().unwrap().clone()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.events.lock().unwrap().iter().map(|e| e.sequence).collect()
    }
}

impl EventHandler for CountingHandler {
    fn name(&self) -> &str {
        "counting"
    }

    fn handle(&self, event: Arc<Event>) -> BoxFuture<'static, Result<(), BusError>> {
        self.events.lock().unwrap().push(event);
        Box::pin(async { Ok(()) })
    }
}
