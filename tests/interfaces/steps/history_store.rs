//! History store interface step definitions.

use std::collections::HashMap;
use std::sync::Arc;

use chatroom_events::event::{ChatId, ChatRecord, EmojiReply, Event, EventKind, Rgb, UserDetails, UserId};
use chatroom_events::storage::{HistoryStore, RingHistoryStore};
use chrono::{DateTime, Duration, Utc};
use cucumber::{given, then, when, World};
use uuid::Uuid;

/// Test context for history store scenarios.
#[derive(World)]
#[world(init = Self::new)]
pub struct HistoryStoreWorld {
    store: Option<Arc<dyn HistoryStore>>,
    chats: HashMap<String, ChatId>,
    users: HashMap<String, UserId>,
    next_sequence: u64,
    last_found: Option<bool>,
}

impl std::fmt::Debug for HistoryStoreWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStoreWorld")
            .field("store", &"<HistoryStore>")
            .field("chats", &self.chats.keys().collect::<Vec<_>>())
            .field("next_sequence", &self.next_sequence)
            .field("last_found", &self.last_found)
            .finish()
    }
}

impl HistoryStoreWorld {
    fn new() -> Self {
        Self {
            store: None,
            chats: HashMap::new(),
            users: HashMap::new(),
            next_sequence: 0,
            last_found: None,
        }
    }

    fn store(&self) -> &dyn HistoryStore {
        self.store
            .as_ref()
            .expect("History store not initialized")
            .as_ref()
    }

    fn base_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
    }

    fn next_time(&mut self) -> (DateTime<Utc>, u64) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        (Self::base_time() + Duration::seconds(sequence as i64), sequence)
    }

    fn user(&mut self, name: &str) -> UserId {
        *self.users.entry(name.to_string()).or_insert_with(Uuid::new_v4)
    }

    fn chat_id(&self, label: &str) -> ChatId {
        *self
            .chats
            .get(label)
            .unwrap_or_else(|| panic!("Unknown chat '{}'", label))
    }

    async fn add_chat(&mut self, text: &str) {
        let author = self.user("author");
        let chat = ChatRecord::new(author, UserDetails::new("author", Rgb::WHITE), text);
        self.chats.insert(text.to_string(), chat.chat_id);

        let (time, sequence) = self.next_time();
        self.store()
            .add(Event::new(time, sequence, EventKind::ChatSent(chat)))
            .await;
    }

    async fn stored_chat(&self, label: &str) -> ChatRecord {
        let chat_id = self.chat_id(label);
        self.store()
            .all()
            .await
            .into_iter()
            .find_map(|e| match e.kind {
                EventKind::ChatSent(chat) if chat.chat_id == chat_id => Some(chat),
                _ => None,
            })
            .unwrap_or_else(|| panic!("Chat '{}' not in history", label))
    }
}

fn texts(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.as_chat().map(|c| c.text.clone()))
        .collect()
}

fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ==========================================================================
// Setup
// ==========================================================================

#[given(expr = "a history store with capacity {int}")]
async fn given_store(world: &mut HistoryStoreWorld, capacity: usize) {
    world.store = Some(Arc::new(RingHistoryStore::new(capacity)));
}

#[given(expr = "the chats {string}, {string} and {string} are added")]
#[when(expr = "the chats {string}, {string} and {string} are added")]
async fn add_three_chats(world: &mut HistoryStoreWorld, a: String, b: String, c: String) {
    for text in [a, b, c] {
        world.add_chat(&text).await;
    }
}

// ==========================================================================
// Amendments
// ==========================================================================

#[when(expr = "the chat {string} is edited to {string}")]
async fn when_chat_edited(world: &mut HistoryStoreWorld, label: String, text: String) {
    let chat_id = world.chat_id(&label);
    let (time, _) = world.next_time();

    let found = world
        .store()
        .update_chat(chat_id, Box::new(move |chat| chat.set_edited(time, text)))
        .await;
    world.last_found = Some(found);
}

#[when(expr = "{string} reacts to {string} with {string}")]
async fn when_reacts(world: &mut HistoryStoreWorld, user: String, label: String, emoji: String) {
    let user_id = world.user(&user);
    let chat_id = world.chat_id(&label);
    let (time, _) = world.next_time();
    let reply = EmojiReply {
        time,
        user_id,
        details: UserDetails::new(user, Rgb::WHITE),
        emoji,
    };

    let found = world
        .store()
        .update_chat(
            chat_id,
            Box::new(move |chat| {
                chat.add_emoji_reply(reply);
            }),
        )
        .await;
    world.last_found = Some(found);
}

#[when(expr = "{string} removes their reaction from {string}")]
async fn when_removes_reaction(world: &mut HistoryStoreWorld, user: String, label: String) {
    let user_id = world.user(&user);
    let chat_id = world.chat_id(&label);

    let found = world
        .store()
        .update_chat(
            chat_id,
            Box::new(move |chat| {
                chat.remove_emoji_reply(&user_id);
            }),
        )
        .await;
    world.last_found = Some(found);
}

// ==========================================================================
// Assertions
// ==========================================================================

#[then(expr = "the history contains the chats {string}")]
async fn then_history_contains(world: &mut HistoryStoreWorld, list: String) {
    assert_eq!(texts(&world.store().all().await), parse_list(&list));
}

#[then(expr = "the history holds {int} events")]
async fn then_history_holds(world: &mut HistoryStoreWorld, count: usize) {
    assert_eq!(world.store().len().await, count);
}

#[then("the amendment is reported as not found")]
async fn then_not_found(world: &mut HistoryStoreWorld) {
    assert_eq!(world.last_found, Some(false));
}

#[then(expr = "the chat {string} reads {string}")]
async fn then_chat_reads(world: &mut HistoryStoreWorld, label: String, text: String) {
    assert_eq!(world.stored_chat(&label).await.text, text);
}

#[then(expr = "the chat {string} was originally {string}")]
async fn then_chat_original(world: &mut HistoryStoreWorld, label: String, original: String) {
    let chat = world.stored_chat(&label).await;
    let edit = chat.edit.expect("Chat was never edited");
    assert_eq!(edit.original_text, original);
}

#[then(expr = "the chat {string} has {int} reactions")]
async fn then_reaction_count(world: &mut HistoryStoreWorld, label: String, count: usize) {
    assert_eq!(world.stored_chat(&label).await.emoji_replies.len(), count);
}

#[then(expr = "the reaction of {string} on {string} is {string}")]
async fn then_reaction_is(world: &mut HistoryStoreWorld, user: String, label: String, emoji: String) {
    let user_id = world.user(&user);
    let chat = world.stored_chat(&label).await;
    let reply = chat
        .emoji_replies
        .get(&user_id)
        .unwrap_or_else(|| panic!("'{}' has no reaction on '{}'", user, label));
    assert_eq!(reply.emoji, emoji);
}

#[then(expr = "listing with limit {int} returns the chats {string}")]
async fn then_listing_returns(world: &mut HistoryStoreWorld, limit: usize, list: String) {
    let listed = world
        .store()
        .list_events(HistoryStoreWorld::base_time(), limit)
        .await;
    assert_eq!(texts(&listed), parse_list(&list));
}
