//! Chat payloads and the mutable chat record kept in history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::user::{UserDetails, UserId};

/// Identity of a single chat message.
pub type ChatId = Uuid;

/// Edit metadata, set the first time a chat is edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEdit {
    /// Time of the latest edit.
    pub time: DateTime<Utc>,
    /// Text before the first edit.
    pub original_text: String,
}

/// A single emoji reaction on a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiReply {
    pub time: DateTime<Utc>,
    pub user_id: UserId,
    pub details: UserDetails,
    pub emoji: String,
}

/// A sent chat message.
///
/// Once stored in history the record is amended in place by later
/// `ChatEdited` and emoji events; the copies handed to live subscribers are
/// never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub details: UserDetails,
    /// Private receiver; `None` means the chat is broadcast.
    pub receiver_id: Option<UserId>,
    /// Chat this message replies to.
    pub reply_to: Option<ChatId>,
    pub text: String,
    /// Mentioned users by id, with the name as written in the text.
    pub mentions: HashMap<UserId, String>,
    pub edit: Option<ChatEdit>,
    /// Reactions keyed by the reacting user.
    pub emoji_replies: HashMap<UserId, EmojiReply>,
}

impl ChatRecord {
    /// New broadcast chat with a fresh chat id.
    pub fn new(user_id: UserId, details: UserDetails, text: impl Into<String>) -> Self {
        Self {
            chat_id: Uuid::new_v4(),
            user_id,
            details,
            receiver_id: None,
            reply_to: None,
            text: text.into(),
            mentions: HashMap::new(),
            edit: None,
            emoji_replies: HashMap::new(),
        }
    }

    /// Direct the chat at a single receiver.
    pub fn with_receiver(mut self, receiver_id: UserId) -> Self {
        self.receiver_id = Some(receiver_id);
        self
    }

    /// Mark the chat as a reply to another chat.
    pub fn with_reply_to(mut self, chat_id: ChatId) -> Self {
        self.reply_to = Some(chat_id);
        self
    }

    pub fn with_mention(mut self, user_id: UserId, name: impl Into<String>) -> Self {
        self.mentions.insert(user_id, name.into());
        self
    }

    /// Overwrite the text, keeping the text from before the first edit.
    pub fn set_edited(&mut self, time: DateTime<Utc>, text: impl Into<String>) {
        let text = text.into();
        match self.edit.as_mut() {
            Some(edit) => edit.time = time,
            None => {
                self.edit = Some(ChatEdit {
                    time,
                    original_text: std::mem::take(&mut self.text),
                });
            }
        }
        self.text = text;
    }

    pub fn is_edited(&self) -> bool {
        self.edit.is_some()
    }

    /// Insert or replace the reaction of `reply.user_id`.
    pub fn add_emoji_reply(&mut self, reply: EmojiReply) -> Option<EmojiReply> {
        self.emoji_replies.insert(reply.user_id, reply)
    }

    /// Remove the reaction of `user_id`, if any.
    pub fn remove_emoji_reply(&mut self, user_id: &UserId) -> Option<EmojiReply> {
        self.emoji_replies.remove(user_id)
    }
}

/// Replacement text for an earlier chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEdited {
    pub chat_id: ChatId,
    pub receiver_id: Option<UserId>,
    pub text: String,
}

/// A user reacted to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiReplyAdded {
    pub user_id: UserId,
    pub details: UserDetails,
    /// Chat receiving the reaction.
    pub chat_id: ChatId,
    pub emoji: String,
}

/// A user withdrew their reaction to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiReplyRemoved {
    pub user_id: UserId,
    pub details: UserDetails,
    pub chat_id: ChatId,
}
