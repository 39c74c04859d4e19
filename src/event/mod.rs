//! Domain events distributed by the broker.
//!
//! An [`Event`] wraps exactly one [`EventKind`] together with the time and
//! sequence the broker assigned when it was published. Producers only ever
//! construct an `EventKind`; stamping is the broker's job so that history
//! and every subscriber observe one total order.
//!
//! Kind-specific data is reached through capability accessors instead of
//! downcasting:
//! - [`EventKind::user`]: subject user of user-centric events
//! - [`EventKind::receiver`]: private receiver of directed events

use std::fmt;

use chrono::{DateTime, Utc};

pub mod chat;
pub mod user;

pub use chat::{ChatEdit, ChatEdited, ChatId, ChatRecord, EmojiReply, EmojiReplyAdded, EmojiReplyRemoved};
pub use user::{
    initials_from_name, LeaveReason, Rgb, UserDetails, UserFlags, UserId, UserIdentifier,
    UserStatus,
};

/// A user joined the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserJoined {
    pub user_id: UserId,
    pub details: UserDetails,
    pub flags: UserFlags,
}

/// A user left the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLeft {
    pub user_id: UserId,
    pub details: UserDetails,
    pub reason: LeaveReason,
}

/// A user changed their display details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdated {
    pub user_id: UserId,
    pub before: UserDetails,
    pub after: UserDetails,
}

/// A user changed their presence status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatusChanged {
    pub user_id: UserId,
    pub details: UserDetails,
    pub before: UserStatus,
    pub after: UserStatus,
}

/// A user started or stopped typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTyping {
    pub user_id: UserId,
    pub details: UserDetails,
    /// Typing in a private conversation with this user.
    pub receiver_id: Option<UserId>,
    pub typing: bool,
}

/// Closed set of event payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    UserJoined(UserJoined),
    UserLeft(UserLeft),
    UserUpdated(UserUpdated),
    UserStatusChanged(UserStatusChanged),
    UserTyping(UserTyping),
    ChatSent(ChatRecord),
    ChatEdited(ChatEdited),
    EmojiReplyAdded(EmojiReplyAdded),
    EmojiReplyRemoved(EmojiReplyRemoved),
}

impl EventKind {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::UserJoined(_) => "user_joined",
            EventKind::UserLeft(_) => "user_left",
            EventKind::UserUpdated(_) => "user_updated",
            EventKind::UserStatusChanged(_) => "user_status_changed",
            EventKind::UserTyping(_) => "user_typing",
            EventKind::ChatSent(_) => "chat_sent",
            EventKind::ChatEdited(_) => "chat_edited",
            EventKind::EmojiReplyAdded(_) => "emoji_reply_added",
            EventKind::EmojiReplyRemoved(_) => "emoji_reply_removed",
        }
    }

    /// Subject user and their details, for user-centric events.
    ///
    /// For `UserUpdated` the details are the ones after the update.
    pub fn user(&self) -> Option<(UserId, &UserDetails)> {
        match self {
            EventKind::UserJoined(e) => Some((e.user_id, &e.details)),
            EventKind::UserLeft(e) => Some((e.user_id, &e.details)),
            EventKind::UserUpdated(e) => Some((e.user_id, &e.after)),
            EventKind::UserStatusChanged(e) => Some((e.user_id, &e.details)),
            EventKind::UserTyping(e) => Some((e.user_id, &e.details)),
            EventKind::ChatSent(e) => Some((e.user_id, &e.details)),
            EventKind::EmojiReplyAdded(e) => Some((e.user_id, &e.details)),
            EventKind::EmojiReplyRemoved(e) => Some((e.user_id, &e.details)),
            EventKind::ChatEdited(_) => None,
        }
    }

    /// Receiver of a directed event.
    ///
    /// Returns `None` for broadcast events, including directed kinds whose
    /// receiver is unset or the nil UUID.
    pub fn receiver(&self) -> Option<UserId> {
        let receiver = match self {
            EventKind::UserTyping(e) => e.receiver_id,
            EventKind::ChatSent(e) => e.receiver_id,
            EventKind::ChatEdited(e) => e.receiver_id,
            _ => None,
        };
        receiver.filter(|id| !id.is_nil())
    }
}

/// A published, timestamped event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Publish time assigned by the broker.
    pub time: DateTime<Utc>,
    /// Broker-wide publish sequence; breaks ties between equal times.
    pub sequence: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(time: DateTime<Utc>, sequence: u64, kind: EventKind) -> Self {
        Self {
            time,
            sequence,
            kind,
        }
    }

    /// The stored chat, when this is a `ChatSent` event.
    pub fn as_chat(&self) -> Option<&ChatRecord> {
        match &self.kind {
            EventKind::ChatSent(chat) => Some(chat),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.sequence, self.kind.name())?;
        if let Some((id, details)) = self.kind.user() {
            write!(f, " user={}", UserIdentifier { id, details })?;
        }
        if let Some(receiver) = self.kind.receiver() {
            write!(f, " receiver={receiver}")?;
        }
        Ok(())
    }
}
