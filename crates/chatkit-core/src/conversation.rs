//! Conversation list entries.

use serde::{Deserialize, Serialize};

use crate::{
    entity::{ChatTarget, Peer},
    message::{Message, Timestamp},
};

/// Conversation identifier as assigned by the SDK.
pub type ConversationId = String;

/// A conversation with a user or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation ID.
    pub id: ConversationId,
    /// User or group the conversation is with.
    pub with: ChatTarget,
    /// Most recent message. `None` for conversations without history.
    #[serde(default)]
    pub last_message: Option<Message>,
    /// Messages not yet read by the logged-in user.
    #[serde(default)]
    pub unread_count: u32,
    /// Last activity timestamp.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    /// Conversation tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Conversation {
    /// Create an empty conversation with `with`.
    pub fn new(id: impl Into<ConversationId>, with: ChatTarget) -> Self {
        Self {
            id: id.into(),
            with,
            last_message: None,
            unread_count: 0,
            updated_at: None,
            tags: Vec::new(),
        }
    }

    /// Create the conversation `message` starts, as seen by the user `me`.
    pub fn from_message(message: &Message, me: &str) -> Self {
        let with = message.conversation_target(me);
        let id = with.peer().conversation_id();
        Self {
            id,
            with,
            last_message: Some(message.clone()),
            unread_count: 0,
            updated_at: message.sent_at,
            tags: Vec::new(),
        }
    }

    /// Identity of this conversation.
    pub fn peer(&self) -> Peer {
        self.with.peer()
    }

    /// Is this a group conversation.
    pub fn is_group(&self) -> bool {
        self.with.is_group()
    }

    /// ID of the last message. `None` if the conversation has no history.
    pub fn last_message_id(&self) -> Option<u64> {
        self.last_message.as_ref().map(|m| m.id)
    }
}
