//! Observable view snapshots for invariant checking.
//!
//! Snapshots capture what a host would render at one point in time.
//! Invariants operate on snapshots rather than live controllers so that one
//! check covers conversation lists, message lists and search sections alike.

use chatkit_app::{ConversationsState, FetchState, ListState, MessageListState};
use chatkit_core::{Conversation, Message, MessageKey, Peer, Timestamp};
use serde::Serialize;

/// Snapshot of every view under test.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewSnapshot {
    /// Conversation lists.
    pub conversation_lists: Vec<ConversationListSnapshot>,
    /// Message lists.
    pub message_lists: Vec<MessageListSnapshot>,
}

impl ViewSnapshot {
    /// Create an empty snapshot (no views).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot of a single conversation list.
    pub fn conversations(state: &ConversationsState) -> Self {
        Self { conversation_lists: vec![state.into()], message_lists: Vec::new() }
    }

    /// Snapshot of a single message list.
    pub fn messages(state: &MessageListState) -> Self {
        Self { conversation_lists: Vec::new(), message_lists: vec![state.into()] }
    }

    /// Add a conversation list.
    #[must_use]
    pub fn with_conversations(mut self, list: ConversationListSnapshot) -> Self {
        self.conversation_lists.push(list);
        self
    }

    /// Add a message list.
    #[must_use]
    pub fn with_messages(mut self, list: MessageListSnapshot) -> Self {
        self.message_lists.push(list);
        self
    }
}

/// One conversation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationRow {
    /// Conversation peer.
    pub peer: Peer,
    /// Last message ID, 0 if none or unsent.
    pub last_message_id: u64,
    /// Unread count.
    pub unread: u32,
}

/// Snapshot of a conversation list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationListSnapshot {
    /// Label used in violation messages.
    pub label: String,
    /// Fetch state.
    pub fetch_state: FetchState,
    /// Rows in display order.
    pub rows: Vec<ConversationRow>,
    /// Peers with a live typing indicator.
    pub typing: Vec<Peer>,
    /// Active conversation.
    pub active: Option<Peer>,
}

impl ConversationListSnapshot {
    /// Snapshot of a bare list, e.g. a search section.
    pub fn from_list(label: impl Into<String>, list: &ListState<Conversation>) -> Self {
        Self {
            label: label.into(),
            fetch_state: list.fetch_state(),
            rows: list.items().iter().map(row).collect(),
            typing: Vec::new(),
            active: None,
        }
    }
}

impl From<&ConversationsState> for ConversationListSnapshot {
    fn from(state: &ConversationsState) -> Self {
        let mut typing: Vec<Peer> = state.typing().iter().map(|(peer, _)| peer.clone()).collect();
        typing.sort();
        Self {
            typing,
            active: state.active().cloned(),
            ..Self::from_list("conversations", state.list())
        }
    }
}

fn row(conversation: &Conversation) -> ConversationRow {
    ConversationRow {
        peer: conversation.peer(),
        last_message_id: conversation.last_message_id().unwrap_or(0),
        unread: conversation.unread_count,
    }
}

/// One message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRow {
    /// Server ID, 0 while unsent.
    pub id: u64,
    /// Client ID.
    pub muid: String,
    /// Sent timestamp.
    pub sent_at: Option<Timestamp>,
    /// Delivered timestamp.
    pub delivered_at: Option<Timestamp>,
    /// Read timestamp.
    pub read_at: Option<Timestamp>,
}

impl MessageRow {
    /// List key of the row.
    pub fn key(&self) -> MessageKey {
        if self.id == 0 {
            MessageKey::Local(self.muid.clone())
        } else {
            MessageKey::Server(self.id)
        }
    }
}

/// Snapshot of a message list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageListSnapshot {
    /// Label used in violation messages.
    pub label: String,
    /// Fetch state.
    pub fetch_state: FetchState,
    /// Rows in display order.
    pub rows: Vec<MessageRow>,
}

impl MessageListSnapshot {
    /// Snapshot of a bare list, e.g. a search section.
    pub fn from_list(label: impl Into<String>, list: &ListState<Message>) -> Self {
        let rows = list
            .items()
            .iter()
            .map(|m| MessageRow {
                id: m.id,
                muid: m.muid.clone(),
                sent_at: m.sent_at,
                delivered_at: m.delivered_at,
                read_at: m.read_at,
            })
            .collect();
        Self { label: label.into(), fetch_state: list.fetch_state(), rows }
    }
}

impl From<&MessageListState> for MessageListSnapshot {
    fn from(state: &MessageListState) -> Self {
        Self::from_list(state.peer().to_string(), state.list())
    }
}
