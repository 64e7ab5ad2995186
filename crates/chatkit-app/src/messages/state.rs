//! Observable message list state.

use chatkit_core::{Message, MessageId, MessageKey, Peer};

use crate::{fetch::FetchState, list::ListState};

/// Messages of one conversation, or of one thread, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageListState {
    pub(crate) list: ListState<Message>,
    pub(crate) peer: Peer,
    pub(crate) parent_id: Option<MessageId>,
}

impl MessageListState {
    /// Empty list for the conversation with `peer`, waiting for its first
    /// page. With `parent_id`, the list shows that thread only.
    pub fn new(peer: Peer, parent_id: Option<MessageId>) -> Self {
        Self { list: ListState::new(), peer, parent_id }
    }

    /// Underlying list.
    pub fn list(&self) -> &ListState<Message> {
        &self.list
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        self.list.items()
    }

    /// Fetch state of the list.
    pub fn fetch_state(&self) -> FetchState {
        self.list.fetch_state()
    }

    /// Conversation shown.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Thread parent. `None` for the main conversation.
    pub fn parent_id(&self) -> Option<MessageId> {
        self.parent_id
    }

    /// Message with `key`.
    pub fn get(&self, key: &MessageKey) -> Option<&Message> {
        self.list.get(key)
    }

    /// Highest server-assigned ID in the list. `None` if nothing was
    /// acknowledged yet.
    pub fn last_server_id(&self) -> Option<MessageId> {
        self.list.items().iter().map(|m| m.id).filter(|id| *id != 0).max()
    }

    /// Newest message from someone other than `me` that is not read yet.
    pub fn latest_unread(&self, me: &str) -> Option<&Message> {
        self.list
            .items()
            .iter()
            .rev()
            .find(|m| m.id != 0 && !m.is_sent_by(me) && m.read_at.is_none())
    }
}
