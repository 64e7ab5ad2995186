//! Observable conversation list state.

use chatkit_core::{Conversation, Peer};

use crate::{fetch::FetchState, list::ListState, typing::TypingIndicatorMap};

/// Conversation list as shown to the user.
///
/// Ordered most-recent-activity first, one entry per peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationsState {
    pub(crate) list: ListState<Conversation>,
    pub(crate) typing: TypingIndicatorMap,
    pub(crate) active: Option<Peer>,
}

impl ConversationsState {
    /// Empty list waiting for its first page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Underlying list.
    pub fn list(&self) -> &ListState<Conversation> {
        &self.list
    }

    /// Conversations in display order.
    pub fn conversations(&self) -> &[Conversation] {
        self.list.items()
    }

    /// Fetch state of the list.
    pub fn fetch_state(&self) -> FetchState {
        self.list.fetch_state()
    }

    /// Live typing indicators.
    pub fn typing(&self) -> &TypingIndicatorMap {
        &self.typing
    }

    /// Conversation open in the message view. `None` if none is open.
    pub fn active(&self) -> Option<&Peer> {
        self.active.as_ref()
    }

    /// Position of the conversation with `peer`.
    pub fn position_of(&self, peer: &Peer) -> Option<usize> {
        self.list.position(peer)
    }

    /// Conversation with `peer`.
    pub fn find(&self, peer: &Peer) -> Option<&Conversation> {
        self.position_of(peer).map(|index| &self.list.items()[index])
    }

    /// Sum of unread counts.
    pub fn unread_total(&self) -> u64 {
        self.list.items().iter().map(|c| u64::from(c.unread_count)).sum()
    }
}
