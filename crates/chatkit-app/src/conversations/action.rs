//! Conversation list actions.

use chatkit_core::{ChatTarget, Conversation, Message, MessageReceipt, Peer, TypingIndicator};

use crate::fetch::FetchState;

/// Actions reduced into [`crate::ConversationsState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationsAction {
    /// Add a fetched page. With `replace`, the page replaces the list.
    Append {
        /// Page items.
        conversations: Vec<Conversation>,
        /// Replace instead of appending.
        replace: bool,
    },

    /// Remove the conversation with `peer`.
    Remove {
        /// Conversation to remove.
        peer: Peer,
    },

    /// A message was sent or received: update the last message and unread
    /// count, and move the conversation to the top.
    MessageActivity {
        /// The message.
        message: Message,
    },

    /// An edited or deleted message replaces the last message in place.
    ReplaceMessage {
        /// New version of the message.
        message: Message,
    },

    /// Patch receipt timestamps onto the last message.
    PatchReceipt {
        /// The receipt.
        receipt: MessageReceipt,
    },

    /// Reset the unread count.
    MarkRead {
        /// Conversation that was read.
        peer: Peer,
    },

    /// Someone started typing.
    TypingStarted {
        /// The indicator.
        indicator: TypingIndicator,
    },

    /// Someone stopped typing.
    TypingEnded {
        /// The indicator.
        indicator: TypingIndicator,
    },

    /// User presence or group attributes changed.
    UpdateTarget {
        /// Entity after the change.
        target: ChatTarget,
    },

    /// Change the conversation open in the message view.
    SetActive {
        /// Newly active conversation.
        peer: Option<Peer>,
    },

    /// Transition the fetch state.
    SetFetchState(FetchState),
}
