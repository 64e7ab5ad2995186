//! Message list actions.

use chatkit_core::{Message, MessageId, MessageKey, MessageReceipt};

use crate::fetch::FetchState;

/// Actions reduced into [`crate::MessageListState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListAction {
    /// Add messages after the current ones (live messages, reconnect
    /// catch-up).
    Append {
        /// New messages, oldest first.
        messages: Vec<Message>,
    },

    /// Add an older page before the current messages.
    PrependPage {
        /// Page messages, oldest first.
        messages: Vec<Message>,
    },

    /// Replace a message in place. Matched by server ID, or by `muid` for a
    /// pending local send.
    Replace {
        /// New version of the message.
        message: Message,
    },

    /// Patch receipt timestamps onto every own message up to the receipt.
    PatchReceipt {
        /// The receipt.
        receipt: MessageReceipt,
    },

    /// A reply was posted in the thread of `parent_id`.
    IncrementReplyCount {
        /// Thread parent.
        parent_id: MessageId,
    },

    /// Remove a message.
    Remove {
        /// Key of the message.
        key: MessageKey,
    },

    /// Transition the fetch state.
    SetFetchState(FetchState),
}
