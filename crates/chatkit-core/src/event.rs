//! Events that drive list reconciliation.
//!
//! Events originate from two distinct sources:
//! - [`SdkEvent`]: listener callbacks of the chat SDK (messages, typing,
//!   receipts, membership, presence, calls, connection).
//! - [`UiEvent`]: actions taken by local UI components (sending, editing,
//!   deleting, opening conversations).
//!
//! Both are carried on one bus as [`ChatEvent`].

use serde::{Deserialize, Serialize};

use crate::{
    conversation::Conversation,
    entity::{Group, Peer, User},
    message::{GroupAction, Message, MessageKind, MessageReceipt, TypingIndicator},
};

/// Events emitted by the chat SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SdkEvent {
    /// A message was received (text, media or custom).
    MessageReceived {
        /// The message.
        message: Message,
    },

    /// A message was edited by its sender.
    MessageEdited {
        /// The message after the edit.
        message: Message,
    },

    /// A message was deleted.
    MessageDeleted {
        /// The message, with `deleted_at` set.
        message: Message,
    },

    /// A user started typing.
    TypingStarted {
        /// The indicator.
        indicator: TypingIndicator,
    },

    /// A user stopped typing.
    TypingEnded {
        /// The indicator.
        indicator: TypingIndicator,
    },

    /// A message was delivered.
    MessageDelivered {
        /// The receipt.
        receipt: MessageReceipt,
    },

    /// A message was read.
    MessageRead {
        /// The receipt.
        receipt: MessageReceipt,
    },

    /// Group membership changed. Carries the generated action message.
    GroupMembershipChanged {
        /// Action message describing the change.
        message: Message,
    },

    /// A user came online.
    UserOnline {
        /// The user, with updated presence.
        user: User,
    },

    /// A user went offline.
    UserOffline {
        /// The user, with updated presence.
        user: User,
    },

    /// Group attributes changed.
    GroupUpdated {
        /// Group after the change.
        group: Group,
    },

    /// Call activity (incoming, accepted, rejected, ended, ...).
    CallActivity {
        /// Call message.
        message: Message,
    },

    /// Connection to the backend was (re)established.
    ConnectionEstablished,

    /// Connection to the backend was lost.
    ConnectionLost,
}

impl SdkEvent {
    /// Group action carried by a membership event. `None` for other events or
    /// malformed membership events.
    pub fn group_action(&self) -> Option<&GroupAction> {
        match self {
            Self::GroupMembershipChanged { message } => match &message.kind {
                MessageKind::Action(action) => Some(action),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Outcome of a local send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    /// Shown optimistically; not yet acknowledged.
    InProgress,
    /// Acknowledged by the backend; `id` is set.
    Success,
    /// Sending failed.
    Error,
}

/// Events emitted by local UI components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// The logged-in user sent a message.
    MessageSent {
        /// The message. `id` is zero while in progress.
        message: Message,
        /// Send outcome.
        status: SendStatus,
    },

    /// The logged-in user edited a message.
    MessageEdited {
        /// The message after the edit.
        message: Message,
    },

    /// The logged-in user deleted a message.
    MessageDeleted {
        /// The message, with `deleted_at` set.
        message: Message,
    },

    /// A conversation was deleted.
    ConversationDeleted {
        /// The deleted conversation.
        conversation: Conversation,
    },

    /// All messages in a conversation were read locally.
    ConversationRead {
        /// Conversation that was read.
        peer: Peer,
    },

    /// The conversation shown in the message view changed.
    ActiveConversationChanged {
        /// Newly active conversation. `None` when nothing is open.
        peer: Option<Peer>,
    },
}

/// Any event carried on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "event", rename_all = "snake_case")]
pub enum ChatEvent {
    /// From the SDK.
    Sdk(SdkEvent),
    /// From the UI.
    Ui(UiEvent),
}

impl From<SdkEvent> for ChatEvent {
    fn from(event: SdkEvent) -> Self {
        Self::Sdk(event)
    }
}

impl From<UiEvent> for ChatEvent {
    fn from(event: UiEvent) -> Self {
        Self::Ui(event)
    }
}
