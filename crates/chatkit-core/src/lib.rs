//! Core types for chatkit
//!
//! Entities, messages and events as delivered by an external chat SDK, plus
//! the trait contract ([`ChatSdk`], [`PagedRequest`]) the reconciliation layer
//! consumes. Nothing here owns state or performs I/O.
//!
//! # Components
//!
//! - [`User`], [`Group`], [`ChatTarget`], [`Peer`]: who a message or
//!   conversation is with
//! - [`Message`] and [`MessageKind`]: a tagged union over the SDK's message
//!   categories
//! - [`Conversation`]: a conversation list entry
//! - [`ChatEvent`]: everything that can change list state
//! - [`ChatError`]: failures surfaced by the SDK

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod conversation;
pub mod entity;
pub mod error;
pub mod event;
pub mod message;
pub mod sdk;

pub use conversation::{Conversation, ConversationId};
pub use entity::{
    ChatTarget, Group, GroupId, GroupType, MemberScope, Peer, ReceiverType, User, UserId,
    UserStatus,
};
pub use error::ChatError;
pub use event::{ChatEvent, SdkEvent, SendStatus, UiEvent};
pub use message::{
    Attachment, Call, CallStatus, CallType, GroupAction, MediaKind, Message, MessageCategory,
    MessageId, MessageKey, MessageKind, MessageReceipt, MembershipChange, ReceiptType, Timestamp,
    TypingIndicator,
};
pub use sdk::{ChatSdk, ConversationQuery, ConversationType, MessageQuery, PagedRequest};
