//! Messages, receipts and typing indicators.
//!
//! The SDK delivers several message subclasses (text, media, custom, group
//! action, call). Here they share one [`Message`] header and differ only in
//! [`MessageKind`], so every consumer matches exhaustively on the kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{ChatTarget, Group, MemberScope, Peer, ReceiverType, User};

/// Server-assigned message ID. Zero while the message is still being sent.
pub type MessageId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Key identifying a message in a list.
///
/// Messages that have not been acknowledged by the server yet are keyed by
/// their client-generated `muid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKey {
    /// Acknowledged by the server.
    Server(MessageId),
    /// Pending local send.
    Local(String),
}

/// Broad message category, as reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCategory {
    /// Text and media messages.
    Message,
    /// Application-defined messages.
    Custom,
    /// System messages describing group membership changes.
    Action,
    /// Call activity.
    Call,
}

/// Media type of a media message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Photo.
    Image,
    /// Video clip.
    Video,
    /// Audio clip or voice note.
    Audio,
    /// Any other file.
    File,
}

impl MediaKind {
    /// SDK message type string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::File => "file",
        }
    }
}

/// File attached to a media message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name.
    pub name: String,
    /// Download URL.
    pub url: String,
    /// MIME type reported by the uploader.
    #[serde(default)]
    pub mime_type: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// Call type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    /// Voice only.
    Audio,
    /// Voice and video.
    Video,
}

/// Call lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Ringing.
    Initiated,
    /// Accepted and in progress.
    Ongoing,
    /// Nobody answered before the timeout.
    Unanswered,
    /// Declined by the receiver.
    Rejected,
    /// The receiver was on another call.
    Busy,
    /// Withdrawn by the initiator before it was answered.
    Cancelled,
    /// Finished after being answered.
    Ended,
}

/// Call activity carried by a call message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Call session ID.
    pub session_id: String,
    /// Audio or video.
    pub call_type: CallType,
    /// Current status.
    pub status: CallStatus,
    /// User who started the call.
    pub initiator: User,
}

/// Group membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    /// Member joined on their own.
    Joined,
    /// Member left.
    Left,
    /// Member was removed by the actor.
    Kicked,
    /// Member was banned by the actor.
    Banned,
    /// Member was unbanned by the actor.
    Unbanned,
    /// Member was added by the actor.
    Added,
    /// Member's scope was changed by the actor.
    ScopeChanged {
        /// New scope.
        scope: MemberScope,
    },
}

impl MembershipChange {
    /// The member is no longer part of the group after this change.
    pub fn removes_member(self) -> bool {
        matches!(self, Self::Left | Self::Kicked | Self::Banned)
    }
}

/// Group action carried by an action message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAction {
    /// User who performed the action.
    pub actor: User,
    /// User the action applies to.
    pub member: User,
    /// What happened.
    pub change: MembershipChange,
    /// Group state after the action.
    pub group: Group,
}

/// Per-category message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    Text {
        /// Message body.
        text: String,
    },
    /// Photo, video, audio or file.
    Media {
        /// Media type.
        media: MediaKind,
        /// Attached file. `None` while the upload is pending.
        #[serde(default)]
        attachment: Option<Attachment>,
        /// Optional caption.
        #[serde(default)]
        caption: Option<String>,
    },
    /// Application-defined message (polls, stickers, documents, ...).
    Custom {
        /// Custom type string, e.g. `"extension_poll"`.
        custom_type: String,
        /// Free-form payload.
        #[serde(default)]
        data: BTreeMap<String, String>,
    },
    /// Group membership change.
    Action(GroupAction),
    /// Call activity.
    Call(Call),
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server ID. Zero until acknowledged.
    #[serde(default)]
    pub id: MessageId,
    /// Client-generated ID, used to reconcile optimistic sends.
    #[serde(default)]
    pub muid: String,
    /// Sender.
    pub sender: User,
    /// Receiving user or group.
    pub receiver: ChatTarget,
    /// Parent message when this is a thread reply.
    #[serde(default)]
    pub parent_id: Option<MessageId>,
    /// Number of thread replies.
    #[serde(default)]
    pub reply_count: u32,
    /// Sent timestamp. `None` while sending.
    #[serde(default)]
    pub sent_at: Option<Timestamp>,
    /// Delivered timestamp.
    #[serde(default)]
    pub delivered_at: Option<Timestamp>,
    /// Read timestamp.
    #[serde(default)]
    pub read_at: Option<Timestamp>,
    /// Deleted timestamp.
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
    /// Last edit timestamp.
    #[serde(default)]
    pub edited_at: Option<Timestamp>,
    /// Sending failed.
    #[serde(default)]
    pub failed: bool,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Payload.
    pub kind: MessageKind,
}

impl Message {
    /// Create a message with no timestamps.
    pub fn new(id: MessageId, sender: User, receiver: ChatTarget, kind: MessageKind) -> Self {
        Self {
            id,
            muid: String::new(),
            sender,
            receiver,
            parent_id: None,
            reply_count: 0,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            deleted_at: None,
            edited_at: None,
            failed: false,
            metadata: BTreeMap::new(),
            kind,
        }
    }

    /// Create a text message.
    pub fn text(
        id: MessageId,
        sender: User,
        receiver: ChatTarget,
        text: impl Into<String>,
    ) -> Self {
        Self::new(id, sender, receiver, MessageKind::Text { text: text.into() })
    }

    /// List key for this message.
    pub fn key(&self) -> MessageKey {
        if self.id == 0 {
            MessageKey::Local(self.muid.clone())
        } else {
            MessageKey::Server(self.id)
        }
    }

    /// Broad category.
    pub fn category(&self) -> MessageCategory {
        match self.kind {
            MessageKind::Text { .. } | MessageKind::Media { .. } => MessageCategory::Message,
            MessageKind::Custom { .. } => MessageCategory::Custom,
            MessageKind::Action(_) => MessageCategory::Action,
            MessageKind::Call(_) => MessageCategory::Call,
        }
    }

    /// SDK message type string within the category.
    pub fn message_type(&self) -> &str {
        match &self.kind {
            MessageKind::Text { .. } => "text",
            MessageKind::Media { media, .. } => media.as_str(),
            MessageKind::Custom { custom_type, .. } => custom_type,
            MessageKind::Action(_) => "groupMember",
            MessageKind::Call(call) => match call.call_type {
                CallType::Audio => "audio",
                CallType::Video => "video",
            },
        }
    }

    /// Receiver type.
    pub fn receiver_type(&self) -> ReceiverType {
        self.receiver.receiver_type()
    }

    /// Was this message sent by `uid`.
    pub fn is_sent_by(&self, uid: &str) -> bool {
        self.sender.uid == uid
    }

    /// Has this message been deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Is this a thread reply.
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Conversation this message belongs to, as seen by the user `me`.
    pub fn peer(&self, me: &str) -> Peer {
        peer_of(&self.sender, &self.receiver, me)
    }

    /// Entity to hold a new conversation with when this message is the first
    /// one seen for its peer.
    pub fn conversation_target(&self, me: &str) -> ChatTarget {
        match &self.receiver {
            ChatTarget::Group(_) => self.receiver.clone(),
            ChatTarget::User(_) if self.sender.uid == me => self.receiver.clone(),
            ChatTarget::User(_) => ChatTarget::User(self.sender.clone()),
        }
    }
}

/// Receipt kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptType {
    /// Delivered to one recipient.
    Delivered,
    /// Read by one recipient.
    Read,
    /// Delivered to every group member.
    DeliveredToAll,
    /// Read by every group member.
    ReadByAll,
}

impl ReceiptType {
    /// Receipt marks the message as read.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadByAll)
    }

    /// Receipt updates the message timestamps in a conversation of this
    /// kind. Group messages only count as delivered or read once every
    /// member has.
    pub fn applies_to(self, kind: ReceiverType) -> bool {
        match kind {
            ReceiverType::User => matches!(self, Self::Delivered | Self::Read),
            ReceiverType::Group => matches!(self, Self::DeliveredToAll | Self::ReadByAll),
        }
    }
}

/// Delivery or read receipt for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Message the receipt is for.
    pub message_id: MessageId,
    /// User who delivered or read the message.
    pub sender: User,
    /// Receiver of the receipt.
    pub receiver: ChatTarget,
    /// Delivered or read.
    pub receipt_type: ReceiptType,
    /// When the receipt was generated.
    pub timestamp: Timestamp,
}

impl MessageReceipt {
    /// Conversation this receipt belongs to, as seen by the user `me`.
    pub fn peer(&self, me: &str) -> Peer {
        peer_of(&self.sender, &self.receiver, me)
    }
}

/// A user started or stopped typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingIndicator {
    /// Typing user.
    pub sender: User,
    /// User or group being typed to.
    pub receiver: ChatTarget,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TypingIndicator {
    /// Conversation this indicator belongs to, as seen by the user `me`.
    pub fn peer(&self, me: &str) -> Peer {
        peer_of(&self.sender, &self.receiver, me)
    }
}

fn peer_of(sender: &User, receiver: &ChatTarget, me: &str) -> Peer {
    match receiver {
        ChatTarget::Group(group) => Peer::group(group.guid.clone()),
        ChatTarget::User(user) if sender.uid == me => Peer::user(user.uid.clone()),
        ChatTarget::User(_) => Peer::user(sender.uid.clone()),
    }
}
