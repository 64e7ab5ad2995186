//! Contract of the external chat SDK.
//!
//! The reconciliation layer never talks to a backend directly. It builds a
//! query, asks the SDK for a cursor-backed [`PagedRequest`], and pulls pages
//! from it. Listener registration is not part of this trait: SDK adapters
//! publish [`crate::SdkEvent`]s onto the event bus instead.

use async_trait::async_trait;

use crate::{
    conversation::Conversation,
    entity::{Peer, ReceiverType, User},
    error::ChatError,
    message::{MediaKind, Message, MessageId},
};

/// Largest page size the backend accepts.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Conversation type filter.
pub type ConversationType = ReceiverType;

/// Cursor over a paginated result set.
///
/// Each call returns the next page. An empty page means the cursor is
/// exhausted.
#[async_trait]
pub trait PagedRequest<T: Send>: Send {
    /// Fetch the next page.
    async fn fetch_next(&mut self) -> Result<Vec<T>, ChatError>;
}

/// Operations the reconciliation layer needs from the chat SDK.
#[async_trait]
pub trait ChatSdk: Send + Sync {
    /// Currently logged-in user. `None` before login.
    fn logged_in_user(&self) -> Option<User>;

    /// Create a cursor over conversations matching `query`.
    fn conversations_request(
        &self,
        query: &ConversationQuery,
    ) -> Box<dyn PagedRequest<Conversation>>;

    /// Create a cursor over messages matching `query`, newest page first.
    fn messages_request(&self, query: &MessageQuery) -> Box<dyn PagedRequest<Message>>;

    /// Delete the conversation with `peer` for the logged-in user.
    async fn delete_conversation(&self, peer: &Peer) -> Result<(), ChatError>;

    /// Acknowledge delivery of `message`.
    async fn mark_as_delivered(&self, message: &Message) -> Result<(), ChatError>;

    /// Acknowledge that `message` (and everything before it) was read.
    async fn mark_as_read(&self, message: &Message) -> Result<(), ChatError>;
}

/// Query for a conversations cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationQuery {
    /// Page size.
    pub limit: u32,
    /// Match conversation names.
    pub keyword: Option<String>,
    /// Only user or only group conversations.
    pub conversation_type: Option<ConversationType>,
    /// Only conversations with any of these tags.
    pub tags: Vec<String>,
    /// Only conversations with unread messages.
    pub unread_only: bool,
}

impl Default for ConversationQuery {
    fn default() -> Self {
        Self::new(30)
    }
}

impl ConversationQuery {
    /// Query for all conversations in pages of `limit`.
    pub fn new(limit: u32) -> Self {
        Self { limit, keyword: None, conversation_type: None, tags: Vec::new(), unread_only: false }
    }

    /// Match conversation names against `keyword`.
    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Restrict to one conversation type.
    #[must_use]
    pub fn conversation_type(mut self, conversation_type: ConversationType) -> Self {
        self.conversation_type = Some(conversation_type);
        self
    }

    /// Restrict to conversations tagged with any of `tags`.
    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Restrict to conversations with unread messages.
    #[must_use]
    pub fn unread_only(mut self, unread_only: bool) -> Self {
        self.unread_only = unread_only;
        self
    }

    /// Check the query before handing it to the SDK.
    pub fn validate(&self) -> Result<(), ChatError> {
        validate_limit(self.limit)
    }
}

/// Query for a messages cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    /// Page size.
    pub limit: u32,
    /// Conversation to read. `None` searches across conversations.
    pub peer: Option<Peer>,
    /// Match message text.
    pub keyword: Option<String>,
    /// Only media messages of these kinds.
    pub media: Vec<MediaKind>,
    /// Only messages containing links.
    pub has_links: bool,
    /// Only replies to this message.
    pub parent_id: Option<MessageId>,
    /// Exclude thread replies.
    pub hide_replies: bool,
    /// Exclude deleted messages.
    pub hide_deleted: bool,
    /// Only messages newer than this ID.
    pub after_id: Option<MessageId>,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self::new(30)
    }
}

impl MessageQuery {
    /// Query for all messages in pages of `limit`.
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            peer: None,
            keyword: None,
            media: Vec::new(),
            has_links: false,
            parent_id: None,
            hide_replies: false,
            hide_deleted: false,
            after_id: None,
        }
    }

    /// Restrict to one conversation.
    #[must_use]
    pub fn peer(mut self, peer: Peer) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Match message text against `keyword`.
    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Restrict to media messages of these kinds.
    #[must_use]
    pub fn media(mut self, media: Vec<MediaKind>) -> Self {
        self.media = media;
        self
    }

    /// Restrict to messages containing links.
    #[must_use]
    pub fn has_links(mut self, has_links: bool) -> Self {
        self.has_links = has_links;
        self
    }

    /// Restrict to replies to `parent_id`.
    #[must_use]
    pub fn parent_id(mut self, parent_id: MessageId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Exclude thread replies.
    #[must_use]
    pub fn hide_replies(mut self, hide_replies: bool) -> Self {
        self.hide_replies = hide_replies;
        self
    }

    /// Exclude deleted messages.
    #[must_use]
    pub fn hide_deleted(mut self, hide_deleted: bool) -> Self {
        self.hide_deleted = hide_deleted;
        self
    }

    /// Only messages newer than `after_id`.
    #[must_use]
    pub fn after_id(mut self, after_id: MessageId) -> Self {
        self.after_id = Some(after_id);
        self
    }

    /// Check the query before handing it to the SDK.
    pub fn validate(&self) -> Result<(), ChatError> {
        validate_limit(self.limit)?;
        if self.has_links && !self.media.is_empty() {
            return Err(ChatError::InvalidRequest {
                reason: "link and media filters are mutually exclusive".into(),
            });
        }
        Ok(())
    }
}

fn validate_limit(limit: u32) -> Result<(), ChatError> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ChatError::InvalidRequest {
            reason: format!("limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"),
        });
    }
    Ok(())
}
