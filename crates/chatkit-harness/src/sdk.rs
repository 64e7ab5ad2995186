//! Scripted in-memory SDK.
//!
//! [`ScriptedSdk`] implements [`ChatSdk`] from queued pages instead of a
//! backend. Every cursor it hands out pulls from the same per-kind queue, so
//! a test scripts pages in the order the views will ask for them. Queries,
//! deletions and receipts are recorded for assertions.
//!
//! An exhausted queue answers with an empty page, which is what a real cursor
//! returns past its last page.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chatkit_core::{
    ChatError, ChatSdk, Conversation, ConversationQuery, Message, MessageId, MessageQuery,
    PagedRequest, Peer, User,
};

type Pages<T> = VecDeque<Result<Vec<T>, ChatError>>;

#[derive(Debug, Default)]
struct Script {
    me: Option<User>,
    conversation_pages: Pages<Conversation>,
    message_pages: Pages<Message>,
    conversation_queries: Vec<ConversationQuery>,
    message_queries: Vec<MessageQuery>,
    pages_served: usize,
    deleted: Vec<Peer>,
    delete_error: Option<ChatError>,
    receipt_error: Option<ChatError>,
    delivered: Vec<MessageId>,
    read: Vec<MessageId>,
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`ChatSdk`] driven by queued pages.
///
/// Cloning yields another handle to the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSdk {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSdk {
    /// SDK with `me` logged in.
    pub fn new(me: User) -> Self {
        let sdk = Self::default();
        lock(&sdk.script).me = Some(me);
        sdk
    }

    /// SDK with nobody logged in.
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Share as the trait object views take.
    pub fn shared(&self) -> Arc<dyn ChatSdk> {
        Arc::new(self.clone())
    }

    /// Queue a conversations page.
    pub fn push_conversations(&self, page: Vec<Conversation>) -> &Self {
        lock(&self.script).conversation_pages.push_back(Ok(page));
        self
    }

    /// Queue a failing conversations page.
    pub fn fail_conversations(&self, error: ChatError) -> &Self {
        lock(&self.script).conversation_pages.push_back(Err(error));
        self
    }

    /// Queue a messages page.
    pub fn push_messages(&self, page: Vec<Message>) -> &Self {
        lock(&self.script).message_pages.push_back(Ok(page));
        self
    }

    /// Queue a failing messages page.
    pub fn fail_messages(&self, error: ChatError) -> &Self {
        lock(&self.script).message_pages.push_back(Err(error));
        self
    }

    /// Make every later `delete_conversation` fail with `error`.
    pub fn fail_deletes(&self, error: ChatError) -> &Self {
        lock(&self.script).delete_error = Some(error);
        self
    }

    /// Make every later delivery or read acknowledgement fail with `error`.
    pub fn fail_receipts(&self, error: ChatError) -> &Self {
        lock(&self.script).receipt_error = Some(error);
        self
    }

    /// Conversation queries in the order cursors were opened.
    pub fn conversation_queries(&self) -> Vec<ConversationQuery> {
        lock(&self.script).conversation_queries.clone()
    }

    /// Message queries in the order cursors were opened.
    pub fn message_queries(&self) -> Vec<MessageQuery> {
        lock(&self.script).message_queries.clone()
    }

    /// Number of cursors opened, of either kind.
    pub fn requests_opened(&self) -> usize {
        let script = lock(&self.script);
        script.conversation_queries.len() + script.message_queries.len()
    }

    /// Number of pages (or failures) handed out, of either kind.
    pub fn pages_served(&self) -> usize {
        lock(&self.script).pages_served
    }

    /// Pages still queued, of either kind.
    pub fn pages_remaining(&self) -> usize {
        let script = lock(&self.script);
        script.conversation_pages.len() + script.message_pages.len()
    }

    /// Peers whose conversation was deleted.
    pub fn deleted(&self) -> Vec<Peer> {
        lock(&self.script).deleted.clone()
    }

    /// IDs acknowledged as delivered.
    pub fn delivered(&self) -> Vec<MessageId> {
        lock(&self.script).delivered.clone()
    }

    /// IDs acknowledged as read.
    pub fn read(&self) -> Vec<MessageId> {
        lock(&self.script).read.clone()
    }
}

#[async_trait]
impl ChatSdk for ScriptedSdk {
    fn logged_in_user(&self) -> Option<User> {
        lock(&self.script).me.clone()
    }

    fn conversations_request(
        &self,
        query: &ConversationQuery,
    ) -> Box<dyn PagedRequest<Conversation>> {
        lock(&self.script).conversation_queries.push(query.clone());
        Box::new(ScriptedRequest { script: Arc::clone(&self.script), pages: conversation_pages })
    }

    fn messages_request(&self, query: &MessageQuery) -> Box<dyn PagedRequest<Message>> {
        lock(&self.script).message_queries.push(query.clone());
        Box::new(ScriptedRequest { script: Arc::clone(&self.script), pages: message_pages })
    }

    async fn delete_conversation(&self, peer: &Peer) -> Result<(), ChatError> {
        let mut script = lock(&self.script);
        if let Some(error) = script.delete_error.clone() {
            return Err(error);
        }
        script.deleted.push(peer.clone());
        Ok(())
    }

    async fn mark_as_delivered(&self, message: &Message) -> Result<(), ChatError> {
        let mut script = lock(&self.script);
        if let Some(error) = script.receipt_error.clone() {
            return Err(error);
        }
        script.delivered.push(message.id);
        Ok(())
    }

    async fn mark_as_read(&self, message: &Message) -> Result<(), ChatError> {
        let mut script = lock(&self.script);
        if let Some(error) = script.receipt_error.clone() {
            return Err(error);
        }
        script.read.push(message.id);
        Ok(())
    }
}

fn conversation_pages(script: &mut Script) -> &mut Pages<Conversation> {
    &mut script.conversation_pages
}

fn message_pages(script: &mut Script) -> &mut Pages<Message> {
    &mut script.message_pages
}

/// Cursor popping pages from the shared script.
struct ScriptedRequest<T> {
    script: Arc<Mutex<Script>>,
    pages: fn(&mut Script) -> &mut Pages<T>,
}

#[async_trait]
impl<T: Send> PagedRequest<T> for ScriptedRequest<T> {
    async fn fetch_next(&mut self) -> Result<Vec<T>, ChatError> {
        let mut script = lock(&self.script);
        let page = (self.pages)(&mut script).pop_front();
        if page.is_some() {
            script.pages_served += 1;
        }
        let page = page.unwrap_or_else(|| Ok(Vec::new()));
        tracing::trace!(ok = page.is_ok(), "scripted page served");
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cursors_share_one_queue_per_kind() {
        let sdk = ScriptedSdk::new(User::new("alice", "Alice"));
        sdk.push_conversations(Vec::new()).fail_conversations(ChatError::network("down"));

        let query = ConversationQuery::new(10);
        let mut first = sdk.conversations_request(&query);
        let mut second = sdk.conversations_request(&query);

        assert_eq!(first.fetch_next().await, Ok(Vec::new()));
        assert!(second.fetch_next().await.is_err());
        assert_eq!(first.fetch_next().await, Ok(Vec::new()));

        assert_eq!(sdk.conversation_queries(), vec![query.clone(), query]);
        assert_eq!(sdk.pages_served(), 2);
        assert_eq!(sdk.pages_remaining(), 0);
    }

    #[tokio::test]
    async fn injected_failures_are_not_recorded() {
        let sdk = ScriptedSdk::new(User::new("alice", "Alice"));
        sdk.fail_deletes(ChatError::sdk("ERR_X", "nope"));

        assert!(sdk.delete_conversation(&Peer::user("bob")).await.is_err());
        assert!(sdk.deleted().is_empty());
    }

    #[test]
    fn logged_out_has_no_user() {
        assert_eq!(ScriptedSdk::logged_out().logged_in_user(), None);
    }
}
