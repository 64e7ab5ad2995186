//! Message list controller.
//!
//! Pages run backwards in time: the first fetch returns the newest page and
//! each further fetch returns an older one, prepended to the list. Live
//! messages are appended. After a reconnect the controller asks only for
//! messages newer than the last one it has, page by page until the catch-up
//! cursor runs dry.

use std::sync::Arc;

use chatkit_core::{
    ChatError, ChatEvent, ChatSdk, Message, MessageId, MessageQuery, Peer, SdkEvent, SendStatus,
    UiEvent, User,
};

use super::{MessageListAction, MessageListState, reduce};
use crate::{
    bus::{EventBus, Subscription},
    config::MessageListConfig,
    effect::{Effect, push_render},
    error::{ErrorHandler, log_errors},
    fetch::{
        FetchCompletion, FetchMode, FetchOutcome, FetchState, FetchTicket, Paginator,
        ReconnectGuard, Resolution, SharedRequest, share,
    },
};

/// Drives the message list of one conversation or thread.
pub struct MessageListController {
    sdk: Arc<dyn ChatSdk>,
    me: User,
    config: MessageListConfig,
    query: MessageQuery,
    state: Arc<MessageListState>,
    /// Older pages.
    paginator: Paginator,
    /// Messages missed while disconnected.
    catch_up: Paginator,
    reconnect: ReconnectGuard,
    request: Option<SharedRequest<Message>>,
    catch_up_request: Option<SharedRequest<Message>>,
    bus: Option<EventBus<ChatEvent>>,
    subscription: Option<Subscription<ChatEvent>>,
    on_error: ErrorHandler,
}

impl std::fmt::Debug for MessageListController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageListController")
            .field("peer", self.state.peer())
            .field("parent_id", &self.state.parent_id())
            .field("messages", &self.state.messages().len())
            .field("fetch_state", &self.state.fetch_state())
            .finish_non_exhaustive()
    }
}

impl MessageListController {
    /// Create a controller for the conversation with `peer`.
    ///
    /// # Errors
    ///
    /// [`ChatError::NotLoggedIn`] if the SDK has no logged-in user.
    pub fn new(
        sdk: Arc<dyn ChatSdk>,
        peer: Peer,
        config: MessageListConfig,
    ) -> Result<Self, ChatError> {
        Self::build(sdk, peer, None, config)
    }

    /// Create a controller for the replies to `parent_id`.
    ///
    /// # Errors
    ///
    /// [`ChatError::NotLoggedIn`] if the SDK has no logged-in user.
    pub fn thread(
        sdk: Arc<dyn ChatSdk>,
        peer: Peer,
        parent_id: MessageId,
        config: MessageListConfig,
    ) -> Result<Self, ChatError> {
        Self::build(sdk, peer, Some(parent_id), config)
    }

    fn build(
        sdk: Arc<dyn ChatSdk>,
        peer: Peer,
        parent_id: Option<MessageId>,
        config: MessageListConfig,
    ) -> Result<Self, ChatError> {
        let me = sdk.logged_in_user().ok_or(ChatError::NotLoggedIn)?;
        let mut query = MessageQuery::new(config.limit)
            .peer(peer.clone())
            .hide_deleted(config.hide_deleted);
        query = match parent_id {
            Some(parent_id) => query.parent_id(parent_id),
            None => query.hide_replies(!config.show_replies_inline),
        };

        Ok(Self {
            sdk,
            me,
            config,
            query,
            state: Arc::new(MessageListState::new(peer, parent_id)),
            paginator: Paginator::new(),
            catch_up: Paginator::new(),
            reconnect: ReconnectGuard::new(),
            request: None,
            catch_up_request: None,
            bus: None,
            subscription: None,
            on_error: log_errors(),
        })
    }

    /// Use a caller-built query instead of the one derived from the config.
    #[must_use]
    pub fn with_query(mut self, query: MessageQuery) -> Self {
        self.query = query;
        self
    }

    /// Route failures to `handler`.
    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.on_error = handler;
        self
    }

    /// Start receiving events from `bus`.
    pub fn attach(&mut self, bus: &EventBus<ChatEvent>) {
        self.subscription = Some(bus.subscribe("messages"));
        self.bus = Some(bus.clone());
    }

    /// Stop receiving events.
    pub fn detach(&mut self) {
        self.subscription = None;
        self.bus = None;
    }

    /// Current state.
    pub fn state(&self) -> &Arc<MessageListState> {
        &self.state
    }

    /// Reduce `action` into the state. Returns `true` if the state changed.
    pub fn dispatch(&mut self, action: MessageListAction) -> bool {
        let next = reduce(&self.state, action, &self.me.uid);
        let changed = !Arc::ptr_eq(&self.state, &next);
        self.state = next;
        changed
    }

    /// Issue a ticket for the next older page. `None` once history is
    /// exhausted, or while the previous page has not been applied yet.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if the query is rejected. The error is
    /// also reported to the error handler.
    pub fn prepare_fetch(&mut self) -> Result<Option<FetchTicket<Message>>, ChatError> {
        if !self.paginator.has_more() || self.paginator.is_pending() {
            return Ok(None);
        }
        let request = match self.request.clone() {
            Some(request) => request,
            None => {
                let request = self.open(&self.query).inspect_err(|e| self.report(e))?;
                self.request = Some(Arc::clone(&request));
                request
            },
        };
        if self.state.messages().is_empty() {
            self.dispatch(MessageListAction::SetFetchState(FetchState::Loading));
        }
        Ok(Some(FetchTicket::new(self.paginator.issue(), FetchMode::Prepend, request)))
    }

    /// Issue a ticket for the first page of messages newer than the newest
    /// one in the list. Further pages come from
    /// [`Self::prepare_catch_up_next`].
    ///
    /// With an empty list this starts history over instead.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if the query is rejected. The error is
    /// also reported to the error handler.
    pub fn prepare_catch_up(&mut self) -> Result<Option<FetchTicket<Message>>, ChatError> {
        let Some(after_id) = self.state.last_server_id() else {
            self.paginator.reset();
            self.request = None;
            self.catch_up_request = None;
            return self.prepare_fetch();
        };
        let query = self.query.clone().after_id(after_id);
        let request = self.open(&query).inspect_err(|e| self.report(e))?;
        self.catch_up.reset();
        self.catch_up_request = Some(Arc::clone(&request));
        Ok(Some(FetchTicket::new(self.catch_up.issue(), FetchMode::Append, request)))
    }

    /// Issue a ticket for the next page of the running catch-up.
    ///
    /// `None` once the catch-up cursor returned an empty page, and while its
    /// previous page is unapplied.
    pub fn prepare_catch_up_next(&mut self) -> Option<FetchTicket<Message>> {
        if !self.catch_up.has_more() || self.catch_up.is_pending() {
            return None;
        }
        let request = self.catch_up_request.clone()?;
        Some(FetchTicket::new(self.catch_up.issue(), FetchMode::Append, request))
    }

    /// Apply a finished fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure after reporting it to the error handler.
    pub fn apply_fetch(
        &mut self,
        completion: FetchCompletion<Message>,
    ) -> Result<FetchOutcome, ChatError> {
        let FetchCompletion { token, mode, result } = completion;
        let before = self.state.messages().len();
        let fetch_state = self.state.fetch_state();
        let resolution = match mode {
            FetchMode::Append => self.catch_up.resolve(token, result, before, fetch_state),
            FetchMode::Prepend | FetchMode::Replace => {
                self.paginator.resolve(token, result, before, fetch_state)
            },
        };

        match resolution {
            Resolution::Stale => Ok(FetchOutcome::Stale),
            Resolution::Apply { items, fetch_state } => {
                let action = match mode {
                    FetchMode::Append => MessageListAction::Append { messages: items },
                    FetchMode::Prepend | FetchMode::Replace => {
                        MessageListAction::PrependPage { messages: items }
                    },
                };
                self.dispatch(action);
                if mode != FetchMode::Append {
                    self.dispatch(MessageListAction::SetFetchState(fetch_state));
                }
                self.reconnect.on_success();

                let inserted = self.state.messages().len().saturating_sub(before);
                tracing::debug!(
                    %token,
                    ?mode,
                    inserted,
                    peer = %self.state.peer(),
                    "messages page applied"
                );
                Ok(FetchOutcome::Applied { inserted })
            },
            Resolution::Failed { error, fetch_state } => {
                self.dispatch(MessageListAction::SetFetchState(fetch_state));
                self.report(&error);
                Err(error)
            },
        }
    }

    /// Fetch and apply the next older page.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure after reporting it to the error handler.
    pub async fn fetch_next(&mut self) -> Result<FetchOutcome, ChatError> {
        let Some(ticket) = self.prepare_fetch()? else {
            return Ok(self.paginator.skipped());
        };
        let completion = ticket.run().await;
        self.apply_fetch(completion)
    }

    /// Fetch and apply every message missed while disconnected.
    ///
    /// Pulls catch-up pages until the cursor returns an empty one, so live
    /// messages are never appended after a gap. `inserted` counts all pages.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure after reporting it to the error handler.
    /// Pages applied before the failure stay.
    pub async fn catch_up(&mut self) -> Result<FetchOutcome, ChatError> {
        let Some(first) = self.prepare_catch_up()? else {
            return Ok(FetchOutcome::Exhausted);
        };
        // An empty list restarts history: one newest page is enough.
        let restarted = first.mode() != FetchMode::Append;

        let mut next = Some(first);
        let mut inserted = 0;
        while let Some(ticket) = next {
            match self.apply_fetch(ticket.run().await)? {
                FetchOutcome::Applied { inserted: page } => inserted += page,
                outcome => return Ok(outcome),
            }
            next = if restarted { None } else { self.prepare_catch_up_next() };
        }
        Ok(FetchOutcome::Applied { inserted })
    }

    /// Acknowledge the newest unread incoming message, which marks the whole
    /// conversation as read.
    ///
    /// Publishes [`UiEvent::ConversationRead`] on success.
    ///
    /// # Errors
    ///
    /// The SDK failure, also reported to the error handler.
    pub async fn mark_read(&mut self) -> Result<(), ChatError> {
        let Some(message) = self.state.latest_unread(&self.me.uid).cloned() else {
            return Ok(());
        };
        self.acknowledge_read(&message).await
    }

    /// Handle every pending bus event.
    pub fn pump(&mut self) -> Vec<Effect> {
        let events = match self.subscription.as_mut() {
            Some(subscription) => subscription.drain(),
            None => return Vec::new(),
        };

        let mut effects = Vec::new();
        for event in &events {
            for effect in self.handle(event) {
                if effect == Effect::Render {
                    push_render(&mut effects);
                } else {
                    effects.push(effect);
                }
            }
        }
        effects
    }

    /// Handle one event.
    pub fn handle(&mut self, event: &ChatEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        let changed = match event {
            ChatEvent::Sdk(sdk_event) => self.handle_sdk(sdk_event, &mut effects),
            ChatEvent::Ui(ui_event) => self.handle_ui(ui_event),
        };
        if changed {
            push_render(&mut effects);
        }
        effects
    }

    fn handle_sdk(&mut self, event: &SdkEvent, effects: &mut Vec<Effect>) -> bool {
        match event {
            SdkEvent::MessageReceived { message }
            | SdkEvent::CallActivity { message }
            | SdkEvent::GroupMembershipChanged { message } => {
                let changed = self.incoming(message);
                if changed && self.config.mark_read && !message.is_sent_by(&self.me.uid) {
                    effects.push(Effect::MarkAsRead(message.clone()));
                }
                changed
            },
            SdkEvent::MessageEdited { message } | SdkEvent::MessageDeleted { message } => {
                self.changed(message)
            },
            SdkEvent::MessageDelivered { receipt } | SdkEvent::MessageRead { receipt } => {
                self.dispatch(MessageListAction::PatchReceipt { receipt: receipt.clone() })
            },
            SdkEvent::ConnectionEstablished => {
                if self.reconnect.is_armed() {
                    effects.push(Effect::Refetch);
                }
                false
            },
            SdkEvent::TypingStarted { .. }
            | SdkEvent::TypingEnded { .. }
            | SdkEvent::UserOnline { .. }
            | SdkEvent::UserOffline { .. }
            | SdkEvent::GroupUpdated { .. }
            | SdkEvent::ConnectionLost => false,
        }
    }

    fn handle_ui(&mut self, event: &UiEvent) -> bool {
        match event {
            UiEvent::MessageSent { message, status } => {
                if !self.in_conversation(message) {
                    return false;
                }
                match (status, self.placement(message)) {
                    (_, Placement::Elsewhere) => false,
                    (SendStatus::Success, Placement::ParentReply(parent_id)) => {
                        self.dispatch(MessageListAction::IncrementReplyCount { parent_id })
                    },
                    (_, Placement::ParentReply(_)) => false,
                    (SendStatus::InProgress, Placement::List) => {
                        self.dispatch(MessageListAction::Append { messages: vec![message.clone()] })
                    },
                    (SendStatus::Success, Placement::List) => {
                        self.dispatch(MessageListAction::Replace { message: message.clone() })
                            || self.dispatch(MessageListAction::Append {
                                messages: vec![message.clone()],
                            })
                    },
                    (SendStatus::Error, Placement::List) => {
                        let mut failed = message.clone();
                        failed.failed = true;
                        self.dispatch(MessageListAction::Replace { message: failed })
                    },
                }
            },
            UiEvent::MessageEdited { message } | UiEvent::MessageDeleted { message } => {
                self.changed(message)
            },
            UiEvent::ConversationDeleted { .. }
            | UiEvent::ConversationRead { .. }
            | UiEvent::ActiveConversationChanged { .. } => false,
        }
    }

    /// A new message arrived from the SDK.
    fn incoming(&mut self, message: &Message) -> bool {
        if !self.in_conversation(message) {
            return false;
        }
        match self.placement(message) {
            Placement::List => {
                self.dispatch(MessageListAction::Append { messages: vec![message.clone()] })
            },
            Placement::ParentReply(parent_id) => {
                self.dispatch(MessageListAction::IncrementReplyCount { parent_id })
            },
            Placement::Elsewhere => false,
        }
    }

    /// A message was edited or deleted.
    fn changed(&mut self, message: &Message) -> bool {
        if !self.in_conversation(message) {
            return false;
        }
        if message.is_deleted() && self.config.hide_deleted {
            return self.dispatch(MessageListAction::Remove { key: message.key() });
        }
        self.dispatch(MessageListAction::Replace { message: message.clone() })
    }

    fn in_conversation(&self, message: &Message) -> bool {
        &message.peer(&self.me.uid) == self.state.peer()
    }

    /// Where a message of this conversation shows up in this list.
    fn placement(&self, message: &Message) -> Placement {
        match (self.state.parent_id(), message.parent_id) {
            (Some(thread), Some(parent)) if thread == parent => Placement::List,
            (Some(_), _) => Placement::Elsewhere,
            (None, Some(parent)) if !self.config.show_replies_inline => {
                Placement::ParentReply(parent)
            },
            (None, _) => Placement::List,
        }
    }

    /// Run effects returned by [`Self::handle`] or [`Self::pump`].
    ///
    /// Failures are reported to the error handler and otherwise ignored.
    pub async fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render => {},
                Effect::Refetch => {
                    tracing::debug!(peer = %self.state.peer(), "connection restored, catching up");
                    let _ = self.catch_up().await;
                },
                Effect::MarkAsDelivered(message) => {
                    if let Err(error) = self.sdk.mark_as_delivered(&message).await {
                        self.report(&error);
                    }
                },
                Effect::MarkAsRead(message) => {
                    let _ = self.acknowledge_read(&message).await;
                },
            }
        }
    }

    async fn acknowledge_read(&mut self, message: &Message) -> Result<(), ChatError> {
        if let Err(error) = self.sdk.mark_as_read(message).await {
            self.report(&error);
            return Err(error);
        }
        if let Some(bus) = &self.bus {
            bus.publish(UiEvent::ConversationRead { peer: self.state.peer().clone() });
        }
        Ok(())
    }

    fn open(&self, query: &MessageQuery) -> Result<SharedRequest<Message>, ChatError> {
        query.validate()?;
        Ok(share(self.sdk.messages_request(query)))
    }

    fn report(&self, error: &ChatError) {
        (self.on_error)(error);
    }
}

/// Where a message of the conversation belongs relative to this list.
enum Placement {
    /// In this list.
    List,
    /// A thread reply shown as a count on its parent.
    ParentReply(MessageId),
    /// A reply in another thread.
    Elsewhere,
}
