//! Conversation list controller.
//!
//! Owns the conversation list state, its paginator and its bus subscription.
//! The controller is single-owner: hosts call it through `&mut self` and run
//! fetch tickets wherever they like.
//!
//! # Lifecycle
//!
//! 1. [`ConversationsController::new`] (requires a logged-in user)
//! 2. [`ConversationsController::fetch_next`] for the first page
//! 3. [`ConversationsController::attach`] to the event bus
//! 4. [`ConversationsController::pump`] whenever events may be pending, then
//!    [`ConversationsController::execute`] the returned effects

use std::sync::Arc;

use chatkit_core::{
    ChatError, ChatEvent, ChatSdk, ChatTarget, Conversation, ConversationQuery, Peer, SdkEvent,
    SendStatus, UiEvent, User,
};

use super::{ConversationsAction, ConversationsState, ReducerContext, reduce};
use crate::{
    bus::{EventBus, Subscription},
    config::ConversationsConfig,
    effect::{Effect, push_render},
    error::{ErrorHandler, log_errors},
    fetch::{
        FetchCompletion, FetchMode, FetchOutcome, FetchState, FetchTicket, Paginator,
        ReconnectGuard, Resolution, SharedRequest, share,
    },
};

/// Drives a conversation list from SDK pages and bus events.
pub struct ConversationsController {
    sdk: Arc<dyn ChatSdk>,
    me: User,
    config: ConversationsConfig,
    query: ConversationQuery,
    state: Arc<ConversationsState>,
    paginator: Paginator,
    reconnect: ReconnectGuard,
    request: Option<SharedRequest<Conversation>>,
    bus: Option<EventBus<ChatEvent>>,
    subscription: Option<Subscription<ChatEvent>>,
    on_error: ErrorHandler,
}

impl std::fmt::Debug for ConversationsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationsController")
            .field("me", &self.me.uid)
            .field("conversations", &self.state.conversations().len())
            .field("fetch_state", &self.state.fetch_state())
            .field("attached", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}

impl ConversationsController {
    /// Create a controller for the logged-in user.
    ///
    /// # Errors
    ///
    /// [`ChatError::NotLoggedIn`] if the SDK has no logged-in user.
    pub fn new(sdk: Arc<dyn ChatSdk>, config: ConversationsConfig) -> Result<Self, ChatError> {
        let me = sdk.logged_in_user().ok_or(ChatError::NotLoggedIn)?;
        let query = ConversationQuery::new(config.limit).tags(config.tags.clone());
        Ok(Self {
            sdk,
            me,
            config,
            query,
            state: Arc::new(ConversationsState::new()),
            paginator: Paginator::new(),
            reconnect: ReconnectGuard::new(),
            request: None,
            bus: None,
            subscription: None,
            on_error: log_errors(),
        })
    }

    /// Use a caller-built query instead of the one derived from the config.
    #[must_use]
    pub fn with_query(mut self, query: ConversationQuery) -> Self {
        self.query = query;
        self
    }

    /// Route failures to `handler`.
    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.on_error = handler;
        self
    }

    /// Start receiving events from `bus`. Replaces any previous subscription.
    pub fn attach(&mut self, bus: &EventBus<ChatEvent>) {
        self.subscription = Some(bus.subscribe("conversations"));
        self.bus = Some(bus.clone());
    }

    /// Stop receiving events.
    pub fn detach(&mut self) {
        self.subscription = None;
        self.bus = None;
    }

    /// Current state.
    pub fn state(&self) -> &Arc<ConversationsState> {
        &self.state
    }

    /// Logged-in user.
    pub fn me(&self) -> &User {
        &self.me
    }

    /// Reduce `action` into the state. Returns `true` if the state changed.
    pub fn dispatch(&mut self, action: ConversationsAction) -> bool {
        let ctx = ReducerContext { me: &self.me.uid, rules: &self.config.update_rules };
        let next = reduce(&self.state, action, &ctx);
        let changed = !Arc::ptr_eq(&self.state, &next);
        self.state = next;
        changed
    }

    /// Issue a ticket for the next page.
    ///
    /// Returns `None` once the cursor is exhausted, or while a ticket issued
    /// earlier has not been applied yet.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if the query is rejected. The error is
    /// also reported to the error handler.
    pub fn prepare_fetch(&mut self) -> Result<Option<FetchTicket<Conversation>>, ChatError> {
        if !self.paginator.has_more() || self.paginator.is_pending() {
            return Ok(None);
        }
        let request = match self.request.clone() {
            Some(request) => request,
            None => {
                let request = self.open_request().inspect_err(|e| self.report(e))?;
                self.request = Some(Arc::clone(&request));
                request
            },
        };
        if self.state.conversations().is_empty() {
            self.dispatch(ConversationsAction::SetFetchState(FetchState::Loading));
        }
        Ok(Some(FetchTicket::new(self.paginator.issue(), FetchMode::Append, request)))
    }

    /// Issue a ticket that reloads the list from the first page and replaces
    /// the current contents when applied.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if the query is rejected.
    pub fn prepare_refetch(&mut self) -> Result<FetchTicket<Conversation>, ChatError> {
        let request = self.open_request().inspect_err(|e| self.report(e))?;
        self.paginator.reset();
        self.request = Some(Arc::clone(&request));
        Ok(FetchTicket::new(self.paginator.issue(), FetchMode::Replace, request))
    }

    /// Apply a finished fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure after reporting it to the error handler.
    pub fn apply_fetch(
        &mut self,
        completion: FetchCompletion<Conversation>,
    ) -> Result<FetchOutcome, ChatError> {
        let FetchCompletion { token, mode, result } = completion;
        let before = self.state.conversations().len();
        let resolution =
            self.paginator.resolve(token, result, before, self.state.fetch_state());

        match resolution {
            Resolution::Stale => Ok(FetchOutcome::Stale),
            Resolution::Apply { items, fetch_state } => {
                let replace = mode == FetchMode::Replace;
                self.dispatch(ConversationsAction::Append { conversations: items, replace });
                self.dispatch(ConversationsAction::SetFetchState(fetch_state));
                self.reconnect.on_success();

                let after = self.state.conversations().len();
                let inserted = if replace { after } else { after.saturating_sub(before) };
                tracing::debug!(%token, inserted, total = after, "conversations page applied");
                Ok(FetchOutcome::Applied { inserted })
            },
            Resolution::Failed { error, fetch_state } => {
                self.dispatch(ConversationsAction::SetFetchState(fetch_state));
                self.report(&error);
                Err(error)
            },
        }
    }

    /// Fetch and apply the next page.
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

    /// Reload the list from the first page, replacing its contents.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure after reporting it to the error handler.
    pub async fn refetch(&mut self) -> Result<FetchOutcome, ChatError> {
        let ticket = self.prepare_refetch()?;
        let completion = ticket.run().await;
        self.apply_fetch(completion)
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
            SdkEvent::MessageReceived { message } => {
                if self.config.mark_delivered && !message.is_sent_by(&self.me.uid) {
                    effects.push(Effect::MarkAsDelivered(message.clone()));
                }
                self.dispatch(ConversationsAction::MessageActivity { message: message.clone() })
            },
            SdkEvent::CallActivity { message } => {
                self.dispatch(ConversationsAction::MessageActivity { message: message.clone() })
            },
            SdkEvent::MessageEdited { message } | SdkEvent::MessageDeleted { message } => {
                self.dispatch(ConversationsAction::ReplaceMessage { message: message.clone() })
            },
            SdkEvent::TypingStarted { indicator } => {
                self.dispatch(ConversationsAction::TypingStarted { indicator: indicator.clone() })
            },
            SdkEvent::TypingEnded { indicator } => {
                self.dispatch(ConversationsAction::TypingEnded { indicator: indicator.clone() })
            },
            SdkEvent::MessageDelivered { receipt } | SdkEvent::MessageRead { receipt } => {
                self.dispatch(ConversationsAction::PatchReceipt { receipt: receipt.clone() })
            },
            SdkEvent::GroupMembershipChanged { message } => {
                let Some(action) = event.group_action() else {
                    tracing::debug!(id = message.id, "membership event without group action");
                    return false;
                };
                let peer = Peer::group(action.group.guid.clone());
                if action.change.removes_member() && action.member.uid == self.me.uid {
                    return self.dispatch(ConversationsAction::Remove { peer });
                }
                let target = ChatTarget::Group(action.group.clone());
                let updated = self.dispatch(ConversationsAction::UpdateTarget { target });
                let moved = self
                    .dispatch(ConversationsAction::MessageActivity { message: message.clone() });
                updated || moved
            },
            SdkEvent::UserOnline { user } | SdkEvent::UserOffline { user } => {
                let target = ChatTarget::User(user.clone());
                self.dispatch(ConversationsAction::UpdateTarget { target })
            },
            SdkEvent::GroupUpdated { group } => {
                let target = ChatTarget::Group(group.clone());
                self.dispatch(ConversationsAction::UpdateTarget { target })
            },
            SdkEvent::ConnectionEstablished => {
                if self.reconnect.is_armed() {
                    effects.push(Effect::Refetch);
                }
                false
            },
            SdkEvent::ConnectionLost => {
                tracing::debug!("connection lost, waiting for reconnect");
                false
            },
        }
    }

    fn handle_ui(&mut self, event: &UiEvent) -> bool {
        match event {
            UiEvent::MessageSent { message, status } => match status {
                SendStatus::InProgress | SendStatus::Success => self
                    .dispatch(ConversationsAction::MessageActivity { message: message.clone() }),
                SendStatus::Error => {
                    self.dispatch(ConversationsAction::ReplaceMessage { message: message.clone() })
                },
            },
            UiEvent::MessageEdited { message } | UiEvent::MessageDeleted { message } => {
                self.dispatch(ConversationsAction::ReplaceMessage { message: message.clone() })
            },
            UiEvent::ConversationDeleted { conversation } => {
                self.dispatch(ConversationsAction::Remove { peer: conversation.peer() })
            },
            UiEvent::ConversationRead { peer } => {
                self.dispatch(ConversationsAction::MarkRead { peer: peer.clone() })
            },
            UiEvent::ActiveConversationChanged { peer } => {
                self.dispatch(ConversationsAction::SetActive { peer: peer.clone() })
            },
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
                    tracing::debug!("connection restored, refetching conversations");
                    // Already reported by refetch
                    let _ = self.refetch().await;
                },
                Effect::MarkAsDelivered(message) => {
                    if let Err(error) = self.sdk.mark_as_delivered(&message).await {
                        self.report(&error);
                    }
                },
                Effect::MarkAsRead(message) => {
                    if let Err(error) = self.sdk.mark_as_read(&message).await {
                        self.report(&error);
                    }
                },
            }
        }
    }

    /// Delete the conversation with `peer`.
    ///
    /// On success the conversation is removed locally and
    /// [`UiEvent::ConversationDeleted`] is published.
    ///
    /// # Errors
    ///
    /// [`ChatError::ConversationNotFound`] if the list has no such
    /// conversation, or the SDK failure. Both are also reported to the error
    /// handler.
    pub async fn delete_conversation(&mut self, peer: &Peer) -> Result<(), ChatError> {
        let Some(conversation) = self.state.find(peer).cloned() else {
            let error = ChatError::ConversationNotFound { id: peer.conversation_id() };
            self.report(&error);
            return Err(error);
        };
        if let Err(error) = self.sdk.delete_conversation(peer).await {
            self.report(&error);
            return Err(error);
        }

        self.dispatch(ConversationsAction::Remove { peer: peer.clone() });
        if let Some(bus) = &self.bus {
            bus.publish(UiEvent::ConversationDeleted { conversation });
        }
        Ok(())
    }

    /// Mark `peer` as the conversation open in the message view.
    ///
    /// Publishes [`UiEvent::ActiveConversationChanged`] when attached.
    pub fn select(&mut self, peer: Option<Peer>) -> bool {
        let changed = self.dispatch(ConversationsAction::SetActive { peer: peer.clone() });
        if changed && let Some(bus) = &self.bus {
            bus.publish(UiEvent::ActiveConversationChanged { peer });
        }
        changed
    }

    fn open_request(&self) -> Result<SharedRequest<Conversation>, ChatError> {
        self.query.validate()?;
        Ok(share(self.sdk.conversations_request(&self.query)))
    }

    fn report(&self, error: &ChatError) {
        (self.on_error)(error);
    }
}
