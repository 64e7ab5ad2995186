//! Search controller.
//!
//! Runs a keyword + filter search over two independent sections,
//! conversations and messages. Each section has its own list state and
//! paginator, so a slow page in one never blocks or overwrites the other.
//! Submitting a new query invalidates every in-flight page of the previous
//! one.

use std::{
    ops::Add,
    sync::Arc,
    time::{Duration, Instant},
};

use chatkit_core::{
    ChatError, ChatEvent, ChatSdk, Conversation, ConversationQuery, Message, MessageQuery, Peer,
    ReceiverType, SdkEvent, UiEvent, User,
};

use super::filter::{FilterSet, SearchFilter, SearchScopes, is_valid_query};
use crate::{
    bus::{EventBus, Subscription},
    config::SearchConfig,
    debounce::Debouncer,
    effect::{Effect, push_render},
    error::{ErrorHandler, log_errors},
    fetch::{
        FetchCompletion, FetchMode, FetchOutcome, FetchState, FetchTicket, Paginator, Resolution,
        SharedRequest, share,
    },
    list::{Keyed, ListAction, ListState, reduce_list},
};

/// One result section.
struct Section<T> {
    state: Arc<ListState<T>>,
    paginator: Paginator,
    request: Option<SharedRequest<T>>,
}

impl<T: Keyed + Clone + Send> Section<T> {
    fn idle() -> Self {
        Self {
            state: Arc::new(ListState::with_fetch_state(FetchState::Empty)),
            paginator: Paginator::new(),
            request: None,
        }
    }

    /// Drop results and pending pages; show `Empty`.
    fn clear(&mut self) {
        self.paginator.reset();
        self.request = None;
        self.state = Arc::new(ListState::with_fetch_state(FetchState::Empty));
    }

    /// Start over with `request`; show `Loading`.
    fn restart(&mut self, request: SharedRequest<T>) -> FetchTicket<T> {
        self.paginator.reset();
        self.request = Some(Arc::clone(&request));
        self.state = Arc::new(ListState::new());
        FetchTicket::new(self.paginator.issue(), FetchMode::Append, request)
    }

    fn next(&mut self) -> Option<FetchTicket<T>> {
        if !self.paginator.has_more() || self.paginator.is_pending() {
            return None;
        }
        let request = self.request.clone()?;
        Some(FetchTicket::new(self.paginator.issue(), FetchMode::Append, request))
    }

    fn dispatch(&mut self, action: ListAction<T>) -> bool {
        let next = reduce_list(&self.state, action);
        let changed = !Arc::ptr_eq(&self.state, &next);
        self.state = next;
        changed
    }

    fn apply(&mut self, completion: FetchCompletion<T>) -> Result<FetchOutcome, ChatError> {
        let FetchCompletion { token, result, .. } = completion;
        let before = self.state.len();
        let resolution = self.paginator.resolve(token, result, before, self.state.fetch_state());
        match resolution {
            Resolution::Stale => Ok(FetchOutcome::Stale),
            Resolution::Apply { items, fetch_state } => {
                self.dispatch(ListAction::Append { items, replace: false });
                self.dispatch(ListAction::SetFetchState(fetch_state));
                Ok(FetchOutcome::Applied { inserted: self.state.len().saturating_sub(before) })
            },
            Resolution::Failed { error, fetch_state } => {
                self.dispatch(ListAction::SetFetchState(fetch_state));
                Err(error)
            },
        }
    }
}

/// A search page ready to run.
#[derive(Debug)]
pub enum SearchTicket {
    /// Conversation results page.
    Conversations(FetchTicket<Conversation>),
    /// Message results page.
    Messages(FetchTicket<Message>),
}

impl SearchTicket {
    /// Pull the page from the SDK.
    pub async fn run(self) -> SearchCompletion {
        match self {
            Self::Conversations(ticket) => SearchCompletion::Conversations(ticket.run().await),
            Self::Messages(ticket) => SearchCompletion::Messages(ticket.run().await),
        }
    }
}

/// A finished search page.
#[derive(Debug)]
pub enum SearchCompletion {
    /// Conversation results page.
    Conversations(FetchCompletion<Conversation>),
    /// Message results page.
    Messages(FetchCompletion<Message>),
}

/// Keyword + filter search over conversations and messages.
///
/// Generic over the instant type driving the keyword debounce.
pub struct SearchController<I = Instant> {
    sdk: Arc<dyn ChatSdk>,
    me: User,
    config: SearchConfig,
    keyword: String,
    filters: FilterSet,
    debouncer: Debouncer<I>,
    /// Restrict message results to one conversation.
    peer: Option<Peer>,
    conversations: Section<Conversation>,
    messages: Section<Message>,
    subscription: Option<Subscription<ChatEvent>>,
    on_error: ErrorHandler,
}

impl<I> std::fmt::Debug for SearchController<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("keyword", &self.keyword)
            .field("filters", &self.filters)
            .field("conversations", &self.conversations.state.len())
            .field("messages", &self.messages.state.len())
            .finish_non_exhaustive()
    }
}

impl<I> SearchController<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create an idle search. Both sections show `Empty` until a valid query
    /// is submitted.
    ///
    /// # Errors
    ///
    /// [`ChatError::NotLoggedIn`] if the SDK has no logged-in user.
    pub fn new(sdk: Arc<dyn ChatSdk>, config: SearchConfig) -> Result<Self, ChatError> {
        let me = sdk.logged_in_user().ok_or(ChatError::NotLoggedIn)?;
        let debouncer = Debouncer::new(config.debounce());
        Ok(Self {
            sdk,
            me,
            config,
            keyword: String::new(),
            filters: FilterSet::new(),
            debouncer,
            peer: None,
            conversations: Section::idle(),
            messages: Section::idle(),
            subscription: None,
            on_error: log_errors(),
        })
    }

    /// Search messages of one conversation only. Conversation results are
    /// not searched.
    #[must_use]
    pub fn within(mut self, peer: Peer) -> Self {
        self.peer = Some(peer);
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
        self.subscription = Some(bus.subscribe("search"));
    }

    /// Stop receiving events.
    pub fn detach(&mut self) {
        self.subscription = None;
    }

    /// Submitted keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Active filters.
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Conversation results.
    pub fn conversations(&self) -> &Arc<ListState<Conversation>> {
        &self.conversations.state
    }

    /// Message results.
    pub fn messages(&self) -> &Arc<ListState<Message>> {
        &self.messages.state
    }

    /// Sections the current filters search.
    pub fn scopes(&self) -> SearchScopes {
        let mut scopes = self.filters.scopes();
        if self.peer.is_some() {
            scopes.conversations = false;
        }
        scopes
    }

    /// Record a keystroke. The keyword is submitted once input pauses for
    /// the configured delay; see [`Self::poll`].
    pub fn input(&mut self, keyword: impl Into<String>, now: I) {
        self.debouncer.input(keyword, now);
    }

    /// When the pending keyword will be submitted.
    pub fn deadline(&self) -> Option<I> {
        self.debouncer.deadline()
    }

    /// Submit the pending keyword if input paused long enough.
    ///
    /// Returns the tickets of the new query; empty if nothing was due.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if a query is rejected.
    pub fn poll(&mut self, now: I) -> Result<Vec<SearchTicket>, ChatError> {
        match self.debouncer.poll(now) {
            Some(keyword) => {
                self.keyword = keyword;
                self.submit()
            },
            None => Ok(Vec::new()),
        }
    }

    /// Turn `filter` on or off and search again right away, including any
    /// keyword still waiting for its debounce.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if a query is rejected.
    pub fn toggle_filter(&mut self, filter: SearchFilter) -> Result<Vec<SearchTicket>, ChatError> {
        self.filters.toggle(filter);
        if let Some(keyword) = self.debouncer.flush() {
            self.keyword = keyword;
        }
        self.submit()
    }

    /// Replace the keyword and search right away.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if a query is rejected.
    pub fn set_keyword(
        &mut self,
        keyword: impl Into<String>,
    ) -> Result<Vec<SearchTicket>, ChatError> {
        self.debouncer.flush();
        self.keyword = keyword.into();
        self.submit()
    }

    /// Start the current query over.
    ///
    /// An invalid query clears both sections to `Empty` without asking the
    /// SDK. Otherwise every searched section restarts in `Loading` and gets a
    /// first-page ticket; sections outside the scope are cleared.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidRequest`] if a query is rejected. The error is
    /// also reported to the error handler.
    pub fn submit(&mut self) -> Result<Vec<SearchTicket>, ChatError> {
        if !is_valid_query(&self.keyword, &self.filters) {
            tracing::debug!(keyword = %self.keyword, "incomplete search query, clearing results");
            self.conversations.clear();
            self.messages.clear();
            return Ok(Vec::new());
        }

        let scopes = self.scopes();
        let mut tickets = Vec::with_capacity(2);

        if scopes.conversations {
            let query = self.conversation_query();
            query.validate().inspect_err(|e| self.report(e))?;
            let request = share(self.sdk.conversations_request(&query));
            tickets.push(SearchTicket::Conversations(self.conversations.restart(request)));
        } else {
            self.conversations.clear();
        }

        if scopes.messages {
            let query = self.message_query();
            query.validate().inspect_err(|e| self.report(e))?;
            let request = share(self.sdk.messages_request(&query));
            tickets.push(SearchTicket::Messages(self.messages.restart(request)));
        } else {
            self.messages.clear();
        }

        tracing::debug!(
            keyword = %self.keyword,
            filters = ?self.filters,
            ?scopes,
            "search submitted"
        );
        Ok(tickets)
    }

    /// Ticket for the next page of conversation results. `None` when there
    /// is no active query or no more results, and while the previous page is
    /// unapplied.
    pub fn more_conversations(&mut self) -> Option<SearchTicket> {
        self.conversations.next().map(SearchTicket::Conversations)
    }

    /// Ticket for the next page of message results. `None` when there is no
    /// active query or no more results, and while the previous page is
    /// unapplied.
    pub fn more_messages(&mut self) -> Option<SearchTicket> {
        self.messages.next().map(SearchTicket::Messages)
    }

    /// Apply a finished page.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure after reporting it to the error handler.
    pub fn apply(&mut self, completion: SearchCompletion) -> Result<FetchOutcome, ChatError> {
        let result = match completion {
            SearchCompletion::Conversations(completion) => self.conversations.apply(completion),
            SearchCompletion::Messages(completion) => self.messages.apply(completion),
        };
        result.inspect_err(|e| self.report(e))
    }

    /// Submit the current query and apply every first page.
    ///
    /// # Errors
    ///
    /// The first failure, after every section was applied. Each failure is
    /// reported to the error handler.
    pub async fn search(&mut self) -> Result<(), ChatError> {
        let tickets = self.submit()?;
        let mut first_error = None;
        for ticket in tickets {
            let completion = ticket.run().await;
            if let Err(error) = self.apply(completion) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Handle every pending bus event.
    pub fn pump(&mut self) -> Vec<Effect> {
        let events = match self.subscription.as_mut() {
            Some(subscription) => subscription.drain(),
            None => return Vec::new(),
        };
        let mut effects = Vec::new();
        for event in &events {
            if self.handle(event) {
                push_render(&mut effects);
            }
        }
        effects
    }

    /// Keep results in step with deletes and edits. Returns `true` if any
    /// section changed.
    pub fn handle(&mut self, event: &ChatEvent) -> bool {
        match event {
            ChatEvent::Sdk(SdkEvent::MessageEdited { message })
            | ChatEvent::Ui(UiEvent::MessageEdited { message }) => {
                self.messages.dispatch(ListAction::Replace { item: message.clone() })
            },
            ChatEvent::Sdk(SdkEvent::MessageDeleted { message })
            | ChatEvent::Ui(UiEvent::MessageDeleted { message }) => {
                self.messages.dispatch(ListAction::Remove { key: message.key() })
            },
            ChatEvent::Ui(UiEvent::ConversationDeleted { conversation }) => {
                let removed_conversation =
                    self.conversations.dispatch(ListAction::Remove { key: conversation.key() });
                let peer = conversation.peer();
                let me = self.me.uid.clone();
                let stale: Vec<_> = self
                    .messages
                    .state
                    .items()
                    .iter()
                    .filter(|m| m.peer(&me) == peer)
                    .map(Message::key)
                    .collect();
                let mut removed_messages = false;
                for key in stale {
                    removed_messages |= self.messages.dispatch(ListAction::Remove { key });
                }
                removed_conversation || removed_messages
            },
            _ => false,
        }
    }

    fn conversation_query(&self) -> ConversationQuery {
        let mut query = ConversationQuery::new(self.config.conversations_limit)
            .unread_only(self.filters.unread_only());
        if !self.keyword.trim().is_empty() {
            query = query.keyword(self.keyword.trim());
        }
        if self.filters.groups_only() {
            query = query.conversation_type(ReceiverType::Group);
        }
        query
    }

    fn message_query(&self) -> MessageQuery {
        let mut query = MessageQuery::new(self.config.messages_limit)
            .media(self.filters.media())
            .has_links(self.filters.has_links());
        if !self.keyword.trim().is_empty() {
            query = query.keyword(self.keyword.trim());
        }
        if let Some(peer) = &self.peer {
            query = query.peer(peer.clone());
        }
        query
    }

    fn report(&self, error: &ChatError) {
        (self.on_error)(error);
    }
}
