//! Scenario execution.
//!
//! Views share one [`EventBus`]. Each scenario event is published, every
//! view pumps its subscription, and the effects they return are executed
//! right away against the scripted SDK, the way a host application's event
//! loop would.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

use chatkit_app::{
    ConversationsController, Effect, ErrorHandler, EventBus, FetchOutcome, FetchState,
    MessageListController, SearchConfig, SearchController, SearchFilter, TypingIndicatorMap,
    presentation::{self, ReceiptIcon, Subtitle},
};
use chatkit_core::{ChatError, ChatEvent, Conversation, Message, MessageId, Peer};
use chatkit_harness::ScriptedSdk;
use serde::Serialize;

use crate::{
    error::ReplayError,
    scenario::{Scenario, SearchScript},
};

/// One conversation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationLine {
    /// Who the conversation is with.
    pub peer: Peer,
    /// User or group name.
    pub title: String,
    /// Typing indicator or last message preview.
    pub subtitle: Subtitle,
    /// Unread messages.
    pub unread: u32,
    /// Open in the message view.
    pub active: bool,
}

/// One message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageLine {
    /// Server ID, 0 while sending.
    pub id: MessageId,
    /// Sender name, "You" for own messages.
    pub sender: String,
    /// Preview text.
    pub preview: String,
    /// Delivery state of own messages.
    pub receipt: Option<ReceiptIcon>,
    /// Thread replies.
    pub replies: u32,
}

/// Search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    /// Submitted keyword.
    pub keyword: String,
    /// Active filters.
    pub filters: Vec<SearchFilter>,
    /// Conversation section state.
    pub conversations_state: FetchState,
    /// Conversation results.
    pub conversations: Vec<ConversationLine>,
    /// Message section state.
    pub messages_state: FetchState,
    /// Message results.
    pub messages: Vec<MessageLine>,
}

/// Counters collected while replaying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Events published.
    pub events: usize,
    /// Render effects returned by the views.
    pub renders: usize,
    /// Messages acknowledged as delivered.
    pub delivered: Vec<MessageId>,
    /// Messages acknowledged as read.
    pub read: Vec<MessageId>,
    /// Failures reported to the error handler.
    pub errors: usize,
}

/// Final state of every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Conversation list state.
    pub conversations_state: FetchState,
    /// Conversation list rows.
    pub conversations: Vec<ConversationLine>,
    /// Conversation shown in the message view.
    pub open: Option<Peer>,
    /// Message list state, if a conversation is open.
    pub messages_state: Option<FetchState>,
    /// Message list rows.
    pub messages: Vec<MessageLine>,
    /// Search results, if the scenario searched.
    pub search: Option<SearchReport>,
    /// Counters.
    pub stats: Stats,
}

/// Run `scenario` to completion.
///
/// # Errors
///
/// [`ReplayError::Chat`] if a view cannot be created or rejects its query.
/// Page and receipt failures are reported to the views' error handler and
/// counted in [`Stats::errors`] instead.
pub async fn replay(scenario: Scenario) -> Result<Report, ReplayError> {
    let Scenario { me, config, open, conversation_pages, message_pages, events, search } =
        scenario;

    let sdk = ScriptedSdk::new(me.clone());
    for page in conversation_pages {
        sdk.push_conversations(page);
    }
    for page in message_pages {
        sdk.push_messages(page);
    }

    let errors = Arc::new(AtomicUsize::new(0));
    let on_error = counting_handler(&errors);
    let bus = EventBus::<ChatEvent>::default();

    let mut conversations = ConversationsController::new(sdk.shared(), config.conversations)?
        .with_error_handler(Arc::clone(&on_error));
    conversations.attach(&bus);
    loop {
        match conversations.fetch_next().await {
            Ok(FetchOutcome::Exhausted | FetchOutcome::InFlight) | Err(_) => break,
            Ok(_) => {},
        }
    }

    let mut messages = match &open {
        Some(peer) => {
            let mut controller =
                MessageListController::new(sdk.shared(), peer.clone(), config.messages)?
                    .with_error_handler(Arc::clone(&on_error));
            controller.attach(&bus);
            loop {
                match controller.fetch_next().await {
                    Ok(FetchOutcome::Exhausted | FetchOutcome::InFlight) | Err(_) => break,
                    Ok(_) => {},
                }
            }
            conversations.select(Some(peer.clone()));
            Some(controller)
        },
        None => None,
    };

    let mut stats = Stats::default();
    for event in events {
        bus.publish(event);
        stats.events += 1;

        let effects = conversations.pump();
        stats.renders += count_renders(&effects);
        conversations.execute(effects).await;

        if let Some(controller) = messages.as_mut() {
            let effects = controller.pump();
            stats.renders += count_renders(&effects);
            controller.execute(effects).await;
        }
    }
    tracing::info!(events = stats.events, renders = stats.renders, "events replayed");

    let search = match search {
        Some(script) => Some(run_search(&sdk, &me.uid, config.search, script, on_error).await?),
        None => None,
    };

    let me = me.uid;
    let conversations_state = conversations.state();
    let typing = conversations_state.typing();
    let active = conversations_state.active();
    let conversation_lines = conversations_state
        .conversations()
        .iter()
        .map(|c| conversation_line(c, typing, active, &me))
        .collect();

    let (messages_state, message_lines) = match &messages {
        Some(controller) => {
            let state = controller.state();
            let lines = state.messages().iter().map(|m| message_line(m, &me)).collect();
            (Some(state.fetch_state()), lines)
        },
        None => (None, Vec::new()),
    };

    stats.delivered = sdk.delivered();
    stats.read = sdk.read();
    stats.errors = errors.load(Ordering::Relaxed);

    Ok(Report {
        conversations_state: conversations_state.fetch_state(),
        conversations: conversation_lines,
        open,
        messages_state,
        messages: message_lines,
        search,
        stats,
    })
}

async fn run_search(
    sdk: &ScriptedSdk,
    me: &str,
    config: SearchConfig,
    script: SearchScript,
    on_error: ErrorHandler,
) -> Result<SearchReport, ReplayError> {
    let SearchScript { keyword, filters, within, conversation_pages, message_pages } = script;
    for page in conversation_pages {
        sdk.push_conversations(page);
    }
    for page in message_pages {
        sdk.push_messages(page);
    }

    let mut search: SearchController<Instant> =
        SearchController::new(sdk.shared(), config)?.with_error_handler(on_error);
    if let Some(peer) = within {
        search = search.within(peer);
    }

    // Every submit supersedes the previous one; only the last tickets are
    // current.
    search.input(keyword, Instant::now());
    let mut tickets = Vec::new();
    for filter in filters {
        tickets = search.toggle_filter(filter)?;
    }
    if let Some(deadline) = search.deadline() {
        tickets = search.poll(deadline)?;
    }

    for ticket in tickets {
        // Failures are counted by the error handler.
        let _ = search.apply(ticket.run().await);
    }
    while let Some(ticket) = search.more_conversations().or_else(|| search.more_messages()) {
        if search.apply(ticket.run().await).is_err() {
            break;
        }
    }

    let no_typing = TypingIndicatorMap::new();
    Ok(SearchReport {
        keyword: search.keyword().to_owned(),
        filters: search.filters().iter().collect(),
        conversations_state: search.conversations().fetch_state(),
        conversations: search
            .conversations()
            .items()
            .iter()
            .map(|c| conversation_line(c, &no_typing, None, me))
            .collect(),
        messages_state: search.messages().fetch_state(),
        messages: search.messages().items().iter().map(|m| message_line(m, me)).collect(),
    })
}

fn conversation_line(
    conversation: &Conversation,
    typing: &TypingIndicatorMap,
    active: Option<&Peer>,
    me: &str,
) -> ConversationLine {
    let peer = conversation.peer();
    ConversationLine {
        active: active == Some(&peer),
        peer,
        title: conversation.with.name().to_owned(),
        subtitle: presentation::conversation_subtitle(conversation, typing, me),
        unread: conversation.unread_count,
    }
}

fn message_line(message: &Message, me: &str) -> MessageLine {
    let sent_by_me = message.is_sent_by(me);
    MessageLine {
        id: message.id,
        sender: if sent_by_me { "You".to_owned() } else { message.sender.name.clone() },
        preview: presentation::message_preview(message, me),
        receipt: sent_by_me.then(|| presentation::receipt_icon(message)),
        replies: message.reply_count,
    }
}

fn count_renders(effects: &[Effect]) -> usize {
    effects.iter().filter(|e| **e == Effect::Render).count()
}

fn counting_handler(count: &Arc<AtomicUsize>) -> ErrorHandler {
    let count = Arc::clone(count);
    Arc::new(move |error: &ChatError| {
        count.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(code = error.code(), %error, "view reported a failure");
    })
}
