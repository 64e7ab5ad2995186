//! List reconciliation for chat views
//!
//! Pure reducers and single-owner controllers that keep conversation lists,
//! message lists and search results consistent with a live event stream,
//! paginated SDK queries and optimistic local sends.
//!
//! # Components
//!
//! - [`ConversationsController`]: conversation list (reorder on activity,
//!   unread counts, typing, receipts, presence)
//! - [`MessageListController`]: messages of one conversation or thread
//! - [`SearchController`]: debounced keyword + filter search
//! - [`Paginator`] and [`FetchTicket`]: last-issued-wins pagination
//! - [`EventBus`]: typed broadcast bus with scoped [`Subscription`]s
//! - [`presentation`]: row labels and icons
//! - [`PlaybackContext`]: at most one active audio player
//!
//! Reducers never mutate their input and return the same `Arc` when nothing
//! changed, so hosts can skip re-rendering with [`std::sync::Arc::ptr_eq`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bus;
pub mod config;
pub mod conversations;
pub mod debounce;
pub mod effect;
pub mod error;
pub mod fetch;
pub mod list;
pub mod messages;
pub mod playback;
pub mod presentation;
pub mod rules;
pub mod search;
pub mod typing;

pub use bus::{EventBus, Subscription};
pub use config::{ChatKitConfig, ConversationsConfig, MessageListConfig, SearchConfig};
pub use conversations::{ConversationsAction, ConversationsController, ConversationsState};
pub use debounce::Debouncer;
pub use effect::Effect;
pub use error::{ConfigError, ErrorHandler, log_errors};
pub use fetch::{
    FetchCompletion, FetchMode, FetchOutcome, FetchState, FetchTicket, FetchToken, Paginator,
    ReconnectGuard, Resolution,
};
pub use list::{Keyed, ListAction, ListState, reduce_list};
pub use messages::{MessageListAction, MessageListController, MessageListState};
pub use playback::{PlaybackContext, Player};
pub use rules::UpdateRules;
pub use search::{
    FilterSet, SearchCompletion, SearchController, SearchFilter, SearchScopes, SearchTicket,
    is_valid_query,
};
pub use typing::TypingIndicatorMap;
