//! Pagination bookkeeping.
//!
//! The SDK exposes cursor objects with a `fetch_next` method. This module adds
//! what the views need around them:
//!
//! - [`FetchToken`]s tagging each in-flight page, so a response is applied only
//!   if no newer fetch was issued since (last-issued wins).
//! - At most one page in flight per cursor. A cursor hands out every page
//!   once, so a second ticket on it would make the first one's page stale and
//!   lose it. Only a fresh cursor (refetch, new query) supersedes a pending
//!   ticket.
//! - Cumulative totals deciding between `Empty` and `Loaded`.
//! - Error policy: failing with an empty list shows `Error`, failing after
//!   content was loaded keeps the content.
//! - [`ReconnectGuard`], arming a full refetch after the connection returns.
//!
//! [`Paginator`] is a pure state machine. [`FetchTicket`] is the only part that
//! performs I/O, by running the shared SDK cursor.

use std::{fmt, sync::Arc};

use chatkit_core::{ChatError, PagedRequest};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// What a list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    /// First page is being fetched.
    #[default]
    Loading,
    /// Content is available.
    Loaded,
    /// Nothing matched.
    Empty,
    /// The first page failed.
    Error,
}

impl FetchState {
    /// Reconcile this state with a list of `len` items.
    ///
    /// `Loading` is kept as is. Otherwise a non-empty list is always `Loaded`,
    /// and a `Loaded` list that became empty is `Empty`.
    pub fn reconcile(self, len: usize) -> Self {
        match (self, len) {
            (Self::Loading, _) => Self::Loading,
            (Self::Loaded, 0) => Self::Empty,
            (Self::Empty | Self::Error, n) if n > 0 => Self::Loaded,
            (state, _) => state,
        }
    }
}

/// Opaque tag of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchToken(u64);

impl fmt::Display for FetchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch-{}", self.0)
    }
}

/// How a fetched page is merged into the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Next page goes after the current items.
    Append,
    /// Page replaces the current items (reconnect refetch, new query).
    Replace,
    /// Page goes before the current items (older messages).
    Prepend,
}

/// Result of resolving a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// A newer fetch was issued; drop the response.
    Stale,
    /// Merge `items` and move to `fetch_state`.
    Apply {
        /// Page items.
        items: Vec<T>,
        /// State after merging.
        fetch_state: FetchState,
    },
    /// The fetch failed; move to `fetch_state` and report `error`.
    Failed {
        /// The failure.
        error: ChatError,
        /// State after the failure.
        fetch_state: FetchState,
    },
}

/// Pagination state machine for one list.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    /// Last issued token number.
    issued: u64,
    /// Token whose response will be applied. `None` when nothing is pending
    /// or the paginator was reset.
    current: Option<FetchToken>,
    /// Items received since the last reset.
    total: usize,
    /// The cursor returned an empty page.
    exhausted: bool,
}

impl Paginator {
    /// Fresh paginator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a new fetch, superseding any pending one.
    ///
    /// On an unchanged cursor, only issue when nothing is
    /// [pending](Self::is_pending). After a [`reset`](Self::reset), the new
    /// cursor's token supersedes the old one.
    pub fn issue(&mut self) -> FetchToken {
        self.issued += 1;
        let token = FetchToken(self.issued);
        self.current = Some(token);
        token
    }

    /// Start over for a new query. Pending fetches become stale.
    pub fn reset(&mut self) {
        self.current = None;
        self.total = 0;
        self.exhausted = false;
    }

    /// Check if `token` is the one whose response will be applied.
    pub fn is_current(&self, token: FetchToken) -> bool {
        self.current == Some(token)
    }

    /// Check if a fetch is pending.
    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }

    /// Items received since the last reset.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Check if more pages may be available.
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// Outcome of a fetch that was not issued.
    pub fn skipped(&self) -> FetchOutcome {
        if self.exhausted { FetchOutcome::Exhausted } else { FetchOutcome::InFlight }
    }

    /// Resolve a completed fetch against the current state.
    ///
    /// `current_len` is the list length at resolution time; it decides
    /// whether a failure is shown or swallowed.
    pub fn resolve<T>(
        &mut self,
        token: FetchToken,
        result: Result<Vec<T>, ChatError>,
        current_len: usize,
        current_state: FetchState,
    ) -> Resolution<T> {
        if !self.is_current(token) {
            tracing::debug!(%token, "dropping stale page");
            return Resolution::Stale;
        }
        self.current = None;

        match result {
            Ok(items) => {
                if items.is_empty() {
                    self.exhausted = true;
                }
                self.total += items.len();
                let fetch_state =
                    if self.total == 0 { FetchState::Empty } else { FetchState::Loaded };
                Resolution::Apply { items, fetch_state }
            },
            Err(error) => {
                let fetch_state = if current_len == 0 { FetchState::Error } else { current_state };
                Resolution::Failed { error, fetch_state }
            },
        }
    }
}

/// One-shot reconnect subscription.
///
/// The first successful fetch attaches the reconnect listener; afterwards a
/// restored connection triggers a full refetch.
#[derive(Debug, Clone)]
pub struct ReconnectGuard {
    attach_on_next_success: bool,
    armed: bool,
}

impl Default for ReconnectGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectGuard {
    /// Guard that attaches on the next successful fetch.
    pub fn new() -> Self {
        Self { attach_on_next_success: true, armed: false }
    }

    /// Record a successful fetch.
    pub fn on_success(&mut self) {
        if self.attach_on_next_success {
            self.attach_on_next_success = false;
            self.armed = true;
        }
    }

    /// Check if a restored connection should trigger a refetch.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Cursor shared between a view and its in-flight tickets.
pub type SharedRequest<T> = Arc<Mutex<Box<dyn PagedRequest<T>>>>;

/// Wrap an SDK cursor for sharing with tickets.
pub fn share<T: Send>(request: Box<dyn PagedRequest<T>>) -> SharedRequest<T> {
    Arc::new(Mutex::new(request))
}

/// A fetch ready to run.
///
/// A ticket must be run and its completion applied before the view issues
/// another ticket on the same cursor. Tickets on different cursors may be run
/// in any order; only the one whose token is still current when its
/// completion is applied changes state.
pub struct FetchTicket<T: Send> {
    token: FetchToken,
    mode: FetchMode,
    request: SharedRequest<T>,
}

impl<T: Send> fmt::Debug for FetchTicket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTicket").field("token", &self.token).field("mode", &self.mode).finish()
    }
}

impl<T: Send> FetchTicket<T> {
    /// Ticket for the next page of `request`.
    pub fn new(token: FetchToken, mode: FetchMode, request: SharedRequest<T>) -> Self {
        Self { token, mode, request }
    }

    /// Token of this fetch.
    pub fn token(&self) -> FetchToken {
        self.token
    }

    /// Merge mode of this fetch.
    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Pull the next page from the cursor.
    pub async fn run(self) -> FetchCompletion<T> {
        let result = self.request.lock().await.fetch_next().await;
        FetchCompletion { token: self.token, mode: self.mode, result }
    }
}

/// A finished fetch, ready to be applied.
#[derive(Debug)]
pub struct FetchCompletion<T> {
    /// Token of the fetch.
    pub token: FetchToken,
    /// Merge mode.
    pub mode: FetchMode,
    /// Page or failure.
    pub result: Result<Vec<T>, ChatError>,
}

/// What applying a completion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was merged; `inserted` new items.
    Applied {
        /// Items that were not already present.
        inserted: usize,
    },
    /// A newer fetch superseded this one; nothing changed.
    Stale,
    /// The cursor is exhausted; no request was made.
    Exhausted,
    /// A page of the same cursor is still in flight; no request was made.
    InFlight,
}
