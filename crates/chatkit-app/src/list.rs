//! Keyed, ordered list state shared by every view.
//!
//! Conversations, messages and both search sections are all "a list of items
//! with unique keys plus a fetch state". [`ListState`] owns that shape and the
//! mutations the reducers compose; [`reduce_list`] is the plain reducer used
//! by views with no extra state.

use std::{collections::HashSet, fmt::Debug, hash::Hash, sync::Arc};

use chatkit_core::{Conversation, Message, MessageKey, Peer};

use crate::fetch::FetchState;

/// Item with a stable list key.
pub trait Keyed {
    /// Key type. Unique within a list.
    type Key: Clone + Eq + Hash + Debug;

    /// Key of this item.
    fn key(&self) -> Self::Key;
}

/// Conversations are keyed by peer. Conversations created from a live
/// message carry a locally derived ID until the SDK's copy arrives.
impl Keyed for Conversation {
    type Key = Peer;

    fn key(&self) -> Peer {
        self.peer()
    }
}

impl Keyed for Message {
    type Key = MessageKey;

    fn key(&self) -> MessageKey {
        Message::key(self)
    }
}

/// Ordered list of uniquely keyed items with a fetch state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState<T> {
    items: Vec<T>,
    fetch_state: FetchState,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListState<T> {
    /// Empty list waiting for its first page.
    pub fn new() -> Self {
        Self { items: Vec::new(), fetch_state: FetchState::Loading }
    }

    /// Empty list with an explicit fetch state.
    pub fn with_fetch_state(fetch_state: FetchState) -> Self {
        Self { items: Vec::new(), fetch_state }
    }

    /// Items in display order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Current fetch state.
    pub fn fetch_state(&self) -> FetchState {
        self.fetch_state
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    /// Set the fetch state, reconciled with the list contents.
    ///
    /// Returns `true` if the state changed.
    pub(crate) fn set_fetch_state(&mut self, fetch_state: FetchState) -> bool {
        let next = fetch_state.reconcile(self.items.len());
        let changed = next != self.fetch_state;
        self.fetch_state = next;
        changed
    }

    /// Re-derive the fetch state after the contents changed.
    pub(crate) fn settle(&mut self) {
        self.fetch_state = self.fetch_state.reconcile(self.items.len());
    }
}

impl<T: Keyed> ListState<T> {
    /// Position of the item with `key`.
    pub fn position(&self, key: &T::Key) -> Option<usize> {
        self.items.iter().position(|item| &item.key() == key)
    }

    /// Item with `key`.
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| &item.key() == key)
    }

    /// Check if an item with `key` is present.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.position(key).is_some()
    }

    /// Append items not already present, preserving their order.
    ///
    /// Returns the number of items inserted.
    pub(crate) fn append(&mut self, incoming: Vec<T>) -> usize {
        let fresh = self.unseen(incoming);
        let inserted = fresh.len();
        self.items.extend(fresh);
        self.settle();
        inserted
    }

    /// Insert items not already present ahead of the current items.
    ///
    /// Returns the number of items inserted.
    pub(crate) fn prepend(&mut self, incoming: Vec<T>) -> usize {
        let mut fresh = self.unseen(incoming);
        let inserted = fresh.len();
        fresh.append(&mut self.items);
        self.items = fresh;
        self.settle();
        inserted
    }

    /// Replace the whole list, dropping duplicates in `incoming`.
    pub(crate) fn replace_all(&mut self, incoming: Vec<T>) {
        self.items.clear();
        let fresh = self.unseen(incoming);
        self.items = fresh;
        self.settle();
    }

    /// Remove the item with `key`.
    pub(crate) fn remove(&mut self, key: &T::Key) -> Option<T> {
        let index = self.position(key)?;
        let removed = self.items.remove(index);
        self.settle();
        Some(removed)
    }

    /// Replace the item with the same key as `item`, in place.
    ///
    /// Returns `false` if no such item is present.
    pub(crate) fn replace(&mut self, item: T) -> bool {
        match self.position(&item.key()) {
            Some(index) => {
                self.items[index] = item;
                true
            },
            None => false,
        }
    }

    /// Replace the item at `index` with `item` and move it to the front.
    ///
    /// Other items keep their relative order.
    pub(crate) fn move_to_front(&mut self, index: usize, item: T) {
        self.items.remove(index);
        self.items.insert(0, item);
    }

    /// Insert `item` at the front. The caller guarantees its key is absent.
    pub(crate) fn push_front(&mut self, item: T) {
        self.items.insert(0, item);
        self.settle();
    }

    /// Filter `incoming` down to items whose keys are neither in the list nor
    /// earlier in `incoming`.
    fn unseen(&self, incoming: Vec<T>) -> Vec<T> {
        let mut seen: HashSet<T::Key> = self.items.iter().map(Keyed::key).collect();
        incoming.into_iter().filter(|item| seen.insert(item.key())).collect()
    }
}

/// Mutations shared by every list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListAction<T: Keyed> {
    /// Add a fetched page at the end. With `replace`, the page replaces the
    /// current contents (reconnect refetch).
    Append {
        /// Page items.
        items: Vec<T>,
        /// Replace instead of appending.
        replace: bool,
    },
    /// Add items at the front (older message pages).
    Prepend {
        /// Page items.
        items: Vec<T>,
    },
    /// Remove an item.
    Remove {
        /// Key of the item to remove.
        key: T::Key,
    },
    /// Replace an item in place.
    Replace {
        /// New version of the item.
        item: T,
    },
    /// Transition the fetch state.
    SetFetchState(FetchState),
}

/// Apply `action` to `state`.
///
/// Returns `true` if the state changed.
pub(crate) fn apply_list<T: Keyed>(state: &mut ListState<T>, action: ListAction<T>) -> bool {
    match action {
        ListAction::Append { items, replace: true } => {
            state.replace_all(items);
            true
        },
        ListAction::Append { items, replace: false } => state.append(items) > 0,
        ListAction::Prepend { items } => state.prepend(items) > 0,
        ListAction::Remove { key } => state.remove(&key).is_some(),
        ListAction::Replace { item } => state.replace(item),
        ListAction::SetFetchState(fetch_state) => state.set_fetch_state(fetch_state),
    }
}

/// Reduce a plain list.
///
/// Never mutates `state`. Returns the same `Arc` when the action is a no-op.
pub fn reduce_list<T>(state: &Arc<ListState<T>>, action: ListAction<T>) -> Arc<ListState<T>>
where
    T: Keyed + Clone,
{
    let mut next = ListState::clone(state);
    if apply_list(&mut next, action) { Arc::new(next) } else { Arc::clone(state) }
}
