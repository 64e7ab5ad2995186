//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use chatkit_app::FetchState;

use super::{Invariant, InvariantResult, ViewSnapshot, Violation};

/// A conversation list holds at most one row per peer.
///
/// Duplicate rows mean a page or an activity event was merged without
/// checking existing keys.
pub struct UniqueConversations;

impl Invariant for UniqueConversations {
    fn name(&self) -> &'static str {
        "unique_conversations"
    }

    fn check(&self, state: &ViewSnapshot) -> InvariantResult {
        for list in &state.conversation_lists {
            let mut seen = HashSet::new();
            for row in &list.rows {
                if !seen.insert(&row.peer) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{}: {} listed twice", list.label, row.peer),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A message list holds at most one row per message key.
///
/// An optimistic send and its server echo must collapse into one row.
pub struct UniqueMessages;

impl Invariant for UniqueMessages {
    fn name(&self) -> &'static str {
        "unique_messages"
    }

    fn check(&self, state: &ViewSnapshot) -> InvariantResult {
        for list in &state.message_lists {
            let mut seen = HashSet::new();
            for row in &list.rows {
                if !seen.insert(row.key()) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{}: {:?} listed twice", list.label, row.key()),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Outside of `Loading`, the fetch state agrees with the contents.
///
/// `Empty` and `Error` lists have no rows; `Loaded` lists have some.
pub struct FetchStateMatchesContents;

impl FetchStateMatchesContents {
    fn agrees(fetch_state: FetchState, len: usize) -> bool {
        match fetch_state {
            FetchState::Loading => true,
            FetchState::Loaded => len > 0,
            FetchState::Empty | FetchState::Error => len == 0,
        }
    }
}

impl Invariant for FetchStateMatchesContents {
    fn name(&self) -> &'static str {
        "fetch_state_matches_contents"
    }

    fn check(&self, state: &ViewSnapshot) -> InvariantResult {
        let lists = state
            .conversation_lists
            .iter()
            .map(|l| (&l.label, l.fetch_state, l.rows.len()))
            .chain(state.message_lists.iter().map(|l| (&l.label, l.fetch_state, l.rows.len())));

        for (label, fetch_state, len) in lists {
            if !Self::agrees(fetch_state, len) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{label}: {fetch_state:?} with {len} rows"),
                });
            }
        }
        Ok(())
    }
}

/// A message that was read was also delivered.
pub struct ReadImpliesDelivered;

impl Invariant for ReadImpliesDelivered {
    fn name(&self) -> &'static str {
        "read_implies_delivered"
    }

    fn check(&self, state: &ViewSnapshot) -> InvariantResult {
        for list in &state.message_lists {
            let offending =
                list.rows.iter().find(|r| r.read_at.is_some() && r.delivered_at.is_none());
            if let Some(row) = offending {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{}: message {} read but not delivered", list.label, row.id),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chatkit_core::Peer;

    use super::*;
    use crate::invariants::{
        ConversationListSnapshot, ConversationRow, MessageListSnapshot, MessageRow,
    };

    fn conversation_row(uid: &str, unread: u32) -> ConversationRow {
        ConversationRow { peer: Peer::user(uid), last_message_id: 1, unread }
    }

    fn message_row(id: u64) -> MessageRow {
        MessageRow { id, muid: String::new(), sent_at: None, delivered_at: None, read_at: None }
    }

    fn conversations(rows: Vec<ConversationRow>) -> ViewSnapshot {
        ViewSnapshot::empty().with_conversations(ConversationListSnapshot {
            label: "test".into(),
            fetch_state: FetchState::Loaded,
            rows,
            ..Default::default()
        })
    }

    #[test]
    fn duplicate_peer_is_violation() {
        let snapshot = conversations(vec![conversation_row("bob", 0), conversation_row("bob", 1)]);
        let result = UniqueConversations.check(&snapshot);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().invariant, "unique_conversations");
    }

    #[test]
    fn duplicate_message_key_is_violation() {
        let snapshot = ViewSnapshot::empty().with_messages(MessageListSnapshot {
            label: "user:bob".into(),
            fetch_state: FetchState::Loaded,
            rows: vec![message_row(3), message_row(3)],
        });
        assert!(UniqueMessages.check(&snapshot).is_err());
    }

    #[test]
    fn loaded_empty_list_is_violation() {
        let snapshot = conversations(Vec::new());
        assert!(FetchStateMatchesContents.check(&snapshot).is_err());
    }

    #[test]
    fn loading_list_may_have_any_contents() {
        let mut snapshot = conversations(vec![conversation_row("bob", 0)]);
        snapshot.conversation_lists[0].fetch_state = FetchState::Loading;
        assert!(FetchStateMatchesContents.check(&snapshot).is_ok());
    }

    #[test]
    fn read_without_delivery_is_violation() {
        let mut row = message_row(4);
        row.read_at = Some(10);
        let snapshot = ViewSnapshot::empty().with_messages(MessageListSnapshot {
            label: "user:bob".into(),
            fetch_state: FetchState::Loaded,
            rows: vec![row],
        });
        assert!(ReadImpliesDelivered.check(&snapshot).is_err());
    }
}
