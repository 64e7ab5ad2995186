//! Live typing indicators keyed by conversation.

use std::collections::HashMap;

use chatkit_core::{Peer, TypingIndicator};

/// Most recent typing indicator per conversation.
///
/// Holds at most one live indicator per peer: a newer start replaces the
/// previous one, and an end removes it only if it comes from the same sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingIndicatorMap {
    indicators: HashMap<Peer, TypingIndicator>,
}

impl TypingIndicatorMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live indicator for `peer`.
    pub fn get(&self, peer: &Peer) -> Option<&TypingIndicator> {
        self.indicators.get(peer)
    }

    /// Number of conversations with someone typing.
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Check if nobody is typing.
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Iterate over live indicators.
    pub fn iter(&self) -> impl Iterator<Item = (&Peer, &TypingIndicator)> {
        self.indicators.iter()
    }

    /// Record a typing start for `peer`.
    ///
    /// Returns `false` if the same indicator was already live.
    pub(crate) fn start(&mut self, peer: Peer, indicator: TypingIndicator) -> bool {
        if self.indicators.get(&peer) == Some(&indicator) {
            return false;
        }
        self.indicators.insert(peer, indicator);
        true
    }

    /// Record a typing end for `peer`.
    ///
    /// In groups, an end from one member does not clear another member who
    /// started typing later. Returns `true` if an indicator was removed.
    pub(crate) fn end(&mut self, peer: &Peer, sender_uid: &str) -> bool {
        match self.indicators.get(peer) {
            Some(live) if live.sender.uid == sender_uid => {
                self.indicators.remove(peer);
                true
            },
            _ => false,
        }
    }

    /// Drop the indicator for `peer`, whoever set it.
    pub(crate) fn clear(&mut self, peer: &Peer) -> bool {
        self.indicators.remove(peer).is_some()
    }
}

#[cfg(test)]
mod tests {
    use chatkit_core::{ChatTarget, Group, User};

    use super::*;

    fn typing(uid: &str, to: ChatTarget) -> TypingIndicator {
        TypingIndicator { sender: User::new(uid, uid), receiver: to, metadata: Default::default() }
    }

    #[test]
    fn start_then_end_removes_entry() {
        let mut map = TypingIndicatorMap::new();
        let peer = Peer::user("bob");
        map.start(peer.clone(), typing("bob", ChatTarget::User(User::new("alice", "Alice"))));
        assert!(map.get(&peer).is_some());

        assert!(map.end(&peer, "bob"));
        assert!(map.get(&peer).is_none());
    }

    #[test]
    fn group_end_from_other_member_keeps_latest_typist() {
        let mut map = TypingIndicatorMap::new();
        let group = ChatTarget::Group(Group::new("g1", "Group"));
        let peer = Peer::group("g1");

        map.start(peer.clone(), typing("bob", group.clone()));
        map.start(peer.clone(), typing("carol", group));
        assert_eq!(map.len(), 1);

        assert!(!map.end(&peer, "bob"));
        assert_eq!(map.get(&peer).map(|i| i.sender.uid.as_str()), Some("carol"));
    }
}
