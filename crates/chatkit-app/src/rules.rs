//! Which messages move a conversation to the top.

use chatkit_core::{Message, MessageKind};
use serde::{Deserialize, Serialize};

/// Gate deciding whether a message updates its conversation's last message
/// and unread count.
///
/// Custom messages and group actions are suppressed unless enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRules {
    /// Thread replies update the conversation.
    pub update_on_replies: bool,
    /// Custom messages update the conversation.
    pub update_on_custom_messages: bool,
    /// Group membership actions update the conversation.
    pub update_on_group_actions: bool,
    /// Call activity updates the conversation.
    pub update_on_call_activities: bool,
}

impl Default for UpdateRules {
    fn default() -> Self {
        Self {
            update_on_replies: true,
            update_on_custom_messages: false,
            update_on_group_actions: false,
            update_on_call_activities: true,
        }
    }
}

impl UpdateRules {
    /// Rules that let every message through.
    pub fn permissive() -> Self {
        Self {
            update_on_replies: true,
            update_on_custom_messages: true,
            update_on_group_actions: true,
            update_on_call_activities: true,
        }
    }

    /// Check if `message` should update its conversation.
    pub fn should_update(&self, message: &Message) -> bool {
        if message.is_reply() && !self.update_on_replies {
            return false;
        }
        match message.kind {
            MessageKind::Text { .. } | MessageKind::Media { .. } => true,
            MessageKind::Custom { .. } => self.update_on_custom_messages,
            MessageKind::Action(_) => self.update_on_group_actions,
            MessageKind::Call(_) => self.update_on_call_activities,
        }
    }
}

#[cfg(test)]
mod tests {
    use chatkit_core::{ChatTarget, User};

    use super::*;

    fn custom() -> Message {
        Message::new(
            1,
            User::new("bob", "Bob"),
            ChatTarget::User(User::new("alice", "Alice")),
            MessageKind::Custom { custom_type: "extension_poll".into(), data: Default::default() },
        )
    }

    #[test]
    fn custom_messages_are_suppressed_by_default() {
        assert!(!UpdateRules::default().should_update(&custom()));
        assert!(UpdateRules::permissive().should_update(&custom()));
    }

    #[test]
    fn replies_follow_reply_rule() {
        let mut reply = Message::text(
            2,
            User::new("bob", "Bob"),
            ChatTarget::User(User::new("alice", "Alice")),
            "in thread",
        );
        reply.parent_id = Some(1);

        let rules = UpdateRules { update_on_replies: false, ..UpdateRules::default() };
        assert!(!rules.should_update(&reply));
        assert!(UpdateRules::default().should_update(&reply));
    }
}
