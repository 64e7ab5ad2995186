//! Builders for test entities.
//!
//! User IDs double as display names (capitalized), so fixtures stay short:
//! `user("bob")` is `Bob`.

use chatkit_core::{
    ChatEvent, ChatTarget, Conversation, Group, GroupAction, MembershipChange, Message,
    MessageId, MessageKind, MessageReceipt, Peer, ReceiptType, SdkEvent, SendStatus, Timestamp,
    TypingIndicator, UiEvent, User,
};

/// User `uid`, named after it.
pub fn user(uid: &str) -> User {
    User::new(uid, display_name(uid))
}

/// Group `guid`, named after it.
pub fn group(guid: &str) -> Group {
    Group::new(guid, display_name(guid))
}

/// Text message from `from` to `to`, sent at `id` seconds.
pub fn text(id: MessageId, from: &str, to: &ChatTarget, body: &str) -> Message {
    let mut message = Message::text(id, user(from), to.clone(), body);
    message.sent_at = Some(sent_at(id));
    message
}

/// Direct text message between two users.
pub fn direct(id: MessageId, from: &str, to: &str, body: &str) -> Message {
    text(id, from, &ChatTarget::User(user(to)), body)
}

/// Text message posted to group `guid`.
pub fn in_group(id: MessageId, from: &str, guid: &str, body: &str) -> Message {
    text(id, from, &ChatTarget::Group(group(guid)), body)
}

/// Unsent message with client id `muid`.
pub fn pending(muid: &str, from: &str, to: &str, body: &str) -> Message {
    let mut message = Message::text(0, user(from), ChatTarget::User(user(to)), body);
    message.muid = muid.to_owned();
    message
}

/// Membership change in `guid`, performed by `actor` on `member`.
pub fn membership(
    id: MessageId,
    actor: &str,
    member: &str,
    guid: &str,
    change: MembershipChange,
) -> Message {
    let action =
        GroupAction { actor: user(actor), member: user(member), change, group: group(guid) };
    let receiver = ChatTarget::Group(group(guid));
    let mut message = Message::new(id, user(actor), receiver, MessageKind::Action(action));
    message.sent_at = Some(sent_at(id));
    message
}

/// Conversation with `target` whose last message is `last`.
pub fn conversation(target: ChatTarget, last: Option<Message>, unread: u32) -> Conversation {
    let id = target.peer().conversation_id();
    let mut conversation = Conversation::new(id, target);
    conversation.updated_at = last.as_ref().and_then(|m| m.sent_at);
    conversation.last_message = last;
    conversation.unread_count = unread;
    conversation
}

/// Conversation with `target` as the SDK returns it for `me`.
///
/// The SDK assigns its own conversation IDs, which never match the ones
/// derived from a peer for conversations created from a live message.
pub fn fetched(me: &str, target: ChatTarget) -> Conversation {
    let id = format!("{me}_{}", target.peer().conversation_id());
    Conversation::new(id, target)
}

/// One-to-one conversation with `uid` and no messages.
pub fn with_user(uid: &str) -> Conversation {
    conversation(ChatTarget::User(user(uid)), None, 0)
}

/// Group conversation with `guid` and no messages.
pub fn with_group(guid: &str) -> Conversation {
    conversation(ChatTarget::Group(group(guid)), None, 0)
}

/// Typing indicator from `from` in the conversation `to`.
pub fn typing(from: &str, to: ChatTarget) -> TypingIndicator {
    TypingIndicator { sender: user(from), receiver: to, metadata: Default::default() }
}

/// Receipt for `message_id`, issued by `from` for a message sent to `to`.
pub fn receipt(
    message_id: MessageId,
    from: &str,
    to: ChatTarget,
    receipt_type: ReceiptType,
) -> MessageReceipt {
    MessageReceipt {
        message_id,
        sender: user(from),
        receiver: to,
        receipt_type,
        timestamp: sent_at(message_id) + 1,
    }
}

/// Incoming message event.
pub fn received(message: Message) -> ChatEvent {
    SdkEvent::MessageReceived { message }.into()
}

/// Local send event.
pub fn sent(message: Message, status: SendStatus) -> ChatEvent {
    UiEvent::MessageSent { message, status }.into()
}

/// Conversation-read event for `peer`.
pub fn read_locally(peer: Peer) -> ChatEvent {
    UiEvent::ConversationRead { peer }.into()
}

/// Timestamp fixtures use for message `id`.
pub fn sent_at(id: MessageId) -> Timestamp {
    1_700_000_000 + Timestamp::try_from(id).unwrap_or(Timestamp::MAX / 2)
}

fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_ids() {
        assert_eq!(user("bob").name, "Bob");
        assert_eq!(group("rust").name, "Rust");
    }

    #[test]
    fn conversation_ids_follow_peer() {
        assert_eq!(with_user("bob").id, "user_bob");
        assert_eq!(with_group("g1").peer(), Peer::group("g1"));
    }

    #[test]
    fn fetched_conversations_carry_sdk_ids() {
        let conversation = fetched("me", ChatTarget::User(user("zed")));
        assert_eq!(conversation.id, "me_user_zed");
        assert_eq!(conversation.peer(), Peer::user("zed"));
    }

    #[test]
    fn pending_messages_are_keyed_locally() {
        let message = pending("tmp-1", "alice", "bob", "hi");
        assert_eq!(message.key(), chatkit_core::MessageKey::Local("tmp-1".into()));
    }
}
