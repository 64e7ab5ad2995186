//! Operations for property-based testing.
//!
//! Operations describe what happens around the logged-in user: messages
//! arriving, local sends and their acknowledgements, typing, receipts,
//! presence and membership changes. They are generated randomly and turned
//! into [`ChatEvent`]s by an [`EventScript`], which remembers enough history
//! (sent messages, pending sends) for later operations to refer to it.

use arbitrary::{Arbitrary, Unstructured};
use chatkit_core::{
    ChatEvent, ChatTarget, MembershipChange, Message, MessageKind, Peer, ReceiptType, SdkEvent,
    SendStatus, UiEvent, UserStatus,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::fixtures;

/// Model user (mapped onto a handful of user IDs).
pub type ModelUserId = u8;

/// Model group (mapped onto a handful of group IDs).
pub type ModelGroupId = u8;

/// Distinct users other than the logged-in one.
pub const MODEL_USERS: u8 = 4;

/// Distinct groups.
pub const MODEL_GROUPS: u8 = 2;

/// A conversation from the logged-in user's point of view.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub enum ModelPeer {
    /// One-to-one conversation.
    User(ModelUserId),
    /// Group conversation.
    Group(ModelGroupId),
}

/// Operations that can happen around the logged-in user.
///
/// Operations referring to earlier messages (`nth`) pick among the messages
/// the script has produced so far and produce nothing when there are none.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Someone sends a message to a conversation.
    Receive {
        /// Sender (in groups) or conversation (one-to-one).
        from: ModelUserId,
        /// Group the message is posted to, if any.
        group: Option<ModelGroupId>,
    },

    /// The logged-in user starts sending a message.
    Send {
        /// Conversation.
        to: ModelPeer,
    },

    /// A pending send completes.
    Acknowledge {
        /// Pending send to resolve.
        nth: u8,
        /// The send failed.
        failed: bool,
    },

    /// An earlier message is edited.
    Edit {
        /// Message to edit.
        nth: u8,
    },

    /// An earlier message is deleted.
    Delete {
        /// Message to delete.
        nth: u8,
    },

    /// Someone starts typing.
    TypingStarted {
        /// Typist.
        from: ModelUserId,
        /// Group they type in, if any.
        group: Option<ModelGroupId>,
    },

    /// Someone stops typing.
    TypingEnded {
        /// Typist.
        from: ModelUserId,
        /// Group they typed in, if any.
        group: Option<ModelGroupId>,
    },

    /// A message sent by the logged-in user is delivered or read.
    Receipt {
        /// Own message the receipt is for.
        nth: u8,
        /// Read rather than delivered.
        read: bool,
    },

    /// A user comes online or goes offline.
    Presence {
        /// User.
        user: ModelUserId,
        /// New status.
        online: bool,
    },

    /// Group membership changes.
    Membership {
        /// Group.
        group: ModelGroupId,
        /// Member affected. `None` is the logged-in user.
        member: Option<ModelUserId>,
        /// Member leaves rather than joins.
        leaves: bool,
    },

    /// The user opens a conversation, or closes the open one.
    Open {
        /// Conversation.
        peer: Option<ModelPeer>,
    },

    /// The open message view marked a conversation as read.
    ReadLocally {
        /// Conversation.
        peer: ModelPeer,
    },

    /// The connection drops.
    ConnectionLost,

    /// The connection comes back.
    ConnectionEstablished,
}

/// Model user ID as an SDK user ID.
pub fn user_id(user: ModelUserId) -> String {
    format!("u{}", user % MODEL_USERS)
}

/// Model group ID as an SDK group ID.
pub fn group_id(group: ModelGroupId) -> String {
    format!("g{}", group % MODEL_GROUPS)
}

impl ModelPeer {
    /// SDK peer.
    pub fn peer(self) -> Peer {
        match self {
            Self::User(user) => Peer::user(user_id(user)),
            Self::Group(group) => Peer::group(group_id(group)),
        }
    }

    fn target(self) -> ChatTarget {
        match self {
            Self::User(user) => ChatTarget::User(fixtures::user(&user_id(user))),
            Self::Group(group) => ChatTarget::Group(fixtures::group(&group_id(group))),
        }
    }
}

/// Turns operations into events, keeping the history they refer to.
#[derive(Debug, Clone)]
pub struct EventScript {
    me: String,
    next_id: u64,
    next_muid: u64,
    history: Vec<Message>,
    pending: Vec<Message>,
}

impl EventScript {
    /// Script for logged-in user `me`.
    pub fn new(me: impl Into<String>) -> Self {
        Self { me: me.into(), next_id: 1, next_muid: 1, history: Vec::new(), pending: Vec::new() }
    }

    /// Logged-in user ID.
    pub fn me(&self) -> &str {
        &self.me
    }

    /// Messages with a server ID produced so far.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Event for `operation`, or `None` if it refers to history that does not
    /// exist yet.
    pub fn event(&mut self, operation: &Operation) -> Option<ChatEvent> {
        let event: ChatEvent = match *operation {
            Operation::Receive { from, group } => {
                let to = match group {
                    Some(group) => ChatTarget::Group(fixtures::group(&group_id(group))),
                    None => ChatTarget::User(fixtures::user(&self.me)),
                };
                let message = fixtures::text(self.issue_id(), &user_id(from), &to, "hello");
                self.history.push(message.clone());
                SdkEvent::MessageReceived { message }.into()
            },
            Operation::Send { to } => {
                let muid = format!("local-{}", self.next_muid);
                self.next_muid += 1;
                let me = fixtures::user(&self.me);
                let mut message = Message::text(0, me, to.target(), "sending");
                message.muid = muid;
                self.pending.push(message.clone());
                UiEvent::MessageSent { message, status: SendStatus::InProgress }.into()
            },
            Operation::Acknowledge { nth, failed } => {
                let index = pick(nth, self.pending.len())?;
                let mut message = self.pending.remove(index);
                if failed {
                    message.failed = true;
                    UiEvent::MessageSent { message, status: SendStatus::Error }.into()
                } else {
                    message.id = self.issue_id();
                    message.sent_at = Some(fixtures::sent_at(message.id));
                    self.history.push(message.clone());
                    UiEvent::MessageSent { message, status: SendStatus::Success }.into()
                }
            },
            Operation::Edit { nth } => {
                let index = pick(nth, self.history.len())?;
                let message = &mut self.history[index];
                message.edited_at = message.sent_at.map(|t| t + 60);
                message.kind = MessageKind::Text { text: "edited".into() };
                SdkEvent::MessageEdited { message: message.clone() }.into()
            },
            Operation::Delete { nth } => {
                let index = pick(nth, self.history.len())?;
                let message = &mut self.history[index];
                message.deleted_at = message.sent_at.map(|t| t + 120);
                SdkEvent::MessageDeleted { message: message.clone() }.into()
            },
            Operation::TypingStarted { from, group } => {
                let indicator = fixtures::typing(&user_id(from), self.typing_target(group));
                SdkEvent::TypingStarted { indicator }.into()
            },
            Operation::TypingEnded { from, group } => {
                let indicator = fixtures::typing(&user_id(from), self.typing_target(group));
                SdkEvent::TypingEnded { indicator }.into()
            },
            Operation::Receipt { nth, read } => {
                let own: Vec<&Message> =
                    self.history.iter().filter(|m| m.is_sent_by(&self.me)).collect();
                let message = own.get(pick(nth, own.len())?)?;
                let receipt = match &message.receiver {
                    ChatTarget::User(user) => {
                        let receipt_type =
                            if read { ReceiptType::Read } else { ReceiptType::Delivered };
                        fixtures::receipt(
                            message.id,
                            &user.uid,
                            ChatTarget::User(fixtures::user(&self.me)),
                            receipt_type,
                        )
                    },
                    ChatTarget::Group(group) => {
                        let receipt_type =
                            if read { ReceiptType::ReadByAll } else { ReceiptType::DeliveredToAll };
                        fixtures::receipt(
                            message.id,
                            &user_id(0),
                            ChatTarget::Group(group.clone()),
                            receipt_type,
                        )
                    },
                };
                if read {
                    SdkEvent::MessageRead { receipt }.into()
                } else {
                    SdkEvent::MessageDelivered { receipt }.into()
                }
            },
            Operation::Presence { user, online } => {
                let status = if online { UserStatus::Online } else { UserStatus::Offline };
                let user = fixtures::user(&user_id(user)).with_status(status);
                if online {
                    SdkEvent::UserOnline { user }.into()
                } else {
                    SdkEvent::UserOffline { user }.into()
                }
            },
            Operation::Membership { group, member, leaves } => {
                let member = member.map_or_else(|| self.me.clone(), user_id);
                let change = if leaves { MembershipChange::Left } else { MembershipChange::Joined };
                let id = self.issue_id();
                let message = fixtures::membership(id, &member, &member, &group_id(group), change);
                SdkEvent::GroupMembershipChanged { message }.into()
            },
            Operation::Open { peer } => {
                UiEvent::ActiveConversationChanged { peer: peer.map(ModelPeer::peer) }.into()
            },
            Operation::ReadLocally { peer } => {
                UiEvent::ConversationRead { peer: peer.peer() }.into()
            },
            Operation::ConnectionLost => SdkEvent::ConnectionLost.into(),
            Operation::ConnectionEstablished => SdkEvent::ConnectionEstablished.into(),
        };
        Some(event)
    }

    fn issue_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn typing_target(&self, group: Option<ModelGroupId>) -> ChatTarget {
        match group {
            Some(group) => ChatTarget::Group(fixtures::group(&group_id(group))),
            None => ChatTarget::User(fixtures::user(&self.me)),
        }
    }
}

fn pick(nth: u8, len: usize) -> Option<usize> {
    if len == 0 { None } else { Some(usize::from(nth) % len) }
}

/// Deterministic stream of operations and events from a seed.
///
/// The same seed always yields the same sequence.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    rng: ChaCha8Rng,
    script: EventScript,
}

impl EventGenerator {
    /// Generator for logged-in user `me`.
    pub fn new(me: impl Into<String>, seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), script: EventScript::new(me) }
    }

    /// Script tracking the generated history.
    pub fn script(&self) -> &EventScript {
        &self.script
    }

    /// Next random operation.
    pub fn next_operation(&mut self) -> Operation {
        let mut bytes = [0u8; 16];
        self.rng.fill(&mut bytes[..]);
        Operation::arbitrary(&mut Unstructured::new(&bytes)).unwrap_or(Operation::ConnectionLost)
    }

    /// Next event. Operations that produce nothing are skipped.
    pub fn next_event(&mut self) -> ChatEvent {
        loop {
            let operation = self.next_operation();
            if let Some(event) = self.script.event(&operation) {
                tracing::trace!(?operation, "generated event");
                return event;
            }
        }
    }

    /// The next `count` events.
    pub fn events(&mut self, count: usize) -> Vec<ChatEvent> {
        (0..count).map(|_| self.next_event()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_events() {
        let a = EventGenerator::new("me", 7).events(50);
        let b = EventGenerator::new("me", 7).events(50);
        assert_eq!(a, b);
    }

    #[test]
    fn history_operations_need_history() {
        let mut script = EventScript::new("me");
        assert!(script.event(&Operation::Edit { nth: 3 }).is_none());
        assert!(script.event(&Operation::Acknowledge { nth: 0, failed: false }).is_none());
        assert!(script.event(&Operation::Receipt { nth: 0, read: true }).is_none());
    }

    #[test]
    fn acknowledged_send_gets_server_id() {
        let mut script = EventScript::new("me");
        script.event(&Operation::Receive { from: 1, group: None });
        script.event(&Operation::Send { to: ModelPeer::User(1) });

        let event = script.event(&Operation::Acknowledge { nth: 0, failed: false });
        let Some(ChatEvent::Ui(UiEvent::MessageSent { message, status })) = event else {
            panic!("expected a send event");
        };
        assert_eq!(status, SendStatus::Success);
        assert_eq!(message.id, 2);
        assert_eq!(message.muid, "local-1");
        assert_eq!(script.history().len(), 2);
    }

    #[test]
    fn receipts_target_own_messages() {
        let mut script = EventScript::new("me");
        script.event(&Operation::Send { to: ModelPeer::User(2) });
        script.event(&Operation::Acknowledge { nth: 0, failed: false });

        let event = script.event(&Operation::Receipt { nth: 5, read: true });
        let Some(ChatEvent::Sdk(SdkEvent::MessageRead { receipt })) = event else {
            panic!("expected a read receipt");
        };
        assert_eq!(receipt.message_id, 1);
        assert_eq!(receipt.peer("me"), Peer::user("u2"));
    }
}
