//! Property-based tests for the list views.
//!
//! Tests verify that invariants hold under arbitrary event sequences, for a
//! conversation list, a one-to-one message list and a group message list
//! fed the same stream.

use chatkit_app::{
    ConversationsConfig, ConversationsController, MessageListConfig, MessageListController,
};
use chatkit_core::{ChatEvent, ChatTarget, Conversation, Peer};
use chatkit_harness::{
    EventGenerator, EventScript, InvariantRegistry, MessageListSnapshot, ModelPeer, Operation,
    ScriptedSdk, ViewSnapshot, fixtures,
    operation::{group_id, user_id},
};
use proptest::prelude::*;

const ME: &str = "me";

struct Views {
    conversations: ConversationsController,
    direct: MessageListController,
    group: MessageListController,
}

impl Views {
    fn new() -> Self {
        let sdk = ScriptedSdk::new(fixtures::user(ME)).shared();
        let config = MessageListConfig::default();
        let conversations =
            ConversationsController::new(sdk.clone(), ConversationsConfig::default()).unwrap();
        let direct =
            MessageListController::new(sdk.clone(), Peer::user("u1"), config.clone()).unwrap();
        let group = MessageListController::new(sdk, Peer::group("g0"), config).unwrap();
        Self { conversations, direct, group }
    }

    fn handle(&mut self, event: &ChatEvent) {
        self.conversations.handle(event);
        self.direct.handle(event);
        self.group.handle(event);
    }

    fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot::conversations(self.conversations.state())
            .with_messages(MessageListSnapshot::from(self.direct.state().as_ref()))
            .with_messages(MessageListSnapshot::from(self.group.state().as_ref()))
    }
}

/// Two conversation pages covering every model peer, with SDK-assigned IDs.
fn fetched_pages() -> [Vec<Conversation>; 2] {
    let user = |n| fixtures::fetched(ME, ChatTarget::User(fixtures::user(&user_id(n))));
    let group = |n| fixtures::fetched(ME, ChatTarget::Group(fixtures::group(&group_id(n))));
    [vec![user(0), user(1), group(0)], vec![user(2), user(3), group(1)]]
}

fn model_peer() -> impl Strategy<Value = ModelPeer> {
    prop_oneof![
        3 => (0u8..4).prop_map(ModelPeer::User),
        1 => (0u8..2).prop_map(ModelPeer::Group),
    ]
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    let user = || 0u8..4;
    let group = || prop::option::of(0u8..2);
    prop_oneof![
        6 => (user(), group()).prop_map(|(from, group)| Operation::Receive { from, group }),
        3 => model_peer().prop_map(|to| Operation::Send { to }),
        3 => (any::<u8>(), any::<bool>())
            .prop_map(|(nth, failed)| Operation::Acknowledge { nth, failed }),
        1 => any::<u8>().prop_map(|nth| Operation::Edit { nth }),
        1 => any::<u8>().prop_map(|nth| Operation::Delete { nth }),
        2 => (user(), group()).prop_map(|(from, group)| Operation::TypingStarted { from, group }),
        2 => (user(), group()).prop_map(|(from, group)| Operation::TypingEnded { from, group }),
        2 => (any::<u8>(), any::<bool>()).prop_map(|(nth, read)| Operation::Receipt { nth, read }),
        1 => (user(), any::<bool>())
            .prop_map(|(user, online)| Operation::Presence { user, online }),
        1 => (0u8..2, prop::option::of(user()), any::<bool>())
            .prop_map(|(group, member, leaves)| Operation::Membership { group, member, leaves }),
        1 => prop::option::of(model_peer()).prop_map(|peer| Operation::Open { peer }),
        1 => model_peer().prop_map(|peer| Operation::ReadLocally { peer }),
        1 => Just(Operation::ConnectionLost),
        1 => Just(Operation::ConnectionEstablished),
    ]
}

proptest! {
    /// View invariants hold under arbitrary operation sequences.
    #[test]
    fn invariants_hold_under_operations(
        operations in prop::collection::vec(operation_strategy(), 0..150)
    ) {
        let registry = InvariantRegistry::standard();
        let mut script = EventScript::new(ME);
        let mut views = Views::new();

        for (step, operation) in operations.iter().enumerate() {
            let Some(event) = script.event(operation) else { continue };
            views.handle(&event);
            if let Err(violations) = registry.check_all(&views.snapshot()) {
                prop_assert!(false, "step {step} ({operation:?}): {violations:?}");
            }
        }
    }

    /// Pages loaded between live events never list a peer twice, whatever
    /// conversation IDs the SDK assigns.
    #[test]
    fn pages_between_live_events_keep_rows_unique(
        operations in prop::collection::vec(operation_strategy(), 0..80),
        fetch_every in 1usize..12,
    ) {
        let sdk = ScriptedSdk::new(fixtures::user(ME));
        for page in fetched_pages() {
            sdk.push_conversations(page);
        }
        let mut controller =
            ConversationsController::new(sdk.shared(), ConversationsConfig::default()).unwrap();
        let registry = InvariantRegistry::standard();
        let mut script = EventScript::new(ME);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let failure = runtime.block_on(async {
            for (step, operation) in operations.iter().enumerate() {
                if step % fetch_every == 0 {
                    let _ = controller.fetch_next().await;
                }
                if let Some(event) = script.event(operation) {
                    controller.handle(&event);
                }
                let snapshot = ViewSnapshot::conversations(controller.state());
                if let Err(violations) = registry.check_all(&snapshot) {
                    return Some(format!("step {step} ({operation:?}): {violations:?}"));
                }
            }
            None
        });
        prop_assert!(failure.is_none(), "{failure:?}");
    }

    /// Seeded event streams replay to identical views.
    #[test]
    fn seeded_streams_are_deterministic(seed in any::<u64>()) {
        let mut first = Views::new();
        let mut second = Views::new();
        for event in EventGenerator::new(ME, seed).events(80) {
            first.handle(&event);
        }
        for event in EventGenerator::new(ME, seed).events(80) {
            second.handle(&event);
        }

        prop_assert_eq!(first.conversations.state(), second.conversations.state());
        prop_assert_eq!(first.direct.state(), second.direct.state());
    }

    /// Unread counts only ever grow by one per incoming message.
    #[test]
    fn unread_grows_by_at_most_one_per_event(seed in any::<u64>()) {
        let mut views = Views::new();
        let mut generator = EventGenerator::new(ME, seed);
        for _ in 0..100 {
            let before = views.conversations.state().unread_total();
            let event = generator.next_event();
            views.handle(&event);
            let after = views.conversations.state().unread_total();
            prop_assert!(after <= before + 1, "{event:?} raised unread {before} -> {after}");
        }
    }
}

#[test]
fn registry_accepts_idle_views() {
    let views = Views::new();
    InvariantRegistry::standard().assert_all(&views.snapshot(), "before any event");
}
