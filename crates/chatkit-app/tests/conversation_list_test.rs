//! Integration tests for the conversation list controller.
//!
//! Pages come from a [`ScriptedSdk`]; live events are fed directly or
//! through an [`EventBus`]. Each test ends by checking the list contents and
//! what the view asked the SDK for.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use chatkit_app::{
    ConversationsAction, ConversationsConfig, ConversationsController, Effect, ErrorHandler,
    EventBus, FetchOutcome, FetchState,
};
use chatkit_core::{
    ChatError, ChatEvent, ChatTarget, ConversationQuery, Message, MessageKind, Peer, SdkEvent,
    UiEvent,
};
use chatkit_harness::{
    InvariantRegistry, ScriptedSdk, ViewSnapshot,
    fixtures::{self, direct, received, with_user},
};
use proptest::prelude::*;

const ME: &str = "me";

/// Error handler that counts its calls.
fn counting_handler() -> (ErrorHandler, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let handler: ErrorHandler = Arc::new(move |_: &ChatError| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (handler, count)
}

fn controller(sdk: &ScriptedSdk) -> ConversationsController {
    ConversationsController::new(sdk.shared(), ConversationsConfig::default()).unwrap()
}

fn peers(controller: &ConversationsController) -> Vec<Peer> {
    controller.state().conversations().iter().map(|c| c.peer()).collect()
}

/// Controller with bob, carol and dave loaded, in that order.
async fn loaded() -> (ScriptedSdk, ConversationsController) {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![with_user("bob"), with_user("carol"), with_user("dave")]);
    let mut controller = controller(&sdk);
    assert_eq!(controller.fetch_next().await, Ok(FetchOutcome::Applied { inserted: 3 }));
    (sdk, controller)
}

#[test]
fn construction_requires_login() {
    let result =
        ConversationsController::new(ScriptedSdk::logged_out().shared(), Default::default());
    assert!(matches!(result, Err(ChatError::NotLoggedIn)));
}

#[tokio::test]
async fn pending_page_blocks_a_second_ticket_on_the_same_cursor() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![with_user("bob")]).push_conversations(vec![with_user("carol")]);
    let mut controller = controller(&sdk);

    let first = controller.prepare_fetch().unwrap().unwrap();
    assert!(controller.prepare_fetch().unwrap().is_none());
    assert_eq!(controller.fetch_next().await, Ok(FetchOutcome::InFlight));
    assert_eq!(sdk.pages_served(), 0);

    let first = first.run().await;
    assert_eq!(controller.apply_fetch(first), Ok(FetchOutcome::Applied { inserted: 1 }));

    loop {
        match controller.fetch_next().await {
            Ok(FetchOutcome::Exhausted) => break,
            outcome => assert!(outcome.is_ok()),
        }
    }
    assert_eq!(peers(&controller), vec![Peer::user("bob"), Peer::user("carol")]);
    assert_eq!(sdk.requests_opened(), 1);
}

#[tokio::test]
async fn page_after_live_message_does_not_duplicate_the_conversation() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let zed = ChatTarget::User(fixtures::user("zed"));
    sdk.push_conversations(vec![with_user("bob")])
        .push_conversations(vec![fixtures::fetched(ME, zed)]);
    let mut controller = controller(&sdk);
    controller.fetch_next().await.unwrap();

    // zed writes before the page holding zed's conversation is loaded.
    controller.handle(&received(direct(1, "zed", ME, "hi")));
    assert_eq!(controller.fetch_next().await, Ok(FetchOutcome::Applied { inserted: 0 }));

    assert_eq!(peers(&controller), vec![Peer::user("zed"), Peer::user("bob")]);
    let zed = controller.state().find(&Peer::user("zed")).unwrap();
    assert_eq!(zed.unread_count, 1);
    let snapshot = ViewSnapshot::conversations(controller.state());
    InvariantRegistry::standard().assert_all(&snapshot, "after second page");
}

#[tokio::test]
async fn first_page_arriving_after_live_message_keeps_one_row() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let zed = ChatTarget::User(fixtures::user("zed"));
    sdk.push_conversations(vec![fixtures::fetched(ME, zed), with_user("bob")]);
    let mut controller = controller(&sdk);

    let ticket = controller.prepare_fetch().unwrap().unwrap();
    controller.handle(&received(direct(1, "zed", ME, "hi")));
    let completion = ticket.run().await;
    assert_eq!(controller.apply_fetch(completion), Ok(FetchOutcome::Applied { inserted: 1 }));

    assert_eq!(peers(&controller), vec![Peer::user("zed"), Peer::user("bob")]);
}

#[tokio::test]
async fn refetch_supersedes_a_pending_page() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![with_user("bob")]).push_conversations(vec![with_user("carol")]);
    let mut controller = controller(&sdk);

    let first = controller.prepare_fetch().unwrap().unwrap();
    let refetch = controller.prepare_refetch().unwrap();

    // The old cursor's page arrives after the refetch was issued.
    let first = first.run().await;
    assert_eq!(controller.apply_fetch(first), Ok(FetchOutcome::Stale));

    let refetch = refetch.run().await;
    assert_eq!(controller.apply_fetch(refetch), Ok(FetchOutcome::Applied { inserted: 1 }));
    assert_eq!(peers(&controller), vec![Peer::user("carol")]);
    assert_eq!(sdk.requests_opened(), 2);
}

#[tokio::test]
async fn empty_first_page_shows_empty_and_exhausts() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut controller = controller(&sdk);

    assert_eq!(controller.fetch_next().await, Ok(FetchOutcome::Applied { inserted: 0 }));
    assert_eq!(controller.state().fetch_state(), FetchState::Empty);

    assert_eq!(controller.fetch_next().await, Ok(FetchOutcome::Exhausted));
    assert_eq!(sdk.pages_served(), 0);
}

#[tokio::test]
async fn first_page_failure_shows_error() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.fail_conversations(ChatError::network("offline"));
    let (handler, reported) = counting_handler();
    let mut controller = controller(&sdk).with_error_handler(handler);

    let result = controller.fetch_next().await;

    assert_eq!(result, Err(ChatError::network("offline")));
    assert_eq!(controller.state().fetch_state(), FetchState::Error);
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn later_page_failure_keeps_loaded_rows() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![with_user("bob")])
        .fail_conversations(ChatError::sdk("ERR_TOO_MANY_REQUESTS", "slow down"));
    let (handler, reported) = counting_handler();
    let mut controller = controller(&sdk).with_error_handler(handler);

    controller.fetch_next().await.unwrap();
    assert!(controller.fetch_next().await.is_err());

    assert_eq!(controller.state().fetch_state(), FetchState::Loaded);
    assert_eq!(peers(&controller), vec![Peer::user("bob")]);
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_query_never_reaches_sdk() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let (handler, reported) = counting_handler();
    let mut controller = controller(&sdk)
        .with_query(ConversationQuery::new(0))
        .with_error_handler(handler);

    let result = controller.fetch_next().await;

    assert!(matches!(result, Err(ChatError::InvalidRequest { .. })));
    assert_eq!(sdk.requests_opened(), 0);
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn incoming_message_moves_conversation_to_top() {
    let (_sdk, mut controller) = loaded().await;

    let effects = controller.handle(&received(direct(7, "dave", ME, "ping")));

    assert_eq!(peers(&controller), vec![
        Peer::user("dave"),
        Peer::user("bob"),
        Peer::user("carol")
    ]);
    let dave = controller.state().find(&Peer::user("dave")).unwrap();
    assert_eq!(dave.unread_count, 1);
    assert_eq!(dave.last_message_id(), Some(7));
    assert!(effects.contains(&Effect::Render));
    assert!(matches!(effects.first(), Some(Effect::MarkAsDelivered(m)) if m.id == 7));
}

#[tokio::test]
async fn own_messages_never_count_as_unread() {
    let (_sdk, mut controller) = loaded().await;

    let effects = controller.handle(&received(direct(8, ME, "carol", "on my way")));

    assert_eq!(peers(&controller)[0], Peer::user("carol"));
    assert_eq!(controller.state().unread_total(), 0);
    assert!(!effects.iter().any(|e| matches!(e, Effect::MarkAsDelivered(_))));
}

#[tokio::test]
async fn open_conversation_does_not_accumulate_unread() {
    let (_sdk, mut controller) = loaded().await;
    controller.select(Some(Peer::user("carol")));

    controller.handle(&received(direct(9, "carol", ME, "you there?")));

    assert_eq!(controller.state().find(&Peer::user("carol")).unwrap().unread_count, 0);
}

#[tokio::test]
async fn reading_resets_unread() {
    let (_sdk, mut controller) = loaded().await;
    controller.handle(&received(direct(1, "bob", ME, "a")));
    controller.handle(&received(direct(2, "bob", ME, "b")));
    assert_eq!(controller.state().unread_total(), 2);

    controller.handle(&fixtures::read_locally(Peer::user("bob")));

    assert_eq!(controller.state().unread_total(), 0);
}

#[tokio::test]
async fn gated_message_leaves_state_untouched() {
    let (_sdk, mut controller) = loaded().await;
    let before = Arc::clone(controller.state());

    let poll = Message::new(
        11,
        fixtures::user("bob"),
        ChatTarget::User(fixtures::user(ME)),
        MessageKind::Custom { custom_type: "extension_poll".into(), data: Default::default() },
    );
    let effects = controller.handle(&received(poll));

    assert!(Arc::ptr_eq(&before, controller.state()));
    assert!(!effects.contains(&Effect::Render));
}

#[tokio::test]
async fn delivery_effects_reach_sdk() {
    let (sdk, mut controller) = loaded().await;

    let effects = controller.handle(&received(direct(5, "bob", ME, "hi")));
    controller.execute(effects).await;

    assert_eq!(sdk.delivered(), vec![5]);
}

#[tokio::test]
async fn receipt_failures_are_reported_not_raised() {
    let (sdk, controller) = loaded().await;
    sdk.fail_receipts(ChatError::network("offline"));
    let (handler, reported) = counting_handler();
    let mut controller = controller.with_error_handler(handler);

    let effects = controller.handle(&received(direct(5, "bob", ME, "hi")));
    controller.execute(effects).await;

    assert!(sdk.delivered().is_empty());
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[test]
fn reconnect_before_first_page_does_nothing() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut controller = controller(&sdk);

    let effects = controller.handle(&SdkEvent::ConnectionEstablished.into());

    assert!(effects.is_empty());
}

#[tokio::test]
async fn reconnect_refetches_from_scratch() {
    let (sdk, mut controller) = loaded().await;
    let bus = EventBus::<ChatEvent>::new(16);
    controller.attach(&bus);

    bus.publish(SdkEvent::ConnectionLost);
    bus.publish(SdkEvent::ConnectionEstablished);
    let effects = controller.pump();
    assert_eq!(effects, vec![Effect::Refetch]);

    sdk.push_conversations(vec![with_user("erin")]);
    controller.execute(effects).await;

    assert_eq!(peers(&controller), vec![Peer::user("erin")]);
    assert_eq!(sdk.conversation_queries().len(), 2);
}

#[tokio::test]
async fn typing_indicator_lifecycle() {
    let (_sdk, mut controller) = loaded().await;
    let indicator = fixtures::typing("bob", ChatTarget::User(fixtures::user(ME)));

    controller.handle(&SdkEvent::TypingStarted { indicator: indicator.clone() }.into());
    assert!(controller.state().typing().get(&Peer::user("bob")).is_some());

    controller.handle(&SdkEvent::TypingEnded { indicator }.into());
    assert!(controller.state().typing().is_empty());
}

#[tokio::test]
async fn own_typing_is_ignored() {
    let (_sdk, mut controller) = loaded().await;
    let indicator = fixtures::typing(ME, ChatTarget::User(fixtures::user("bob")));

    let effects = controller.handle(&SdkEvent::TypingStarted { indicator }.into());

    assert!(effects.is_empty());
    assert!(controller.state().typing().is_empty());
}

#[tokio::test]
async fn delete_removes_row_and_announces_it() {
    let (sdk, mut controller) = loaded().await;
    let bus = EventBus::<ChatEvent>::new(16);
    controller.attach(&bus);
    let mut probe = bus.subscribe("probe");

    controller.delete_conversation(&Peer::user("carol")).await.unwrap();

    assert_eq!(peers(&controller), vec![Peer::user("bob"), Peer::user("dave")]);
    assert_eq!(sdk.deleted(), vec![Peer::user("carol")]);
    let announced = probe.drain();
    assert!(matches!(
        announced.as_slice(),
        [ChatEvent::Ui(UiEvent::ConversationDeleted { conversation })]
            if conversation.peer() == Peer::user("carol")
    ));
}

#[tokio::test]
async fn delete_of_unknown_conversation_fails() {
    let (sdk, controller) = loaded().await;
    let (handler, reported) = counting_handler();
    let mut controller = controller.with_error_handler(handler);

    let result = controller.delete_conversation(&Peer::group("nowhere")).await;

    assert_eq!(result, Err(ChatError::ConversationNotFound { id: "group_nowhere".into() }));
    assert!(sdk.deleted().is_empty());
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_delete_keeps_row() {
    let (sdk, mut controller) = loaded().await;
    sdk.fail_deletes(ChatError::sdk("ERR_PERMISSION", "not allowed"));

    let result = controller.delete_conversation(&Peer::user("bob")).await;

    assert!(result.is_err());
    assert_eq!(controller.state().conversations().len(), 3);
}

#[tokio::test]
async fn selection_is_published() {
    let (_sdk, mut controller) = loaded().await;
    let bus = EventBus::<ChatEvent>::new(16);
    controller.attach(&bus);
    let mut probe = bus.subscribe("probe");

    assert!(controller.select(Some(Peer::user("bob"))));
    assert!(!controller.select(Some(Peer::user("bob"))));

    assert_eq!(probe.drain(), vec![ChatEvent::from(UiEvent::ActiveConversationChanged {
        peer: Some(Peer::user("bob"))
    })]);
    assert_eq!(controller.state().active(), Some(&Peer::user("bob")));
}

#[tokio::test]
async fn leaving_a_group_removes_it() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![fixtures::with_group("g1"), with_user("bob")]);
    let mut controller = controller(&sdk);
    controller.fetch_next().await.unwrap();

    let left = fixtures::membership(3, ME, ME, "g1", chatkit_core::MembershipChange::Left);
    controller.handle(&SdkEvent::GroupMembershipChanged { message: left }.into());

    assert_eq!(peers(&controller), vec![Peer::user("bob")]);
}

proptest! {
    /// Appending pages never duplicates a conversation, and re-appending a
    /// page already shown changes nothing.
    #[test]
    fn pages_never_duplicate(
        pages in prop::collection::vec(prop::collection::vec(0u8..8, 0..6), 1..6)
    ) {
        let sdk = ScriptedSdk::new(fixtures::user(ME));
        let mut controller = controller(&sdk);

        for page in &pages {
            let conversations = page.iter().map(|n| with_user(&format!("u{n}"))).collect();
            controller.dispatch(ConversationsAction::Append { conversations, replace: false });
        }

        let mut shown = peers(&controller);
        let total = shown.len();
        shown.sort();
        shown.dedup();
        prop_assert_eq!(shown.len(), total);

        let mut expected: Vec<u8> = pages.iter().flatten().copied().collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(total, expected.len());

        let repeat = pages[0].iter().map(|n| with_user(&format!("u{n}"))).collect();
        let action = ConversationsAction::Append { conversations: repeat, replace: false };
        prop_assert!(!controller.dispatch(action));
    }

    /// Activity moves exactly one conversation to the top and keeps the
    /// relative order of the rest.
    #[test]
    fn activity_preserves_relative_order(len in 1usize..10, pick in any::<prop::sample::Index>()) {
        let sdk = ScriptedSdk::new(fixtures::user(ME));
        let mut controller = controller(&sdk);
        let users: Vec<String> = (0..len).map(|n| format!("u{n}")).collect();
        controller.dispatch(ConversationsAction::Append {
            conversations: users.iter().map(|u| with_user(u)).collect(),
            replace: false,
        });

        let index = pick.index(len);
        controller.handle(&received(direct(1, &users[index], ME, "hi")));

        let mut expected: Vec<Peer> = users.iter().map(Peer::user).collect();
        let moved = expected.remove(index);
        expected.insert(0, moved);
        prop_assert_eq!(peers(&controller), expected);
    }
}
