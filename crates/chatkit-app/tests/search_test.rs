//! Integration tests for the search controller.
//!
//! Debounce is driven with explicit instants, so no test sleeps.

use std::time::{Duration, Instant};

use chatkit_app::{
    FetchOutcome, FetchState, SearchConfig, SearchController, SearchFilter, SearchTicket,
};
use chatkit_core::{ChatError, ChatTarget, MediaKind, Peer, ReceiverType, SdkEvent, UiEvent};
use chatkit_harness::{
    ScriptedSdk,
    fixtures::{self, direct, in_group, with_user},
};

const ME: &str = "me";

fn controller(sdk: &ScriptedSdk) -> SearchController {
    SearchController::new(sdk.shared(), SearchConfig::default()).unwrap()
}

async fn run_all(search: &mut SearchController, tickets: Vec<SearchTicket>) {
    for ticket in tickets {
        let completion = ticket.run().await;
        search.apply(completion).unwrap();
    }
}

#[test]
fn idle_search_shows_nothing() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let search = controller(&sdk);

    assert_eq!(search.conversations().fetch_state(), FetchState::Empty);
    assert_eq!(search.messages().fetch_state(), FetchState::Empty);
    assert_eq!(sdk.requests_opened(), 0);
}

#[test]
fn blank_keyword_issues_no_request() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search = controller(&sdk);

    let tickets = search.set_keyword("   ").unwrap();

    assert!(tickets.is_empty());
    assert_eq!(sdk.requests_opened(), 0);
    assert_eq!(search.messages().fetch_state(), FetchState::Empty);
}

#[test]
fn scope_filter_alone_issues_no_request() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search = controller(&sdk);

    let tickets = search.toggle_filter(SearchFilter::Messages).unwrap();

    assert!(tickets.is_empty());
    assert_eq!(sdk.requests_opened(), 0);
}

#[tokio::test]
async fn keyword_searches_both_sections() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![with_user("bob")]);
    sdk.push_messages(vec![direct(4, "bob", ME, "lunch?"), in_group(6, "carol", "g1", "lunch!")]);
    let mut search = controller(&sdk);

    search.set_keyword("  lunch ").unwrap();
    assert_eq!(search.conversations().fetch_state(), FetchState::Loading);
    search.search().await.unwrap();

    assert_eq!(search.conversations().len(), 1);
    assert_eq!(search.messages().len(), 2);
    assert_eq!(search.messages().fetch_state(), FetchState::Loaded);
    assert_eq!(sdk.conversation_queries()[1].keyword.as_deref(), Some("lunch"));
    assert_eq!(sdk.message_queries()[1].keyword.as_deref(), Some("lunch"));
}

#[test]
fn keystrokes_are_debounced() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search: SearchController<Instant> = controller(&sdk);
    let start = Instant::now();

    search.input("he", start);
    search.input("hello", start + Duration::from_millis(100));
    assert_eq!(search.deadline(), Some(start + Duration::from_millis(600)));

    assert!(search.poll(start + Duration::from_millis(599)).unwrap().is_empty());
    assert_eq!(sdk.requests_opened(), 0);

    let tickets = search.poll(start + Duration::from_millis(600)).unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(search.keyword(), "hello");
    assert_eq!(search.deadline(), None);
}

#[test]
fn filter_toggle_flushes_pending_keyword() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search = controller(&sdk);

    search.input("report", Instant::now());
    let tickets = search.toggle_filter(SearchFilter::Documents).unwrap();

    assert_eq!(tickets.len(), 1);
    let query = &sdk.message_queries()[0];
    assert_eq!(query.keyword.as_deref(), Some("report"));
    assert_eq!(query.media, vec![MediaKind::File]);
    assert_eq!(sdk.conversation_queries().len(), 0);
}

#[test]
fn links_replace_media_filters() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search = controller(&sdk);

    search.toggle_filter(SearchFilter::Photos).unwrap();
    search.toggle_filter(SearchFilter::Links).unwrap();

    assert!(!search.filters().contains(SearchFilter::Photos));
    let query = sdk.message_queries().pop().unwrap();
    assert!(query.has_links);
    assert!(query.media.is_empty());
    assert_eq!(search.conversations().fetch_state(), FetchState::Empty);
}

#[test]
fn conversation_filters_shape_the_query() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search = controller(&sdk);

    search.toggle_filter(SearchFilter::Unread).unwrap();
    search.toggle_filter(SearchFilter::Groups).unwrap();

    let query = sdk.conversation_queries().pop().unwrap();
    assert!(query.unread_only);
    assert_eq!(query.conversation_type, Some(ReceiverType::Group));
    assert_eq!(query.keyword, None);
    assert!(sdk.message_queries().is_empty());
    assert!(!search.scopes().messages);
}

#[tokio::test]
async fn resubmitting_drops_earlier_pages() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_messages(vec![direct(1, "bob", ME, "old results")]);
    sdk.push_messages(vec![direct(2, "bob", ME, "new results")]);
    let mut search = controller(&sdk).within(Peer::user("bob"));

    let first = search.set_keyword("old").unwrap();
    let second = search.set_keyword("new").unwrap();

    // The earlier query's page pops first from the script but is stale.
    for ticket in first {
        let completion = ticket.run().await;
        assert_eq!(search.apply(completion), Ok(FetchOutcome::Stale));
    }
    run_all(&mut search, second).await;

    let ids: Vec<_> = search.messages().items().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn scoped_search_skips_conversations() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search = controller(&sdk).within(Peer::group("g1"));

    let tickets = search.set_keyword("deploy").unwrap();

    assert_eq!(tickets.len(), 1);
    assert!(matches!(tickets[0], SearchTicket::Messages(_)));
    assert_eq!(sdk.message_queries()[0].peer, Some(Peer::group("g1")));
    assert!(sdk.conversation_queries().is_empty());
}

#[tokio::test]
async fn more_waits_for_the_pending_page() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_messages(vec![direct(1, "bob", ME, "a")]);
    sdk.push_messages(vec![direct(2, "bob", ME, "a again")]);
    let mut search = controller(&sdk).within(Peer::user("bob"));

    let tickets = search.set_keyword("a").unwrap();
    assert!(search.more_messages().is_none());
    run_all(&mut search, tickets).await;

    let more = search.more_messages().unwrap();
    run_all(&mut search, vec![more]).await;

    let ids: Vec<_> = search.messages().items().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn more_pages_follow_the_active_query() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    let mut search = controller(&sdk).within(Peer::user("bob"));
    assert!(search.more_messages().is_none());

    sdk.push_messages(vec![direct(1, "bob", ME, "a")]);
    sdk.push_messages(vec![direct(2, "bob", ME, "a again")]);
    let tickets = search.set_keyword("a").unwrap();
    run_all(&mut search, tickets).await;

    let more = search.more_messages().unwrap();
    run_all(&mut search, vec![more]).await;

    assert_eq!(search.messages().len(), 2);
    assert_eq!(sdk.requests_opened(), 1);
    assert!(search.more_conversations().is_none());
}

#[tokio::test]
async fn failed_section_shows_error() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![with_user("bob")]);
    sdk.fail_messages(ChatError::network("offline"));
    let mut search = controller(&sdk);
    search.set_keyword("bob").unwrap();

    let result = search.search().await;

    assert_eq!(result, Err(ChatError::network("offline")));
    assert_eq!(search.conversations().fetch_state(), FetchState::Loaded);
    assert_eq!(search.messages().fetch_state(), FetchState::Error);
}

#[tokio::test]
async fn results_follow_edits_and_deletes() {
    let sdk = ScriptedSdk::new(fixtures::user(ME));
    sdk.push_conversations(vec![with_user("bob"), with_user("carol")]);
    sdk.push_messages(vec![
        direct(1, "bob", ME, "plan a"),
        direct(2, "carol", ME, "plan b"),
        direct(3, "carol", ME, "plan c"),
    ]);
    let mut search = controller(&sdk);
    search.set_keyword("plan").unwrap();
    search.search().await.unwrap();

    let mut edited = direct(1, "bob", ME, "plan z");
    edited.edited_at = Some(fixtures::sent_at(9));
    assert!(search.handle(&SdkEvent::MessageEdited { message: edited }.into()));
    assert_eq!(search.messages().items()[0].edited_at, Some(fixtures::sent_at(9)));

    let deleted = direct(2, "carol", ME, "plan b");
    assert!(search.handle(&UiEvent::MessageDeleted { message: deleted }.into()));
    assert_eq!(search.messages().len(), 2);

    let conversation = fixtures::conversation(ChatTarget::User(fixtures::user("carol")), None, 0);
    assert!(search.handle(&UiEvent::ConversationDeleted { conversation }.into()));
    assert_eq!(search.conversations().len(), 1);
    let ids: Vec<_> = search.messages().items().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1]);

    assert!(!search.handle(&SdkEvent::ConnectionLost.into()));
}
