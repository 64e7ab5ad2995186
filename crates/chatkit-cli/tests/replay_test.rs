//! End-to-end replays through the shared event bus.

use std::path::Path;

use chatkit_app::FetchState;
use chatkit_cli::{Scenario, render, replay};
use chatkit_core::Peer;

const DEMO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/scenario.json");

fn rendered(report: &chatkit_cli::Report) -> String {
    let mut out = Vec::new();
    render(report, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn demo_scenario_renders_every_view() {
    let scenario = Scenario::load(Path::new(DEMO)).unwrap();
    let report = replay(scenario).await.unwrap();

    insta::assert_snapshot!(rendered(&report), @r#"
    conversations (loaded)
      > user:bob     Bob        sure, 12:30?
        user:erin    Erin       hi there (1)
        group:team   Team       Dave: pushed the fix (4)
        user:alice   Alice      thanks! (1)

    messages with user:bob (loaded)
      #3    Bob      lunch today? [1 reply]
      #4    You      see you at noon read
      #7    You      running late sent
      #8    Bob      no worries

    search "fix" []
      conversations (empty)
      messages (loaded)
      #6    Dave     Dave: pushed the fix

    8 events, 13 renders, delivered [6, 8, 9, 10], read [8, 10], 0 errors
    "#);
}

#[tokio::test]
async fn demo_report_serializes_view_state() {
    let scenario = Scenario::load(Path::new(DEMO)).unwrap();
    let report = replay(scenario).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["conversations_state"], "loaded");
    assert_eq!(json["open"], serde_json::json!({ "kind": "user", "id": "bob" }));
    assert_eq!(json["conversations"][0]["subtitle"]["text"], "sure, 12:30?");
    assert_eq!(json["messages"][1]["receipt"], "read");
    assert_eq!(json["stats"]["errors"], 0);
}

#[tokio::test]
async fn scenario_without_open_conversation_skips_message_view() {
    let mut scenario = Scenario::load(Path::new(DEMO)).unwrap();
    scenario.open = None;
    scenario.search = None;
    let report = replay(scenario).await.unwrap();

    assert_eq!(report.messages_state, None);
    assert!(report.messages.is_empty());
    assert!(report.conversations.iter().all(|line| !line.active));
    // Nobody acknowledges reads without a message view.
    assert!(report.stats.read.is_empty());

    let text = rendered(&report);
    assert!(!text.contains("messages with"));
    assert!(!text.contains("search"));
}

#[tokio::test]
async fn empty_scenario_shows_empty_lists() {
    let scenario = Scenario::from_json(r#"{ "me": { "uid": "me", "name": "Me" } }"#).unwrap();
    let report = replay(scenario).await.unwrap();

    assert_eq!(report.conversations_state, FetchState::Empty);
    assert!(report.conversations.is_empty());
    assert_eq!(report.stats.events, 0);
}

#[tokio::test]
async fn generated_replays_are_deterministic() {
    let first = replay(Scenario::generated(11, 200)).await.unwrap();
    let second = replay(Scenario::generated(11, 200)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.stats.events, 200);
    assert_eq!(first.open, Some(Peer::user("u1")));
}

#[tokio::test]
async fn generated_replays_keep_rows_unique() {
    for seed in 0..8 {
        let report = replay(Scenario::generated(seed, 150)).await.unwrap();

        let mut peers: Vec<_> = report.conversations.iter().map(|line| &line.peer).collect();
        let total = peers.len();
        peers.sort_by_key(|peer| peer.to_string());
        peers.dedup();
        assert_eq!(peers.len(), total, "seed {seed}: duplicate conversation rows");

        let mut ids: Vec<_> =
            report.messages.iter().map(|line| line.id).filter(|id| *id != 0).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total, "seed {seed}: duplicate message rows");
    }
}
