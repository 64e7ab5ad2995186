//! Scenario file format.
//!
//! ```json
//! {
//!   "me": { "uid": "me", "name": "Me" },
//!   "open": { "kind": "user", "id": "bob" },
//!   "conversation_pages": [[ ... ]],
//!   "message_pages": [[ ... ]],
//!   "events": [{ "source": "sdk", "event": { "type": "connection_lost" } }],
//!   "search": { "keyword": "lunch", "filters": ["photos"] }
//! }
//! ```
//!
//! Everything but `me` is optional.

use std::path::Path;

use chatkit_app::{ChatKitConfig, SearchFilter};
use chatkit_core::{ChatEvent, Conversation, Message, Peer, User};
use chatkit_harness::{EventGenerator, operation::user_id};
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// A replayable session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Logged-in user.
    pub me: User,
    /// View configuration.
    #[serde(default)]
    pub config: ChatKitConfig,
    /// Conversation whose message list is open.
    #[serde(default)]
    pub open: Option<Peer>,
    /// Pages served to conversation queries, in request order.
    #[serde(default)]
    pub conversation_pages: Vec<Vec<Conversation>>,
    /// Pages served to message queries, in request order.
    #[serde(default)]
    pub message_pages: Vec<Vec<Message>>,
    /// Live events, published after the first pages are loaded.
    #[serde(default)]
    pub events: Vec<ChatEvent>,
    /// Search run after the events.
    #[serde(default)]
    pub search: Option<SearchScript>,
}

/// Search step of a scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchScript {
    /// Keyword to submit.
    pub keyword: String,
    /// Filters to turn on, in order.
    pub filters: Vec<SearchFilter>,
    /// Restrict message results to one conversation.
    pub within: Option<Peer>,
    /// Conversation result pages.
    pub conversation_pages: Vec<Vec<Conversation>>,
    /// Message result pages.
    pub message_pages: Vec<Vec<Message>>,
}

impl Scenario {
    /// Empty scenario for `me`.
    pub fn new(me: User) -> Self {
        Self {
            me,
            config: ChatKitConfig::default(),
            open: None,
            conversation_pages: Vec::new(),
            message_pages: Vec::new(),
            events: Vec::new(),
            search: None,
        }
    }

    /// Scenario of `count` events generated from `seed`, with the message
    /// list of one model user open.
    ///
    /// The same seed always yields the same scenario.
    pub fn generated(seed: u64, count: usize) -> Self {
        let me = User::new("me", "Me");
        let mut scenario = Self::new(me.clone());
        scenario.open = Some(Peer::user(user_id(1)));
        scenario.events = EventGenerator::new(me.uid, seed).events(count);
        scenario
    }

    /// Parse and validate a JSON scenario.
    ///
    /// # Errors
    ///
    /// [`ReplayError::Parse`] for malformed JSON, [`ReplayError::Config`] for
    /// out-of-range config values.
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    /// Read and parse a scenario file.
    ///
    /// # Errors
    ///
    /// [`ReplayError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_json`].
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_scenario_needs_only_me() {
        let scenario = Scenario::from_json(r#"{ "me": { "uid": "me", "name": "Me" } }"#).unwrap();
        assert_eq!(scenario, Scenario::new(User::new("me", "Me")));
    }

    #[test]
    fn out_of_range_config_is_rejected() {
        let json = r#"{
            "me": { "uid": "me", "name": "Me" },
            "config": { "messages": { "limit": 0 } }
        }"#;
        assert!(matches!(Scenario::from_json(json), Err(ReplayError::Config(_))));
    }

    #[test]
    fn events_use_the_bus_format() {
        let json = r#"{
            "me": { "uid": "me", "name": "Me" },
            "events": [
                { "source": "sdk", "event": { "type": "connection_lost" } },
                {
                    "source": "ui",
                    "event": {
                        "type": "conversation_read",
                        "peer": { "kind": "user", "id": "bob" }
                    }
                }
            ]
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.events.len(), 2);
    }

    #[test]
    fn generated_scenarios_are_reproducible() {
        assert_eq!(Scenario::generated(7, 40), Scenario::generated(7, 40));
        assert_eq!(Scenario::generated(7, 40).events.len(), 40);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Scenario::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ReplayError::Io(_))));
    }
}
