//! View configuration.
//!
//! Every field has a default, so hosts only spell out what they change:
//!
//! ```json
//! { "conversations": { "limit": 50 }, "search": { "debounce_ms": 300 } }
//! ```

use std::time::Duration;

use chatkit_core::sdk::MAX_PAGE_LIMIT;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, rules::UpdateRules};

/// Default page size for every list.
pub const DEFAULT_PAGE_LIMIT: u32 = 30;

/// Default delay between the last keystroke and a search request.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Conversation list configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationsConfig {
    /// Page size.
    pub limit: u32,
    /// Which messages reorder conversations.
    pub update_rules: UpdateRules,
    /// Acknowledge delivery of incoming messages.
    pub mark_delivered: bool,
    /// Only conversations with these tags.
    pub tags: Vec<String>,
}

impl Default for ConversationsConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            update_rules: UpdateRules::default(),
            mark_delivered: true,
            tags: Vec::new(),
        }
    }
}

/// Message list configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageListConfig {
    /// Page size.
    pub limit: u32,
    /// Acknowledge reading incoming messages while the list is open.
    pub mark_read: bool,
    /// Show thread replies inline instead of counting them on the parent.
    pub show_replies_inline: bool,
    /// Drop deleted messages instead of showing a placeholder.
    pub hide_deleted: bool,
}

impl Default for MessageListConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            mark_read: true,
            show_replies_inline: false,
            hide_deleted: false,
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Conversation results page size.
    pub conversations_limit: u32,
    /// Message results page size.
    pub messages_limit: u32,
    /// Milliseconds to wait after the last keystroke.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            conversations_limit: DEFAULT_PAGE_LIMIT,
            messages_limit: DEFAULT_PAGE_LIMIT,
            debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl SearchConfig {
    /// Debounce delay.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration for every view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatKitConfig {
    /// Conversation list.
    pub conversations: ConversationsConfig,
    /// Message list.
    pub messages: MessageListConfig,
    /// Search.
    pub search: SearchConfig,
}

impl ChatKitConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_limit("conversations.limit", self.conversations.limit)?;
        check_limit("messages.limit", self.messages.limit)?;
        check_limit("search.conversations_limit", self.search.conversations_limit)?;
        check_limit("search.messages_limit", self.search.messages_limit)?;
        Ok(())
    }
}

fn check_limit(field: &'static str, limit: u32) -> Result<(), ConfigError> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ChatKitConfig::from_json(
            r#"{"conversations": {"limit": 50, "update_rules": {"update_on_group_actions": true}}}"#,
        )
        .unwrap();

        assert_eq!(config.conversations.limit, 50);
        assert!(config.conversations.update_rules.update_on_group_actions);
        assert!(!config.conversations.update_rules.update_on_custom_messages);
        assert_eq!(config.search.debounce(), DEFAULT_SEARCH_DEBOUNCE);
        assert_eq!(config.messages, MessageListConfig::default());
    }

    #[test]
    fn out_of_range_limit_is_rejected() {
        let err = ChatKitConfig::from_json(r#"{"messages": {"limit": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "messages.limit", .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(ChatKitConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
