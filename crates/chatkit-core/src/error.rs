//! Error types surfaced by the chat SDK.
//!
//! The SDK reports network, authentication and validation failures. They are
//! carried as one enum; callers route them to an error handler rather than
//! branching on a hierarchy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::ConversationId;

/// Errors returned by [`crate::ChatSdk`] and [`crate::PagedRequest`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatError {
    /// Error reported by the chat backend
    #[error("sdk error {code}: {message}")]
    Sdk {
        /// Backend error code
        code: String,
        /// Human readable description
        message: String,
    },

    /// Request could not reach the backend
    #[error("network error: {reason}")]
    Network {
        /// Transport failure description
        reason: String,
    },

    /// Operation requires a logged-in user
    #[error("no user is logged in")]
    NotLoggedIn,

    /// Conversation is not in the list
    #[error("conversation not found: {id}")]
    ConversationNotFound {
        /// Requested conversation
        id: ConversationId,
    },

    /// Request was rejected before being sent
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Validation failure description
        reason: String,
    },
}

impl ChatError {
    /// Create a backend error.
    pub fn sdk(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sdk { code: code.into(), message: message.into() }
    }

    /// Create a network error.
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network { reason: reason.into() }
    }

    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Only network failures are transient; backend rejections repeat on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Short machine-readable code for logging.
    pub fn code(&self) -> &str {
        match self {
            Self::Sdk { code, .. } => code,
            Self::Network { .. } => "ERR_NETWORK",
            Self::NotLoggedIn => "ERR_NOT_LOGGED_IN",
            Self::ConversationNotFound { .. } => "ERR_CONVERSATION_NOT_FOUND",
            Self::InvalidRequest { .. } => "ERR_INVALID_REQUEST",
        }
    }
}
