//! Error routing.
//!
//! SDK failures are not recovered from locally. Every failure is reported once
//! to the host's [`ErrorHandler`]; explicit user operations additionally return
//! the error so the caller can show transient feedback.

use std::sync::Arc;

use chatkit_core::ChatError;
use thiserror::Error;

/// Callback receiving every SDK failure a view encounters.
pub type ErrorHandler = Arc<dyn Fn(&ChatError) + Send + Sync>;

/// Handler that logs failures and does nothing else.
pub fn log_errors() -> ErrorHandler {
    Arc::new(|error: &ChatError| {
        tracing::error!(
            code = error.code(),
            transient = error.is_transient(),
            %error,
            "chat operation failed"
        );
    })
}

/// Errors loading a [`crate::ChatKitConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed or mistyped JSON
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed but out of range
    #[error("invalid config value {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
