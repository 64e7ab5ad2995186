//! Replay errors.

use chatkit_app::ConfigError;
use chatkit_core::ChatError;
use thiserror::Error;

/// Errors that stop a replay.
///
/// Failures of individual pages or receipts are not errors here: views
/// report them to their error handler and the replay carries on, the way a
/// host application would.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Scenario file could not be read.
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file is not valid JSON for the scenario format.
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    /// Scenario config is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A view could not be created or rejected its query.
    #[error("chat operation failed: {0}")]
    Chat(#[from] ChatError),
}
