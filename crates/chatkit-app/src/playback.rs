//! Audio playback coordination.
//!
//! Voice notes in different rows must not play over each other. Rows share a
//! [`PlaybackContext`] handed to them by the host; starting one player pauses
//! whichever player was active before.

use std::sync::{Arc, Mutex, PoisonError};

/// A media player owned by a list row.
pub trait Player: Send + Sync {
    /// Stable identifier, usually the message key.
    fn id(&self) -> &str;

    /// Pause playback. Called at most once per takeover.
    fn pause(&self);
}

/// Shared handle tracking the single active player.
///
/// Cloning yields another handle to the same context.
#[derive(Clone, Default)]
pub struct PlaybackContext {
    active: Arc<Mutex<Option<Arc<dyn Player>>>>,
}

impl std::fmt::Debug for PlaybackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackContext").field("active", &self.active_id()).finish()
    }
}

impl PlaybackContext {
    /// Context with no active player.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `player` the active one, pausing the previous player.
    ///
    /// Returns the paused player, if any. Restarting the active player pauses
    /// nothing.
    pub fn start(&self, player: Arc<dyn Player>) -> Option<Arc<dyn Player>> {
        let new_id = player.id().to_owned();
        let previous = {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            active.replace(player)
        };

        // Paused outside the lock: a player may call back into the context.
        match previous {
            Some(previous) if previous.id() != new_id => {
                tracing::trace!(paused = previous.id(), "playback taken over");
                previous.pause();
                Some(previous)
            },
            _ => None,
        }
    }

    /// Forget `id` if it is the active player, e.g. when playback ended or
    /// its row went away. Returns `true` if it was active.
    pub fn stop(&self, id: &str) -> bool {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|player| player.id() == id) {
            *active = None;
            true
        } else {
            false
        }
    }

    /// ID of the active player.
    pub fn active_id(&self) -> Option<String> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.as_ref().map(|player| player.id().to_owned())
    }
}
