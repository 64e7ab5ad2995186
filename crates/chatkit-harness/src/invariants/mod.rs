//! Invariant checking for view state.
//!
//! Invariants are properties that must always hold, whatever sequence of
//! pages and events a view went through. Unlike example-based tests that
//! check specific scenarios, invariants verify behavioral properties across
//! all execution paths.
//!
//! # Architecture
//!
//! Observable state is extracted from conversation lists, message lists and
//! search sections into a [`ViewSnapshot`], then registered [`Invariant`]
//! checks run against it. Violations carry enough context to debug.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = ViewSnapshot::conversations(controller.state());
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    FetchStateMatchesContents, ReadImpliesDelivered, UniqueConversations, UniqueMessages,
};
pub use snapshot::{
    ConversationListSnapshot, ConversationRow, MessageListSnapshot, MessageRow, ViewSnapshot,
};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against view state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &ViewSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
///
/// Use [`InvariantRegistry::standard()`] for the list invariants every view
/// must uphold.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard list invariants.
    ///
    /// Includes:
    /// - [`UniqueConversations`]: one row per peer
    /// - [`UniqueMessages`]: one row per message key
    /// - [`FetchStateMatchesContents`]: `Empty`/`Error` lists are empty,
    ///   `Loaded` lists are not
    /// - [`ReadImpliesDelivered`]: read messages carry a delivery time
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(UniqueConversations);
        registry.add(UniqueMessages);
        registry.add(FetchStateMatchesContents);
        registry.add(ReadImpliesDelivered);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &ViewSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &ViewSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        let snapshot = ViewSnapshot::empty();
        assert!(registry.check_all(&snapshot).is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let registry = InvariantRegistry::standard();
        let snapshot = ViewSnapshot::empty()
            .with_conversations(ConversationListSnapshot {
                label: "a".into(),
                fetch_state: chatkit_app::FetchState::Loaded,
                ..Default::default()
            })
            .with_messages(MessageListSnapshot {
                label: "b".into(),
                fetch_state: chatkit_app::FetchState::Error,
                rows: vec![MessageRow {
                    id: 1,
                    muid: String::new(),
                    sent_at: None,
                    delivered_at: None,
                    read_at: None,
                }],
            });

        let violations = registry.check_all(&snapshot).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "fetch_state_matches_contents");
    }
}
