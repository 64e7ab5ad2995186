//! Test harness for chatkit views.
//!
//! Drives the controllers of `chatkit-app` without a chat backend, for
//! deterministic, reproducible tests.
//!
//! # Scripted SDK
//!
//! [`ScriptedSdk`] serves queued pages and records every query, deletion and
//! receipt, so tests can assert on what a view asked for.
//!
//! # Property Testing
//!
//! The `operation` module generates realistic event sequences from a seed
//! ([`EventGenerator`]) or from proptest-chosen [`Operation`]s
//! ([`EventScript`]).
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks on [`ViewSnapshot`]s. Invariants verify WHAT must be true across
//! all event sequences, not specific scenarios. Use
//! [`InvariantRegistry::standard()`] for the list invariants every view
//! upholds.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod invariants;
pub mod operation;
pub mod sdk;

pub use invariants::{
    ConversationListSnapshot, ConversationRow, FetchStateMatchesContents, Invariant,
    InvariantRegistry, InvariantResult, MessageListSnapshot, MessageRow, ReadImpliesDelivered,
    UniqueConversations, UniqueMessages, ViewSnapshot, Violation,
};
pub use operation::{EventGenerator, EventScript, ModelPeer, Operation};
pub use sdk::ScriptedSdk;
