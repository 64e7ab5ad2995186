//! Scenario replay for chatkit views.
//!
//! Loads a JSON scenario (scripted SDK pages plus a live event stream), runs
//! it through the conversation list, message list and search views wired to
//! one event bus, and reports the rows each view ends up showing.
//!
//! # Components
//!
//! - [`Scenario`]: the input file format
//! - [`replay`]: runs a scenario and produces a [`Report`]
//! - [`render`]: prints a report as text

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod render;
mod replay;
mod scenario;

pub use error::ReplayError;
pub use render::render;
pub use replay::{ConversationLine, MessageLine, Report, SearchReport, Stats, replay};
pub use scenario::{Scenario, SearchScript};
