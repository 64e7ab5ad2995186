//! Conversation list: state, actions, reducer and controller.

mod action;
mod controller;
mod reducer;
mod state;

pub use action::ConversationsAction;
pub use controller::ConversationsController;
pub(crate) use reducer::apply_receipt;
pub use reducer::{ReducerContext, reduce};
pub use state::ConversationsState;
