//! Message list of one conversation or thread.

mod action;
mod controller;
mod reducer;
mod state;

pub use action::MessageListAction;
pub use controller::MessageListController;
pub use reducer::reduce;
pub use state::MessageListState;
