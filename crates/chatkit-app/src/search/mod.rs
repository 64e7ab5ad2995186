//! Keyword and filter search over conversations and messages.

mod controller;
mod filter;

pub use controller::{SearchCompletion, SearchController, SearchTicket};
pub use filter::{FilterSet, SearchFilter, SearchScopes, is_valid_query};
