//! Conversation list reducer.
//!
//! [`reduce`] never mutates its input. When an action changes nothing, the
//! same `Arc` is returned so callers can skip re-rendering with a pointer
//! comparison. Changed conversations are cloned and replaced, never edited
//! through a shared reference.

use std::sync::Arc;

use chatkit_core::{Conversation, Message, MessageReceipt};

use super::{ConversationsAction, ConversationsState};
use crate::rules::UpdateRules;

/// Inputs the reducer needs besides state and action.
#[derive(Debug, Clone, Copy)]
pub struct ReducerContext<'a> {
    /// Logged-in user ID.
    pub me: &'a str,
    /// Update gate for message activity.
    pub rules: &'a UpdateRules,
}

/// Reduce `action` into `state`.
pub fn reduce(
    state: &Arc<ConversationsState>,
    action: ConversationsAction,
    ctx: &ReducerContext<'_>,
) -> Arc<ConversationsState> {
    match action {
        ConversationsAction::Append { conversations, replace } => update(state, |next| {
            if replace {
                next.list.replace_all(conversations);
                true
            } else {
                next.list.append(conversations) > 0
            }
        }),
        ConversationsAction::Remove { peer } => {
            if state.position_of(&peer).is_none() {
                return Arc::clone(state);
            }
            update(state, |next| {
                next.list.remove(&peer);
                next.typing.clear(&peer);
                if next.active.as_ref() == Some(&peer) {
                    next.active = None;
                }
                true
            })
        },
        ConversationsAction::MessageActivity { message } => {
            if !ctx.rules.should_update(&message) {
                return Arc::clone(state);
            }
            update(state, |next| message_activity(next, message, ctx.me))
        },
        ConversationsAction::ReplaceMessage { message } => {
            update(state, |next| replace_last_message(next, message, ctx.me))
        },
        ConversationsAction::PatchReceipt { receipt } => {
            update(state, |next| patch_receipt(next, &receipt, ctx.me))
        },
        ConversationsAction::MarkRead { peer } => update(state, |next| {
            let Some(index) = next.position_of(&peer) else {
                return false;
            };
            let items = next.list.items_mut();
            if items[index].unread_count == 0 {
                return false;
            }
            let mut conversation = items[index].clone();
            conversation.unread_count = 0;
            items[index] = conversation;
            true
        }),
        ConversationsAction::TypingStarted { indicator } => {
            if indicator.sender.uid == ctx.me {
                return Arc::clone(state);
            }
            let peer = indicator.peer(ctx.me);
            update(state, |next| next.typing.start(peer, indicator))
        },
        ConversationsAction::TypingEnded { indicator } => {
            let peer = indicator.peer(ctx.me);
            update(state, |next| next.typing.end(&peer, &indicator.sender.uid))
        },
        ConversationsAction::UpdateTarget { target } => update(state, |next| {
            let Some(index) = next.position_of(&target.peer()) else {
                return false;
            };
            let items = next.list.items_mut();
            if items[index].with == target {
                return false;
            }
            let mut conversation = items[index].clone();
            conversation.with = target;
            items[index] = conversation;
            true
        }),
        ConversationsAction::SetActive { peer } => {
            if state.active == peer {
                return Arc::clone(state);
            }
            update(state, |next| {
                next.active = peer;
                true
            })
        },
        ConversationsAction::SetFetchState(fetch_state) => {
            update(state, |next| next.list.set_fetch_state(fetch_state))
        },
    }
}

/// Clone `state`, apply `f`, and keep the clone only if `f` reports a change.
fn update(
    state: &Arc<ConversationsState>,
    f: impl FnOnce(&mut ConversationsState) -> bool,
) -> Arc<ConversationsState> {
    let mut next = ConversationsState::clone(state);
    if f(&mut next) { Arc::new(next) } else { Arc::clone(state) }
}

fn message_activity(state: &mut ConversationsState, message: Message, me: &str) -> bool {
    let peer = message.peer(me);
    let counts_as_unread = !message.is_sent_by(me) && state.active.as_ref() != Some(&peer);

    // A message from someone ends their typing indicator.
    state.typing.end(&peer, &message.sender.uid);

    match state.position_of(&peer) {
        Some(index) => {
            let mut conversation = state.list.items()[index].clone();
            if counts_as_unread {
                conversation.unread_count = conversation.unread_count.saturating_add(1);
            }
            conversation.updated_at = message.sent_at.or(conversation.updated_at);
            conversation.last_message = Some(message);
            state.list.move_to_front(index, conversation);
        },
        None => {
            let mut conversation = Conversation::from_message(&message, me);
            if counts_as_unread {
                conversation.unread_count = 1;
            }
            tracing::debug!(%peer, "conversation created from message");
            state.list.push_front(conversation);
        },
    }
    true
}

fn replace_last_message(state: &mut ConversationsState, message: Message, me: &str) -> bool {
    let Some(index) = state.position_of(&message.peer(me)) else {
        return false;
    };
    let items = state.list.items_mut();
    let is_last =
        items[index].last_message.as_ref().is_some_and(|last| last.key() == message.key());
    if !is_last || items[index].last_message.as_ref() == Some(&message) {
        return false;
    }
    let mut conversation = items[index].clone();
    conversation.last_message = Some(message);
    items[index] = conversation;
    true
}

fn patch_receipt(state: &mut ConversationsState, receipt: &MessageReceipt, me: &str) -> bool {
    let peer = receipt.peer(me);
    let Some(index) = state.position_of(&peer) else {
        return false;
    };
    let items = state.list.items_mut();

    // Read on another device of the logged-in user.
    if receipt.sender.uid == me {
        if !receipt.receipt_type.is_read() || items[index].unread_count == 0 {
            return false;
        }
        let mut conversation = items[index].clone();
        conversation.unread_count = 0;
        items[index] = conversation;
        return true;
    }

    if !receipt.receipt_type.applies_to(peer.kind) {
        return false;
    }
    let Some(last) = items[index].last_message.as_ref() else {
        return false;
    };
    if !last.is_sent_by(me) || last.id == 0 || last.id > receipt.message_id {
        return false;
    }

    let mut patched = last.clone();
    let changed = apply_receipt(&mut patched, receipt);
    if changed {
        let mut conversation = items[index].clone();
        conversation.last_message = Some(patched);
        items[index] = conversation;
    }
    changed
}

/// Set receipt timestamps that are still missing. Returns `true` if any was
/// set. A read receipt implies delivery.
pub(crate) fn apply_receipt(message: &mut Message, receipt: &MessageReceipt) -> bool {
    let mut changed = false;
    if message.delivered_at.is_none() {
        message.delivered_at = Some(receipt.timestamp);
        changed = true;
    }
    if receipt.receipt_type.is_read() && message.read_at.is_none() {
        message.read_at = Some(receipt.timestamp);
        changed = true;
    }
    changed
}
