//! Message list reducer.

use std::sync::Arc;

use chatkit_core::{Message, MessageKey, MessageReceipt};

use super::{MessageListAction, MessageListState};
use crate::conversations::apply_receipt;

/// Reduce `action` into `state`, as seen by the user `me`.
///
/// Never mutates `state`. Returns the same `Arc` when the action is a no-op.
pub fn reduce(
    state: &Arc<MessageListState>,
    action: MessageListAction,
    me: &str,
) -> Arc<MessageListState> {
    let mut next = MessageListState::clone(state);
    let changed = match action {
        MessageListAction::Append { messages } => next.list.append(messages) > 0,
        MessageListAction::PrependPage { messages } => next.list.prepend(messages) > 0,
        MessageListAction::Replace { message } => replace(&mut next, message),
        MessageListAction::PatchReceipt { receipt } => patch_receipts(&mut next, &receipt, me),
        MessageListAction::IncrementReplyCount { parent_id } => {
            match next.list.position(&MessageKey::Server(parent_id)) {
                Some(index) => {
                    let items = next.list.items_mut();
                    let mut parent = items[index].clone();
                    parent.reply_count = parent.reply_count.saturating_add(1);
                    items[index] = parent;
                    true
                },
                None => false,
            }
        },
        MessageListAction::Remove { key } => next.list.remove(&key).is_some(),
        MessageListAction::SetFetchState(fetch_state) => next.list.set_fetch_state(fetch_state),
    };
    if changed { Arc::new(next) } else { Arc::clone(state) }
}

fn replace(state: &mut MessageListState, message: Message) -> bool {
    let by_id =
        if message.id == 0 { None } else { state.list.position(&MessageKey::Server(message.id)) };
    let by_muid = if message.muid.is_empty() {
        None
    } else {
        state.list.position(&MessageKey::Local(message.muid.clone()))
    };

    match (by_id, by_muid) {
        // The acknowledged copy arrived before the send completed; keep one.
        (Some(index), Some(local)) => {
            state.list.items_mut()[index] = message;
            state.list.items_mut().remove(local);
            true
        },
        (Some(index), None) | (None, Some(index)) => {
            let items = state.list.items_mut();
            if items[index] == message {
                return false;
            }
            items[index] = message;
            true
        },
        (None, None) => false,
    }
}

fn patch_receipts(state: &mut MessageListState, receipt: &MessageReceipt, me: &str) -> bool {
    if receipt.peer(me) != state.peer || !receipt.receipt_type.applies_to(state.peer.kind) {
        return false;
    }

    let mut changed = false;
    for message in state.list.items_mut() {
        if message.id == 0 || message.id > receipt.message_id || !message.is_sent_by(me) {
            continue;
        }
        // Patched in place: `state` is the reducer's private copy
        changed |= apply_receipt(message, receipt);
    }
    changed
}
