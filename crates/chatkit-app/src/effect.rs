//! Side-effects requested by views.
//!
//! Handling an event never performs I/O. A view returns [`Effect`]s and the
//! host decides when to run them (usually right away, via the view's
//! `execute`).

use chatkit_core::Message;

/// Work a view asks its host to do after handling events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// View state changed; re-render.
    Render,

    /// The connection came back; refetch the list from scratch.
    Refetch,

    /// Acknowledge delivery of an incoming message.
    MarkAsDelivered(Message),

    /// Acknowledge reading an incoming message.
    MarkAsRead(Message),
}

/// Append [`Effect::Render`] unless already present.
pub(crate) fn push_render(effects: &mut Vec<Effect>) {
    if !effects.contains(&Effect::Render) {
        effects.push(Effect::Render);
    }
}
