//! Plain-text report rendering.

use std::io::{self, Write};

use chatkit_app::{FetchState, presentation::ReceiptIcon};

use crate::replay::{ConversationLine, MessageLine, Report};

/// Write `report` as text.
///
/// # Errors
///
/// Any write failure of `out`.
pub fn render(report: &Report, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "conversations ({})", state_label(report.conversations_state))?;
    write_conversations(&report.conversations, out)?;

    if let (Some(peer), Some(state)) = (&report.open, report.messages_state) {
        writeln!(out)?;
        writeln!(out, "messages with {peer} ({})", state_label(state))?;
        write_messages(&report.messages, out)?;
    }

    if let Some(search) = &report.search {
        let filters: Vec<_> = search.filters.iter().map(|f| format!("{f:?}")).collect();
        writeln!(out)?;
        writeln!(out, "search {:?} [{}]", search.keyword, filters.join(", "))?;
        writeln!(out, "  conversations ({})", state_label(search.conversations_state))?;
        write_conversations(&search.conversations, out)?;
        writeln!(out, "  messages ({})", state_label(search.messages_state))?;
        write_messages(&search.messages, out)?;
    }

    let stats = &report.stats;
    writeln!(out)?;
    writeln!(
        out,
        "{} events, {} renders, delivered {:?}, read {:?}, {} errors",
        stats.events, stats.renders, stats.delivered, stats.read, stats.errors
    )
}

fn write_conversations(lines: &[ConversationLine], out: &mut impl Write) -> io::Result<()> {
    for line in lines {
        let marker = if line.active { '>' } else { ' ' };
        let unread = if line.unread > 0 { format!(" ({})", line.unread) } else { String::new() };
        let row = format!(
            "  {marker} {:<12} {:<10} {}{unread}",
            line.peer.to_string(),
            line.title,
            line.subtitle.text()
        );
        writeln!(out, "{}", row.trim_end())?;
    }
    Ok(())
}

fn write_messages(lines: &[MessageLine], out: &mut impl Write) -> io::Result<()> {
    for line in lines {
        let receipt = line.receipt.map(receipt_label).unwrap_or_default();
        let replies = match line.replies {
            0 => String::new(),
            1 => " [1 reply]".to_owned(),
            n => format!(" [{n} replies]"),
        };
        let row =
            format!("  #{:<4} {:<8} {}{replies} {receipt}", line.id, line.sender, line.preview);
        writeln!(out, "{}", row.trim_end())?;
    }
    Ok(())
}

fn state_label(state: FetchState) -> &'static str {
    match state {
        FetchState::Loading => "loading",
        FetchState::Loaded => "loaded",
        FetchState::Empty => "empty",
        FetchState::Error => "error",
    }
}

fn receipt_label(icon: ReceiptIcon) -> &'static str {
    match icon {
        ReceiptIcon::Error => "!",
        ReceiptIcon::Read => "read",
        ReceiptIcon::Delivered => "delivered",
        ReceiptIcon::Sent => "sent",
        ReceiptIcon::Waiting => "...",
    }
}
