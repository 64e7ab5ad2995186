//! Display derivations for list rows.
//!
//! Pure functions from SDK objects to plain English labels and icon enums.
//! Nothing here is cached; hosts call these on every render and localize the
//! result as they see fit.

use std::fmt;

use chatkit_core::{
    Attachment, Call, CallStatus, CallType, ChatTarget, Conversation, GroupAction, MediaKind,
    MembershipChange, Message, MessageKind, User,
};
use serde::Serialize;

use crate::typing::TypingIndicatorMap;

/// Preview shown for a deleted message.
pub const DELETED_PREVIEW: &str = "This message was deleted";

/// Delivery status icon of an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptIcon {
    /// Sending failed.
    Error,
    /// Read by the receiver.
    Read,
    /// Delivered to the receiver.
    Delivered,
    /// Accepted by the server.
    Sent,
    /// Still sending.
    Waiting,
}

/// Receipt icon of `message`. The most advanced state wins, except that a
/// failure always shows as an error.
pub fn receipt_icon(message: &Message) -> ReceiptIcon {
    if message.failed {
        ReceiptIcon::Error
    } else if message.read_at.is_some() {
        ReceiptIcon::Read
    } else if message.delivered_at.is_some() {
        ReceiptIcon::Delivered
    } else if message.sent_at.is_some() || message.id != 0 {
        ReceiptIcon::Sent
    } else {
        ReceiptIcon::Waiting
    }
}

/// Call status as seen by one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatusLabel {
    /// I am calling.
    Outgoing,
    /// Someone is calling me.
    Incoming,
    /// The call is in progress.
    Ongoing,
    /// I called and nobody picked up.
    Unanswered,
    /// Someone called and I did not pick up.
    Missed,
    /// I called and the receiver declined.
    Declined,
    /// Someone called and I declined.
    Rejected,
    /// I called and the receiver was busy.
    Busy,
    /// I withdrew my call.
    Cancelled,
    /// The call finished.
    Ended,
}

impl CallStatusLabel {
    /// English label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outgoing => "Outgoing call",
            Self::Incoming => "Incoming call",
            Self::Ongoing => "Ongoing call",
            Self::Unanswered => "Unanswered call",
            Self::Missed => "Missed call",
            Self::Declined => "Call declined",
            Self::Rejected => "Call rejected",
            Self::Busy => "Busy",
            Self::Cancelled => "Cancelled call",
            Self::Ended => "Call ended",
        }
    }
}

impl fmt::Display for CallStatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of `call` as seen by the user `me`.
pub fn call_status(call: &Call, me: &str) -> CallStatusLabel {
    let initiated_by_me = call.initiator.uid == me;
    match (call.status, initiated_by_me) {
        (CallStatus::Initiated, true) => CallStatusLabel::Outgoing,
        (CallStatus::Initiated, false) => CallStatusLabel::Incoming,
        (CallStatus::Ongoing, _) => CallStatusLabel::Ongoing,
        (CallStatus::Unanswered, true) => CallStatusLabel::Unanswered,
        (CallStatus::Rejected, true) => CallStatusLabel::Declined,
        (CallStatus::Rejected, false) => CallStatusLabel::Rejected,
        (CallStatus::Busy, true) => CallStatusLabel::Busy,
        (CallStatus::Cancelled, true) => CallStatusLabel::Cancelled,
        (CallStatus::Unanswered | CallStatus::Busy | CallStatus::Cancelled, false) => {
            CallStatusLabel::Missed
        },
        (CallStatus::Ended, _) => CallStatusLabel::Ended,
    }
}

/// One-line preview of `message` for the user `me`.
///
/// Group previews of regular and custom messages are prefixed with the
/// sender's name, or "You" for own messages.
pub fn message_preview(message: &Message, me: &str) -> String {
    if message.is_deleted() {
        return DELETED_PREVIEW.to_owned();
    }

    let body = match &message.kind {
        MessageKind::Text { text } => text.clone(),
        MessageKind::Media { media, attachment, caption } => {
            media_preview(*media, attachment.as_ref(), caption.as_deref())
        },
        MessageKind::Custom { custom_type, data } => custom_preview(custom_type, data),
        MessageKind::Call(call) => return call_preview(call, me),
        MessageKind::Action(action) => return action_preview(action, me),
    };

    if message.receiver.is_group() {
        format!("{}: {body}", display_name(&message.sender, me))
    } else {
        body
    }
}

fn media_preview(
    media: MediaKind,
    attachment: Option<&Attachment>,
    caption: Option<&str>,
) -> String {
    if let Some(caption) = caption.filter(|c| !c.trim().is_empty()) {
        return caption.to_owned();
    }
    match media {
        MediaKind::Image => "Photo".to_owned(),
        MediaKind::Video => "Video".to_owned(),
        MediaKind::Audio => "Audio".to_owned(),
        MediaKind::File => {
            attachment.map_or_else(|| "File".to_owned(), |attachment| attachment.name.clone())
        },
    }
}

fn custom_preview(
    custom_type: &str,
    data: &std::collections::BTreeMap<String, String>,
) -> String {
    let label = match custom_type {
        "extension_poll" => "Poll",
        "extension_sticker" => "Sticker",
        "extension_document" => "Collaborative document",
        "extension_whiteboard" => "Collaborative whiteboard",
        "meeting" => "Meeting",
        _ => return data.get("text").cloned().unwrap_or_else(|| "Custom message".to_owned()),
    };
    match data.get("question").or_else(|| data.get("title")) {
        Some(detail) => format!("{label}: {detail}"),
        None => label.to_owned(),
    }
}

fn call_preview(call: &Call, me: &str) -> String {
    let kind = match call.call_type {
        CallType::Audio => "Voice",
        CallType::Video => "Video",
    };
    let status = match call_status(call, me) {
        CallStatusLabel::Outgoing => "Outgoing",
        CallStatusLabel::Incoming => "Incoming",
        CallStatusLabel::Ongoing => "Ongoing",
        CallStatusLabel::Unanswered => "Unanswered",
        CallStatusLabel::Missed => "Missed",
        CallStatusLabel::Declined => "Declined",
        CallStatusLabel::Rejected => "Rejected",
        CallStatusLabel::Busy => "Busy",
        CallStatusLabel::Cancelled => "Cancelled",
        CallStatusLabel::Ended => "Ended",
    };
    format!("{kind} call: {status}")
}

fn action_preview(action: &GroupAction, me: &str) -> String {
    let actor = display_name(&action.actor, me);
    let member = display_name(&action.member, me);
    match action.change {
        MembershipChange::Joined => format!("{member} joined"),
        MembershipChange::Left => format!("{member} left"),
        MembershipChange::Added => format!("{actor} added {member}"),
        MembershipChange::Kicked => format!("{actor} removed {member}"),
        MembershipChange::Banned => format!("{actor} banned {member}"),
        MembershipChange::Unbanned => format!("{actor} unbanned {member}"),
        MembershipChange::ScopeChanged { scope } => {
            format!("{actor} made {member} {}", scope.as_str())
        },
    }
}

fn display_name<'a>(user: &'a User, me: &str) -> &'a str {
    if user.uid == me { "You" } else { &user.name }
}

/// Second line of a conversation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Subtitle {
    /// Someone is typing.
    Typing(String),
    /// Preview of the last message.
    Preview(String),
    /// Conversation has no messages.
    Empty,
}

impl Subtitle {
    /// Text to show.
    pub fn text(&self) -> &str {
        match self {
            Self::Typing(text) | Self::Preview(text) => text,
            Self::Empty => "",
        }
    }
}

/// Subtitle of `conversation`. A live typing indicator replaces the preview.
pub fn conversation_subtitle(
    conversation: &Conversation,
    typing: &TypingIndicatorMap,
    me: &str,
) -> Subtitle {
    if let Some(indicator) = typing.get(&conversation.peer()) {
        return match conversation.with {
            ChatTarget::Group(_) => {
                Subtitle::Typing(format!("{} is typing...", indicator.sender.name))
            },
            ChatTarget::User(_) => Subtitle::Typing("typing...".to_owned()),
        };
    }
    match &conversation.last_message {
        Some(message) => Subtitle::Preview(message_preview(message, me)),
        None => Subtitle::Empty,
    }
}

/// Icon for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileIcon {
    /// Image.
    Image,
    /// Video.
    Video,
    /// Audio.
    Audio,
    /// PDF.
    Pdf,
    /// Word processor document.
    Document,
    /// Spreadsheet.
    Spreadsheet,
    /// Slides.
    Presentation,
    /// Compressed archive.
    Archive,
    /// Plain text.
    Text,
    /// Anything else.
    Unknown,
}

/// Icon for a MIME type. Parameters (`; charset=...`) and case are ignored.
pub fn file_icon(mime: &str) -> FileIcon {
    let mime = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let (kind, subtype) = mime.split_once('/').unwrap_or((mime.as_str(), ""));

    match kind {
        "image" => return FileIcon::Image,
        "video" => return FileIcon::Video,
        "audio" => return FileIcon::Audio,
        _ => {},
    }

    match subtype {
        "pdf" => FileIcon::Pdf,
        "csv" => FileIcon::Spreadsheet,
        "zip" | "gzip" | "x-tar" | "x-7z-compressed" | "x-rar-compressed" | "vnd.rar" => {
            FileIcon::Archive
        },
        s if s.contains("wordprocessingml") || s == "msword" || s == "rtf" => FileIcon::Document,
        s if s.contains("spreadsheetml") || s == "vnd.ms-excel" => FileIcon::Spreadsheet,
        s if s.contains("presentationml") || s == "vnd.ms-powerpoint" => FileIcon::Presentation,
        _ if kind == "text" => FileIcon::Text,
        _ => FileIcon::Unknown,
    }
}

/// Icon for a media message attachment. File attachments without a MIME
/// type fall back to the file extension.
pub fn attachment_icon(media: MediaKind, attachment: Option<&Attachment>) -> FileIcon {
    match media {
        MediaKind::Image => FileIcon::Image,
        MediaKind::Video => FileIcon::Video,
        MediaKind::Audio => FileIcon::Audio,
        MediaKind::File => match attachment {
            Some(attachment) if !attachment.mime_type.is_empty() => {
                file_icon(&attachment.mime_type)
            },
            Some(attachment) => extension_icon(&attachment.name),
            None => FileIcon::Unknown,
        },
    }
}

fn extension_icon(name: &str) -> FileIcon {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "heic") => FileIcon::Image,
        Some("mp4" | "mov" | "webm" | "mkv") => FileIcon::Video,
        Some("mp3" | "wav" | "ogg" | "m4a" | "aac") => FileIcon::Audio,
        Some("pdf") => FileIcon::Pdf,
        Some("doc" | "docx" | "odt" | "rtf") => FileIcon::Document,
        Some("xls" | "xlsx" | "ods" | "csv") => FileIcon::Spreadsheet,
        Some("ppt" | "pptx" | "odp") => FileIcon::Presentation,
        Some("zip" | "rar" | "7z" | "tar" | "gz") => FileIcon::Archive,
        Some("txt" | "md" | "log") => FileIcon::Text,
        _ => FileIcon::Unknown,
    }
}
