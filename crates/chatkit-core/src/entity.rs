//! Users, groups and conversation peers.
//!
//! A [`ChatTarget`] is the full entity a conversation is held with (or a
//! message is addressed to). A [`Peer`] is its identity only, and is what the
//! reducers key on: two targets with the same peer are the same conversation
//! even if their presence or membership attributes differ.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable user identifier.
pub type UserId = String;

/// Stable group identifier.
pub type GroupId = String;

/// Presence of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Connected to the chat backend.
    Online,
    /// Not connected.
    #[default]
    Offline,
}

/// A chat user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user ID.
    pub uid: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Presence.
    #[serde(default)]
    pub status: UserStatus,
    /// Last time the user was seen online (unix seconds).
    #[serde(default)]
    pub last_active_at: Option<i64>,
    /// The logged-in user blocked this user.
    #[serde(default)]
    pub blocked_by_me: bool,
    /// This user blocked the logged-in user.
    #[serde(default)]
    pub has_blocked_me: bool,
}

impl User {
    /// Create an offline user with no avatar.
    pub fn new(uid: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            avatar: None,
            status: UserStatus::Offline,
            last_active_at: None,
            blocked_by_me: false,
            has_blocked_me: false,
        }
    }

    /// Builder-style presence setter.
    #[must_use]
    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }
}

/// Group visibility and join policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    /// Anyone can join.
    #[default]
    Public,
    /// Members are added by admins.
    Private,
    /// Joining requires a password.
    Password,
}

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberScope {
    /// Full control over the group.
    Admin,
    /// Can moderate members and messages.
    Moderator,
    /// Regular member.
    Participant,
}

impl MemberScope {
    /// Lowercase label used in action previews.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::Participant => "participant",
        }
    }
}

/// A chat group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Stable group ID.
    pub guid: GroupId,
    /// Display name.
    pub name: String,
    /// Icon URL.
    #[serde(default)]
    pub icon: Option<String>,
    /// Visibility.
    #[serde(default)]
    pub group_type: GroupType,
    /// Logged-in user's scope. `None` if not a member.
    #[serde(default)]
    pub scope: Option<MemberScope>,
    /// The logged-in user is a member.
    #[serde(default)]
    pub has_joined: bool,
    /// Number of members.
    #[serde(default)]
    pub members_count: u32,
}

impl Group {
    /// Create a public group the logged-in user has joined.
    pub fn new(guid: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
            icon: None,
            group_type: GroupType::Public,
            scope: Some(MemberScope::Participant),
            has_joined: true,
            members_count: 0,
        }
    }
}

/// Whether a message is addressed to a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverType {
    /// One-to-one.
    User,
    /// Group.
    Group,
}

/// The entity a conversation is held with, or a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatTarget {
    /// One-to-one conversation.
    User(User),
    /// Group conversation.
    Group(Group),
}

impl ChatTarget {
    /// User or group ID.
    pub fn id(&self) -> &str {
        match self {
            Self::User(user) => &user.uid,
            Self::Group(group) => &group.guid,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::User(user) => &user.name,
            Self::Group(group) => &group.name,
        }
    }

    /// Receiver type of this target.
    pub fn receiver_type(&self) -> ReceiverType {
        match self {
            Self::User(_) => ReceiverType::User,
            Self::Group(_) => ReceiverType::Group,
        }
    }

    /// Identity of this target.
    pub fn peer(&self) -> Peer {
        Peer { kind: self.receiver_type(), id: self.id().to_owned() }
    }

    /// Is this a group target.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

/// Identity of a conversation from the logged-in user's point of view.
///
/// For one-to-one conversations this is the other user, never the logged-in
/// user; for groups it is the group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Peer {
    /// User or group.
    pub kind: ReceiverType,
    /// User or group ID.
    pub id: String,
}

impl Peer {
    /// One-to-one peer.
    pub fn user(uid: impl Into<String>) -> Self {
        Self { kind: ReceiverType::User, id: uid.into() }
    }

    /// Group peer.
    pub fn group(guid: impl Into<String>) -> Self {
        Self { kind: ReceiverType::Group, id: guid.into() }
    }

    /// Conversation ID assigned to conversations created locally.
    ///
    /// Conversations fetched from the SDK keep the SDK's ID; lookups always go
    /// through [`Peer`], so the two schemes never need to agree.
    pub fn conversation_id(&self) -> String {
        match self.kind {
            ReceiverType::User => format!("user_{}", self.id),
            ReceiverType::Group => format!("group_{}", self.id),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReceiverType::User => write!(f, "user:{}", self.id),
            ReceiverType::Group => write!(f, "group:{}", self.id),
        }
    }
}
