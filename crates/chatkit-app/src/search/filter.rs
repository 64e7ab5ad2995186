//! Search filter tags and their exclusivity rules.
//!
//! Filters fall into two families. Conversation filters (`Conversations`,
//! `Unread`, `Groups`) restrict the search to conversations; message filters
//! (`Messages`, the media filters, `Links`) restrict it to messages. Turning on
//! a filter from one family turns off every filter of the other. Within the
//! message family, `Links` and the media filters also exclude each other.

use std::collections::BTreeSet;

use chatkit_core::MediaKind;
use serde::{Deserialize, Serialize};

/// A search filter tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    /// Conversations only.
    Conversations,
    /// Messages only.
    Messages,
    /// Conversations with unread messages.
    Unread,
    /// Group conversations.
    Groups,
    /// Image messages.
    Photos,
    /// Video messages.
    Videos,
    /// Messages containing links.
    Links,
    /// File messages.
    Documents,
    /// Audio messages.
    Audio,
}

impl SearchFilter {
    /// Every filter, in display order.
    pub const ALL: [Self; 9] = [
        Self::Conversations,
        Self::Messages,
        Self::Unread,
        Self::Groups,
        Self::Photos,
        Self::Videos,
        Self::Links,
        Self::Documents,
        Self::Audio,
    ];

    /// Media kind matched by a media filter.
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            Self::Photos => Some(MediaKind::Image),
            Self::Videos => Some(MediaKind::Video),
            Self::Documents => Some(MediaKind::File),
            Self::Audio => Some(MediaKind::Audio),
            Self::Conversations | Self::Messages | Self::Unread | Self::Groups | Self::Links => {
                None
            },
        }
    }

    /// Filter applies to conversations only.
    pub fn is_conversation_filter(self) -> bool {
        matches!(self, Self::Conversations | Self::Unread | Self::Groups)
    }

    /// Filter applies to messages only.
    pub fn is_message_filter(self) -> bool {
        !self.is_conversation_filter()
    }

    /// Filter makes a query valid without a keyword.
    pub fn is_standalone(self) -> bool {
        !matches!(self, Self::Conversations | Self::Messages)
    }

    /// Check if `self` and `other` cannot be active together.
    pub fn excludes(self, other: Self) -> bool {
        if self == other {
            return false;
        }
        if self.is_conversation_filter() != other.is_conversation_filter() {
            return true;
        }
        (self == Self::Links && other.media_kind().is_some())
            || (other == Self::Links && self.media_kind().is_some())
    }
}

/// Which result sections a search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchScopes {
    /// Search conversations.
    pub conversations: bool,
    /// Search messages.
    pub messages: bool,
}

/// Set of active filters. Never holds two filters that exclude each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    active: BTreeSet<SearchFilter>,
}

impl FilterSet {
    /// No filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn `filter` on or off. Turning it on clears every filter it
    /// excludes.
    ///
    /// Returns `true` if `filter` is now active.
    pub fn toggle(&mut self, filter: SearchFilter) -> bool {
        if self.active.remove(&filter) {
            return false;
        }
        self.active.retain(|other| !filter.excludes(*other));
        self.active.insert(filter);
        true
    }

    /// Check if `filter` is active.
    pub fn contains(&self, filter: SearchFilter) -> bool {
        self.active.contains(&filter)
    }

    /// Active filters, in display order.
    pub fn iter(&self) -> impl Iterator<Item = SearchFilter> + '_ {
        self.active.iter().copied()
    }

    /// Check if no filter is active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Turn every filter off.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Sections to search.
    pub fn scopes(&self) -> SearchScopes {
        let conversation_only = self.iter().any(SearchFilter::is_conversation_filter);
        let message_only = self.iter().any(SearchFilter::is_message_filter);
        SearchScopes { conversations: !message_only, messages: !conversation_only }
    }

    /// Media kinds to restrict message results to.
    pub fn media(&self) -> Vec<MediaKind> {
        self.iter().filter_map(SearchFilter::media_kind).collect()
    }

    /// Only messages with links.
    pub fn has_links(&self) -> bool {
        self.contains(SearchFilter::Links)
    }

    /// Only conversations with unread messages.
    pub fn unread_only(&self) -> bool {
        self.contains(SearchFilter::Unread)
    }

    /// Only group conversations.
    pub fn groups_only(&self) -> bool {
        self.contains(SearchFilter::Groups)
    }
}

impl FromIterator<SearchFilter> for FilterSet {
    fn from_iter<T: IntoIterator<Item = SearchFilter>>(iter: T) -> Self {
        let mut set = Self::new();
        for filter in iter {
            if !set.contains(filter) {
                set.toggle(filter);
            }
        }
        set
    }
}

/// Check if `keyword` and `filters` make a query worth sending.
///
/// A query needs a non-blank keyword or at least one filter that selects
/// results by itself (anything but `Conversations` and `Messages`).
pub fn is_valid_query(keyword: &str, filters: &FilterSet) -> bool {
    !keyword.trim().is_empty() || filters.iter().any(SearchFilter::is_standalone)
}
