// Catalog domain models - categories, destination channels and the links between them.
//
// Pure data, no Discord types. A channel "handle" is whatever the delivery
// layer uses to address a destination (for Discord, the channel snowflake).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CategoryId = i64;
pub type ChannelId = i64;

/// A node in the category tree.
///
/// The tree is stored as parent pointers. Parents are validated at write time
/// (see the catalog seed loader) so walking up always terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub active: bool,
    pub sort_order: i32,
}

/// How a channel treats incoming ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationMode {
    /// Publish immediately.
    #[default]
    Auto,
    /// Hold for a reviewer decision.
    Moderated,
}

impl ModerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationMode::Auto => "auto",
            ModerationMode::Moderated => "moderated",
        }
    }
}

impl fmt::Display for ModerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ModerationMode::Auto),
            "moderated" | "moderation" | "manual" => Ok(ModerationMode::Moderated),
            other => Err(format!("unknown moderation mode '{other}'")),
        }
    }
}

/// A publication destination with its own policy toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub handle: String,
    /// Display name, also the sort key for resolved channel lists.
    pub title: String,
    pub active: bool,
    pub mode: ModerationMode,
    pub spam_filter: bool,
    /// When set, the spam filter only looks at unpaid ads.
    pub spam_filter_free_only: bool,
    pub require_subscription: bool,
    pub subscription_channel: Option<String>,
    pub footer_text: Option<String>,
    pub footer_link: Option<String>,
    pub pinned_message_id: Option<u64>,
}

impl Channel {
    /// An active auto channel with every filter off. The id is assigned by the store.
    pub fn new(handle: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            handle: handle.into(),
            title: title.into(),
            active: true,
            mode: ModerationMode::Auto,
            spam_filter: false,
            spam_filter_free_only: true,
            require_subscription: false,
            subscription_channel: None,
            footer_text: None,
            footer_link: None,
            pinned_message_id: None,
        }
    }

    /// Which handle a user must be subscribed to before this channel accepts their ad.
    ///
    /// Channel-specific target first, then the channel itself, then the global target.
    pub fn subscription_target<'a>(&'a self, global: Option<&'a str>) -> Option<&'a str> {
        non_empty(self.subscription_channel.as_deref())
            .or_else(|| non_empty(Some(self.handle.as_str())))
            .or_else(|| non_empty(global))
    }

    /// Whether the per-channel spam filter applies to an ad with the given paid flag.
    pub fn filters_ad(&self, paid: bool) -> bool {
        self.spam_filter && (!self.spam_filter_free_only || !paid)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Many-to-many link between a category and a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChannel {
    pub category_id: CategoryId,
    pub channel_id: ChannelId,
    /// Soft-disable without deleting the link.
    pub enabled: bool,
}
