use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wall-clock milliseconds since the Unix epoch.
pub type Millis = i64;

// -- Reaction kinds --

/// Reactions a user can leave on a post. Hearts, flames and frowns are the
/// primary set; the rest are the emoji picker. All share one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Hearts,
    Flames,
    Frowns,
    Cry,
    Smile,
    Laugh,
    Neutral,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 7] = [
        ReactionKind::Hearts,
        ReactionKind::Flames,
        ReactionKind::Frowns,
        ReactionKind::Cry,
        ReactionKind::Smile,
        ReactionKind::Laugh,
        ReactionKind::Neutral,
    ];

    /// Kinds a freshly created post carries at zero.
    pub const PRIMARY: [ReactionKind; 3] =
        [ReactionKind::Hearts, ReactionKind::Flames, ReactionKind::Frowns];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hearts => "hearts",
            Self::Flames => "flames",
            Self::Frowns => "frowns",
            Self::Cry => "cry",
            Self::Smile => "smile",
            Self::Laugh => "laugh",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reactions attachable to a group chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageReactionKind {
    Like,
    Heart,
    Laugh,
    Wow,
    Sad,
}

impl MessageReactionKind {
    pub const ALL: [MessageReactionKind; 5] = [
        MessageReactionKind::Like,
        MessageReactionKind::Heart,
        MessageReactionKind::Laugh,
        MessageReactionKind::Wow,
        MessageReactionKind::Sad,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Heart => "heart",
            Self::Laugh => "laugh",
            Self::Wow => "wow",
            Self::Sad => "sad",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for MessageReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Categories --

/// Post category. The named variants are the built-in set; anything else a
/// user types in lands in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Trauma,
    Secrets,
    Confession,
    BodyCount,
    Heartbreak,
    Healing,
    Pressure,
    Anxiety,
    Family,
    Success,
    Other,
    Custom(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Trauma => "trauma",
            Self::Secrets => "secrets",
            Self::Confession => "confession",
            Self::BodyCount => "body-count",
            Self::Heartbreak => "heartbreak",
            Self::Healing => "healing",
            Self::Pressure => "pressure",
            Self::Anxiety => "anxiety",
            Self::Family => "family",
            Self::Success => "success",
            Self::Other => "other",
            Self::Custom(label) => label,
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "trauma" => Self::Trauma,
            "secrets" => Self::Secrets,
            "confession" => Self::Confession,
            "body-count" => Self::BodyCount,
            "heartbreak" => Self::Heartbreak,
            "healing" => Self::Healing,
            "pressure" => Self::Pressure,
            "anxiety" => Self::Anxiety,
            "family" => Self::Family,
            "success" => Self::Success,
            "other" => Self::Other,
            _ => Self::Custom(raw),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Custom(label) => label,
            named => named.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Posts --

/// Stored form of a post. Clients never see it directly; they get an
/// [`crate::api::PostView`] without the per-identity maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub timestamp: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default)]
    pub reactions: BTreeMap<ReactionKind, u32>,
    /// user id -> the single reaction that user currently holds
    #[serde(default)]
    pub user_reactions: BTreeMap<String, ReactionKind>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Post {
    pub fn reaction_count(&self, kind: ReactionKind) -> u32 {
        self.reactions.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub content: String,
    pub timestamp: Millis,
    pub user_id: String,
}

// -- Groups --

/// Group chat. Stored records may lack either timestamp; one missing both
/// is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub created_at: Option<Millis>,
    #[serde(default)]
    pub last_message_time: Option<Millis>,
}

impl Group {
    /// Time of the last message, falling back to creation time.
    pub fn last_activity(&self) -> Option<Millis> {
        self.last_message_time.or(self.created_at)
    }
}

/// Copy of the message being replied to, taken at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySnapshot {
    pub id: Uuid,
    pub text: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub text: String,
    /// Ephemeral chat session id of the author.
    pub sender: String,
    pub timestamp: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplySnapshot>,
    #[serde(default)]
    pub reactions: BTreeMap<MessageReactionKind, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_note_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_emoji: Option<String>,
}

impl GroupMessage {
    pub fn reaction_count(&self, kind: MessageReactionKind) -> usize {
        self.reactions.get(&kind).map_or(0, BTreeSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_string() {
        assert_eq!(Category::from("body-count".to_string()), Category::BodyCount);
        assert_eq!(
            Category::from("late night thoughts".to_string()),
            Category::Custom("late night thoughts".into())
        );
        assert_eq!(String::from(Category::Healing), "healing");
    }

    #[test]
    fn post_serializes_reaction_keys_as_names() {
        let mut post = Post {
            id: Uuid::nil(),
            content: "hello".into(),
            timestamp: 1,
            category: Some(Category::Secrets),
            reactions: BTreeMap::new(),
            user_reactions: BTreeMap::new(),
            replies: vec![],
        };
        post.reactions.insert(ReactionKind::Hearts, 2);
        post.user_reactions.insert("u1".into(), ReactionKind::Hearts);

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["reactions"]["hearts"], 2);
        assert_eq!(json["user_reactions"]["u1"], "hearts");
        assert_eq!(json["category"], "secrets");
    }

    #[test]
    fn unknown_reaction_name_does_not_parse() {
        assert_eq!(ReactionKind::parse("flames"), Some(ReactionKind::Flames));
        assert_eq!(ReactionKind::parse("angry"), None);
        assert_eq!(MessageReactionKind::parse("Wow"), None);
    }
}
