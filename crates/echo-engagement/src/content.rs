//! Boundary checks and construction of new posts, replies, groups and chat
//! messages. Ids and timestamps come from the caller.

use std::collections::BTreeMap;

use echo_types::models::{
    Category, Group, GroupMessage, Millis, Post, ReactionKind, Reply, ReplySnapshot,
};
use uuid::Uuid;

use crate::error::{EngagementError, Result};

pub const GROUP_CATEGORIES: [&str; 10] = [
    "Technology",
    "Science",
    "Arts",
    "Sports",
    "Music",
    "Gaming",
    "Education",
    "Business",
    "Health",
    "Other",
];

/// Avatars a chat participant may pick. The first is the default.
pub const PROFILE_EMOJIS: [&str; 24] = [
    "🧑‍💻", "👩‍🎤", "👨‍🚀", "👩‍🔬",
    "👨‍🎨", "👩‍🏫", "👨‍⚕️", "👩‍🍳",
    "😎", "🤓", "🥸", "😇",
    "😜", "🥳", "😍", "🤖",
    "👽", "🐼", "🐱", "🐶",
    "🐸", "🦊", "🐯", "🐵",
];

/// Trimmed `text`, or `EmptyContent(field)` if nothing is left.
pub fn require_text<'a>(field: &'static str, text: &'a str) -> Result<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(EngagementError::EmptyContent(field))
    } else {
        Ok(trimmed)
    }
}

pub fn new_post(id: Uuid, content: &str, category: Option<&str>, now: Millis) -> Result<Post> {
    let content = require_text("content", content)?;
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| Category::from(c.to_string()));

    Ok(Post {
        id,
        content: content.to_string(),
        timestamp: now,
        category,
        reactions: ReactionKind::PRIMARY.into_iter().map(|k| (k, 0)).collect(),
        user_reactions: BTreeMap::new(),
        replies: vec![],
    })
}

pub fn new_reply(id: Uuid, content: &str, user_id: &str, now: Millis) -> Result<Reply> {
    let content = require_text("content", content)?;
    let user_id = require_text("user_id", user_id)?;

    Ok(Reply {
        id,
        content: content.to_string(),
        timestamp: now,
        user_id: user_id.to_string(),
    })
}

/// A new group counts its creation as its first activity.
pub fn new_group(
    id: Uuid,
    name: &str,
    category: &str,
    description: &str,
    now: Millis,
) -> Result<Group> {
    let name = require_text("name", name)?;
    let description = require_text("description", description)?;
    let category = require_text("category", category)?;
    if !GROUP_CATEGORIES.contains(&category) {
        return Err(EngagementError::InvalidGroupCategory(category.to_string()));
    }

    Ok(Group {
        id,
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        created_at: Some(now),
        last_message_time: Some(now),
    })
}

/// What a chat participant submitted, already resolved against the store.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft<'a> {
    pub session_id: &'a str,
    pub text: &'a str,
    pub reply_to: Option<ReplySnapshot>,
    pub voice_note_url: Option<&'a str>,
    pub profile_emoji: Option<&'a str>,
}

/// Text may only be blank when a voice note is attached. Text is kept as
/// written; a blank caption on a voice note is stored empty.
pub fn new_group_message(
    id: Uuid,
    group_id: Uuid,
    draft: MessageDraft<'_>,
    now: Millis,
) -> Result<GroupMessage> {
    let sender = require_text("session_id", draft.session_id)?;
    let voice_note_url = draft
        .voice_note_url
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string);

    let text = if draft.text.trim().is_empty() {
        if voice_note_url.is_none() {
            return Err(EngagementError::EmptyContent("text"));
        }
        String::new()
    } else {
        draft.text.to_string()
    };

    let profile_emoji = match draft.profile_emoji {
        None => PROFILE_EMOJIS[0],
        Some(emoji) if PROFILE_EMOJIS.contains(&emoji) => emoji,
        Some(other) => return Err(EngagementError::InvalidProfileEmoji(other.to_string())),
    };

    Ok(GroupMessage {
        id,
        group_id,
        text,
        sender: sender.to_string(),
        timestamp: now,
        reply_to: draft.reply_to,
        reactions: BTreeMap::new(),
        voice_note_url,
        profile_emoji: Some(profile_emoji.to_string()),
    })
}

/// Freeze the parts of `message` a reply shows.
pub fn reply_snapshot(message: &GroupMessage) -> ReplySnapshot {
    ReplySnapshot {
        id: message.id,
        text: message.text.clone(),
        sender: message.sender.clone(),
    }
}
