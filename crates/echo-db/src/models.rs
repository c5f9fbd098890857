//! Database row types, mapped straight from SQLite rows, plus their
//! conversion into the shared models. Maps and the reply snapshot are stored
//! as JSON text.

use anyhow::Result;
use echo_types::models::{Category, Group, GroupMessage, Post, Reply};
use uuid::Uuid;

pub struct PostRow {
    pub id: String,
    pub content: String,
    pub timestamp: i64,
    pub category: Option<String>,
    pub reactions: String,
    pub user_reactions: String,
}

impl PostRow {
    pub fn into_post(self, replies: Vec<Reply>) -> Result<Post> {
        Ok(Post {
            id: self.id.parse()?,
            content: self.content,
            timestamp: self.timestamp,
            category: self.category.map(Category::from),
            reactions: serde_json::from_str(&self.reactions)?,
            user_reactions: serde_json::from_str(&self.user_reactions)?,
            replies,
        })
    }
}

pub struct ReplyRow {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub timestamp: i64,
    pub user_id: String,
}

impl ReplyRow {
    pub fn into_reply(self) -> Result<Reply> {
        Ok(Reply {
            id: self.id.parse()?,
            content: self.content,
            timestamp: self.timestamp,
            user_id: self.user_id,
        })
    }
}

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub created_at: Option<i64>,
    pub last_message_time: Option<i64>,
}

impl GroupRow {
    pub fn into_group(self) -> Result<Group> {
        Ok(Group {
            id: self.id.parse()?,
            name: self.name,
            category: self.category,
            description: self.description,
            created_at: self.created_at,
            last_message_time: self.last_message_time,
        })
    }
}

pub struct MessageRow {
    pub id: String,
    pub group_id: String,
    pub text: String,
    pub sender: String,
    pub timestamp: i64,
    pub reply_to: Option<String>,
    pub reactions: String,
    pub voice_note_url: Option<String>,
    pub profile_emoji: Option<String>,
}

impl MessageRow {
    pub fn into_message(self) -> Result<GroupMessage> {
        let reply_to = match self.reply_to {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };

        Ok(GroupMessage {
            id: self.id.parse()?,
            group_id: self.group_id.parse::<Uuid>()?,
            text: self.text,
            sender: self.sender,
            timestamp: self.timestamp,
            reply_to,
            reactions: serde_json::from_str(&self.reactions)?,
            voice_note_url: self.voice_note_url,
            profile_emoji: self.profile_emoji,
        })
    }
}
