use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Millis, Post, ReactionKind, Reply};

// -- JWT Claims --

/// Claims of an anonymous identity token. Shared by echo-api (REST
/// middleware) and echo-gateway (WebSocket Identify).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Identity --

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub user_id: Uuid,
    pub token: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyReactionRequest {
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReplyRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// A post as one viewer sees it. Reaction totals are public; who reacted
/// with what is not, so only the viewer's own reaction is included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub content: String,
    pub timestamp: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub reactions: BTreeMap<ReactionKind, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_reaction: Option<ReactionKind>,
    pub replies: Vec<ReplyView>,
}

impl PostView {
    /// Render `post` for `viewer`. With no viewer (gateway broadcasts) the
    /// view carries nothing tied to an identity.
    pub fn new(post: &Post, viewer: Option<&str>) -> Self {
        Self {
            id: post.id,
            content: post.content.clone(),
            timestamp: post.timestamp,
            category: post.category.clone(),
            reactions: post.reactions.clone(),
            my_reaction: viewer.and_then(|v| post.user_reactions.get(v).copied()),
            replies: post
                .replies
                .iter()
                .map(|reply| ReplyView::new(reply, viewer))
                .collect(),
        }
    }
}

/// A reply without its author; `mine` marks the viewer's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyView {
    pub id: Uuid,
    pub content: String,
    pub timestamp: Millis,
    #[serde(default)]
    pub mine: bool,
}

impl ReplyView {
    pub fn new(reply: &Reply, viewer: Option<&str>) -> Self {
        Self {
            id: reply.id,
            content: reply.content.clone(),
            timestamp: reply.timestamp,
            mine: viewer == Some(reply.user_id.as_str()),
        }
    }
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendGroupMessageRequest {
    pub session_id: String,
    #[serde(default)]
    pub text: String,
    /// Id of the message being replied to; the server snapshots it.
    #[serde(default)]
    pub reply_to: Option<Uuid>,
    #[serde(default)]
    pub voice_note_url: Option<String>,
    #[serde(default)]
    pub profile_emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleMessageReactionRequest {
    pub session_id: String,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}
