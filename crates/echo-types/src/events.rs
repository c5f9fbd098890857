use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::PostView;
use crate::models::{Group, GroupMessage};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid },

    /// A new post was shared
    PostCreate { post: PostView },

    /// A post's reactions or replies changed
    PostUpdate { post: PostView },

    /// A group chat was created
    GroupCreate { group: Group },

    /// A group chat was pruned for inactivity
    GroupDelete { group_id: Uuid },

    /// A message was sent to a group
    MessageCreate { message: GroupMessage },

    /// A group message's reactions changed
    MessageUpdate { message: GroupMessage },

    /// A group message was deleted by its sender
    MessageDelete { group_id: Uuid, message_id: Uuid },
}

impl GatewayEvent {
    /// Returns the group_id if this event is scoped to a specific group chat.
    /// Events that return `None` are global and go to every client.
    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageCreate { message } => Some(message.group_id),
            Self::MessageUpdate { message } => Some(message.group_id),
            Self::MessageDelete { group_id, .. } => Some(*group_id),
            // Ready, posts and group create/delete are global
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Receive message events for these group chats only.
    /// Replaces any previous subscription.
    Subscribe { group_ids: Vec<Uuid> },
}
