use echo_types::models::{GroupMessage, MessageReactionKind};
use tracing::debug;

use crate::content::require_text;
use crate::error::{EngagementError, Result};

/// Toggle `session_id`'s `kind` reaction on a chat message. Unlike post
/// reactions, a session may hold several kinds at once.
///
/// Returns the updated message and whether the reaction was added.
pub fn toggle(message: &GroupMessage, session_id: &str, kind: &str) -> Result<(GroupMessage, bool)> {
    let session_id = require_text("session_id", session_id)?;
    let kind = MessageReactionKind::parse(kind)
        .ok_or_else(|| EngagementError::InvalidReactionKind(kind.to_string()))?;

    let mut next = message.clone();
    let sessions = next.reactions.entry(kind).or_default();
    let added = if sessions.remove(session_id) {
        false
    } else {
        sessions.insert(session_id.to_string());
        true
    };
    if sessions.is_empty() {
        next.reactions.remove(&kind);
    }

    debug!(
        "message {}: {} {} {}",
        message.id,
        session_id,
        if added { "added" } else { "removed" },
        kind
    );
    Ok((next, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn message() -> GroupMessage {
        GroupMessage {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            text: "who else is awake".into(),
            sender: "s1".into(),
            timestamp: 0,
            reply_to: None,
            reactions: BTreeMap::new(),
            voice_note_url: None,
            profile_emoji: None,
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        let original = message();

        let (on, added) = toggle(&original, "s2", "wow").unwrap();
        assert!(added);
        assert_eq!(on.reaction_count(MessageReactionKind::Wow), 1);

        let (off, added) = toggle(&on, "s2", "wow").unwrap();
        assert!(!added);
        assert_eq!(off, original);
    }

    #[test]
    fn sessions_may_hold_several_kinds() {
        let (m, _) = toggle(&message(), "s2", "like").unwrap();
        let (m, _) = toggle(&m, "s2", "heart").unwrap();
        let (m, _) = toggle(&m, "s3", "heart").unwrap();
        assert_eq!(m.reaction_count(MessageReactionKind::Like), 1);
        assert_eq!(m.reaction_count(MessageReactionKind::Heart), 2);
    }

    #[test]
    fn rejects_unknown_kind_and_blank_session() {
        assert_eq!(
            toggle(&message(), "s2", "hearts").unwrap_err(),
            EngagementError::InvalidReactionKind("hearts".into())
        );
        assert_eq!(
            toggle(&message(), " ", "like").unwrap_err(),
            EngagementError::EmptyContent("session_id")
        );
    }
}
