use thiserror::Error;
use uuid::Uuid;

/// Rejections raised by the engagement rules. None of them are fatal; each
/// is handed back to the caller to report or repair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngagementError {
    #[error("unknown reaction kind '{0}'")]
    InvalidReactionKind(String),

    /// Group record carries neither `last_message_time` nor `created_at`.
    #[error("group {0} has no activity timestamp")]
    MissingTimestamp(Uuid),

    #[error("{0} must not be empty")]
    EmptyContent(&'static str),

    #[error("unknown group category '{0}'")]
    InvalidGroupCategory(String),

    #[error("'{0}' is not an available profile emoji")]
    InvalidProfileEmoji(String),
}

pub type Result<T> = std::result::Result<T, EngagementError>;
