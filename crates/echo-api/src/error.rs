use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use echo_engagement::EngagementError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engagement(#[from] EngagementError),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is authenticated but may not act as this chat session
    /// or on this message.
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("internal error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engagement(EngagementError::MissingTimestamp(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Engagement(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Storage detail stays in the log
        if let Self::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let err = ApiError::from(EngagementError::InvalidReactionKind("angry".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "unknown reaction kind 'angry'");

        let err = ApiError::from(EngagementError::MissingTimestamp(Uuid::nil()));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = ApiError::from(anyhow::anyhow!("disk I/O error at page 7"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "internal error");
    }
}
