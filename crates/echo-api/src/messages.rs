use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use echo_engagement::content::{self, MessageDraft};
use echo_engagement::message_reactions;
use echo_types::api::{
    Claims, SendGroupMessageRequest, SessionQuery, ToggleMessageReactionRequest,
};
use echo_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::groups::require_session;
use crate::{AppState, now_millis, run_db};

/// Messages of a group, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = run_db(&state, move |db| {
        if db.get_group(group_id)?.is_none() {
            return Ok(None);
        }
        db.list_group_messages(group_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("group"))?;

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendGroupMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&state, group_id, &req.session_id, &claims).await?;

    // Replies quote the target as it is right now
    let reply_to = match req.reply_to {
        Some(target_id) => {
            let target = run_db(&state, move |db| db.get_group_message(group_id, target_id))
                .await?
                .ok_or(ApiError::NotFound("reply target"))?;
            Some(content::reply_snapshot(&target))
        }
        None => None,
    };

    let draft = MessageDraft {
        session_id: &req.session_id,
        text: &req.text,
        reply_to,
        voice_note_url: req.voice_note_url.as_deref(),
        profile_emoji: req.profile_emoji.as_deref(),
    };
    let message = content::new_group_message(Uuid::new_v4(), group_id, draft, now_millis())?;

    let stored = message.clone();
    let inserted = run_db(&state, move |db| db.insert_group_message(&stored)).await?;
    if !inserted {
        return Err(ApiError::NotFound("group"));
    }

    debug!("Message {} sent to group {}", message.id, group_id);
    state
        .dispatcher
        .broadcast(GatewayEvent::MessageCreate { message: message.clone() });

    Ok((StatusCode::CREATED, Json(message)))
}

/// Toggle the caller's session reaction on a message. The toggle runs inside
/// the store's write transaction, like post reactions.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path((group_id, message_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleMessageReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&state, group_id, &req.session_id, &claims).await?;

    let (updated, added) = run_db(&state, move |db| {
        db.update_message_reactions(group_id, message_id, |message| {
            message_reactions::toggle(message, &req.session_id, &req.kind)
        })
    })
    .await?
    .ok_or(ApiError::NotFound("message"))??;

    state
        .dispatcher
        .broadcast(GatewayEvent::MessageUpdate { message: updated.clone() });

    Ok(Json(serde_json::json!({ "added": added, "message": updated })))
}

/// Only the session that sent a message may delete it, and only the
/// identity that opened that session may speak for it. Replies that quoted
/// the message keep their snapshot.
pub async fn delete_message(
    State(state): State<AppState>,
    Path((group_id, message_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&state, group_id, &query.session_id, &claims).await?;

    let message = run_db(&state, move |db| db.get_group_message(group_id, message_id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;

    if message.sender != query.session_id {
        return Err(ApiError::Forbidden("only the sender can delete this message"));
    }

    // A concurrent delete by the same session already did the work
    let deleted = run_db(&state, move |db| db.delete_group_message(group_id, message_id)).await?;
    if deleted {
        state
            .dispatcher
            .broadcast(GatewayEvent::MessageDelete { group_id, message_id });
    }

    Ok(StatusCode::NO_CONTENT)
}
