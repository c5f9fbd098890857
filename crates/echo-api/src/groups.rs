use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use echo_engagement::content;
use echo_types::api::{Claims, CreateGroupRequest, SessionResponse};
use echo_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, now_millis, run_db, sweep};

const SESSION_ID_LEN: usize = 9;
const SESSION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Sweep inactive groups, then list the survivors.
pub async fn list_groups(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    sweep::prune_inactive_groups(&state).await?;

    let groups = run_db(&state, |db| db.list_groups()).await?;
    Ok(Json(groups))
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = content::new_group(
        Uuid::new_v4(),
        &req.name,
        &req.category,
        &req.description,
        now_millis(),
    )?;

    let stored = group.clone();
    run_db(&state, move |db| db.insert_group(&stored)).await?;

    info!("Group {} '{}' created", group.id, group.name);
    state
        .dispatcher
        .broadcast(GatewayEvent::GroupCreate { group: group.clone() });

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let group = run_db(&state, move |db| db.get_group(group_id))
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    Ok(Json(group))
}

/// Hand out an ephemeral chat identity for one visit to a group. The id is
/// shown next to every message it sends, so it is bound to the caller's
/// identity here and only that identity may act as it later.
pub async fn create_session(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = new_session_id();
    let owner = claims.sub.to_string();

    let stored = session_id.clone();
    let created = run_db(&state, move |db| {
        db.insert_chat_session(&stored, group_id, &owner, now_millis())
    })
    .await?;
    if !created {
        return Err(ApiError::NotFound("group"));
    }

    debug!("Session {} opened in group {}", session_id, group_id);
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id })))
}

/// Fail with 403 unless `session_id` was opened in this group by `claims`,
/// or 404 if the group is gone.
pub(crate) async fn require_session(
    state: &AppState,
    group_id: Uuid,
    session_id: &str,
    claims: &Claims,
) -> Result<(), ApiError> {
    let session = session_id.to_string();
    let owner = run_db(state, move |db| {
        if db.get_group(group_id)?.is_none() {
            return Ok(None);
        }
        db.chat_session_owner(group_id, &session).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("group"))?;

    match owner {
        Some(owner) if owner == claims.sub.to_string() => Ok(()),
        _ => {
            warn!("{} tried to act as session {} in group {}", claims.sub, session_id, group_id);
            Err(ApiError::Forbidden("session does not belong to you"))
        }
    }
}

fn new_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ALPHABET[rng.random_range(0..SESSION_ALPHABET.len())] as char)
        .collect()
}
