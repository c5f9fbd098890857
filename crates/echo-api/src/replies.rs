use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use echo_engagement::content;
use echo_types::api::{Claims, CreateReplyRequest, PostView, ReplyView};
use echo_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, now_millis, run_db};

pub async fn add_reply(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let reply = content::new_reply(Uuid::new_v4(), &req.content, &user_id, now_millis())?;

    let stored = reply.clone();
    let post = run_db(&state, move |db| {
        if !db.insert_reply(post_id, &stored)? {
            return Ok(None);
        }
        db.get_post(post_id)
    })
    .await?
    .ok_or(ApiError::NotFound("post"))?;

    state.dispatcher.broadcast(GatewayEvent::PostUpdate {
        post: PostView::new(&post, None),
    });

    Ok((StatusCode::CREATED, Json(ReplyView::new(&reply, Some(&user_id)))))
}
