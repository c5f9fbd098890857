use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use echo_engagement::ledger;
use echo_types::api::{ApplyReactionRequest, Claims, PostView};
use echo_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_db};

/// Apply the caller's reaction to a post. The store runs the ledger on the
/// current snapshot inside its write transaction, so concurrent reactions
/// are applied one after another and none is lost or refused.
pub async fn apply_reaction(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ApplyReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let viewer = user_id.clone();

    let updated = run_db(&state, move |db| {
        db.update_post_reactions(post_id, |post| ledger::apply(post, &user_id, &req.kind))
    })
    .await?
    .ok_or(ApiError::NotFound("post"))??;

    state.dispatcher.broadcast(GatewayEvent::PostUpdate {
        post: PostView::new(&updated, None),
    });

    Ok(Json(PostView::new(&updated, Some(&viewer))))
}
