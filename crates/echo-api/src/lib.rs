pub mod error;
pub mod groups;
pub mod identity;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod reactions;
pub mod replies;
pub mod sweep;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tracing::error;

use echo_db::Database;
use echo_gateway::dispatcher::Dispatcher;
use echo_types::models::Millis;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    /// Inactivity after which a group chat is pruned.
    pub stale_after_ms: Millis,
}

/// All REST routes. The WebSocket gateway is mounted by the server.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/identity", post(identity::create_identity))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/trending", get(posts::trending))
        .route("/posts/live", get(posts::live))
        .route("/posts/search", get(posts::search))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}/reactions", post(reactions::apply_reaction))
        .route("/posts/{post_id}/replies", post(replies::add_reply))
        .route("/categories/{category}/posts", get(posts::by_category))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/{group_id}", get(groups::get_group))
        .route("/groups/{group_id}/sessions", post(groups::create_session))
        .route(
            "/groups/{group_id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/groups/{group_id}/messages/{message_id}",
            delete(messages::delete_message),
        )
        .route(
            "/groups/{group_id}/messages/{message_id}/reactions",
            post(messages::toggle_reaction),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.dispatcher.connection_count(),
    }))
}

/// Run a blocking DB call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}

pub(crate) fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}
