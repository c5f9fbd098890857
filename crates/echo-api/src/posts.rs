use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use echo_engagement::{content, feed, trending};
use echo_types::api::{Claims, CreatePostRequest, PostView, SearchQuery};
use echo_types::events::GatewayEvent;
use echo_types::models::Post;

use crate::error::ApiError;
use crate::{AppState, now_millis, run_db};

/// Posts carry no author: the creator's identity is required to call this
/// but is not stored on the post.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = content::new_post(
        Uuid::new_v4(),
        &req.content,
        req.category.as_deref(),
        now_millis(),
    )?;

    let stored = post.clone();
    run_db(&state, move |db| db.insert_post(&stored)).await?;

    debug!("Post {} created (category: {:?})", post.id, post.category);
    state.dispatcher.broadcast(GatewayEvent::PostCreate {
        post: PostView::new(&post, None),
    });

    Ok((StatusCode::CREATED, Json(view(&post, &claims))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let post = run_db(&state, move |db| db.get_post(post_id))
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(view(&post, &claims)))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let mut posts = all_posts(&state).await?;
    feed::newest_first(&mut posts);
    Ok(Json(views(&posts, &claims)))
}

pub async fn trending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = all_posts(&state).await?;
    Ok(Json(views(&trending::rank(&posts), &claims)))
}

pub async fn live(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = all_posts(&state).await?;
    Ok(Json(views(&feed::live(&posts, feed::LIVE_FEED_LIMIT), &claims)))
}

pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut posts = all_posts(&state).await?;
    feed::newest_first(&mut posts);
    Ok(Json(views(&feed::search(&posts, &query.q), &claims)))
}

pub async fn by_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut posts = all_posts(&state).await?;
    feed::newest_first(&mut posts);
    Ok(Json(views(&feed::by_category(&posts, &category), &claims)))
}

async fn all_posts(state: &AppState) -> Result<Vec<Post>, ApiError> {
    run_db(state, |db| db.list_posts()).await
}

fn view(post: &Post, claims: &Claims) -> PostView {
    PostView::new(post, Some(&claims.sub.to_string()))
}

fn views(posts: &[Post], claims: &Claims) -> Vec<PostView> {
    let viewer = claims.sub.to_string();
    posts
        .iter()
        .map(|post| PostView::new(post, Some(&viewer)))
        .collect()
}
