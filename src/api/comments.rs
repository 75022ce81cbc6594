//! Comment API endpoints
//!
//! - GET    /api/v1/posts/{id}/comments - Comments on a published post
//! - POST   /api/v1/comments            - Comment as the signed-in user
//! - DELETE /api/v1/comments/{id}       - Remove a comment (staff)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, Action, Resource};
use crate::api::responses::CommentResponse;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: i64,
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", get(list_comments))
        .route("/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    authorize(Resource::Comments, Action::List, viewer.user())?;
    // Hidden posts answer 404 rather than an empty list
    let post = state.post_service.get(post_id).await?;
    if !post.is_published() {
        return Err(ApiError::not_found("Post not found"));
    }
    let comments = state.comment_service.list_for_post(post_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

async fn create_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    authorize(Resource::Comments, Action::Create, viewer.user())?;
    let user = viewer
        .user()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let comment = state
        .comment_service
        .create(user.id, body.post_id, &body.content)
        .await?;
    let avatar = state
        .site_service
        .profile(user.id)
        .await?
        .and_then(|p| p.image);

    let response = CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        user_id: comment.user_id,
        username: user.username.clone(),
        avatar,
        content: comment.content,
        created_at: comment.created_at.to_rfc3339(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn delete_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Comments, Action::Destroy, viewer.user())?;
    state.comment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
