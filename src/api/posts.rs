//! Post API endpoints
//!
//! - GET    /api/v1/posts                         - Published posts (`?search=`)
//! - POST   /api/v1/posts                         - Create post
//! - GET    /api/v1/posts/{id}                    - Published post, counts a view
//! - PUT    /api/v1/posts/{id}                    - Replace post
//! - PATCH  /api/v1/posts/{id}                    - Partial update
//! - DELETE /api/v1/posts/{id}                    - Delete post
//! - GET    /api/v1/post-list-by-category/{id}    - Published posts in a category
//! - GET    /api/v1/post-list-by-tag/{id}         - Published posts with a tag
//! - GET    /api/v1/draft-list                    - Drafts
//! - GET    /api/v1/draft-detail/{id}             - One draft
//! - POST   /api/v1/post-publish                  - Publish a post (staff)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::common::{IdRequest, ListQuery};
use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, Action, Resource};
use crate::api::responses::{PageResponse, PostResponse};
use crate::models::{CreatePostInput, PagedResult, Post, PostStatus, UpdatePostInput};

/// Request body for creating or replacing a post
#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    pub category_id: i64,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    /// Only honoured on create; use the publish action afterwards
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Request body for a partial update
#[derive(Debug, Default, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub featured_image: Option<String>,
    pub status: Option<PostStatus>,
    pub tag_ids: Option<Vec<i64>>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post)
                .put(update_post)
                .patch(patch_post)
                .delete(delete_post),
        )
        .route("/post-list-by-category/{id}", get(list_by_category))
        .route("/post-list-by-tag/{id}", get(list_by_tag))
        .route("/draft-list", get(list_drafts))
        .route("/draft-detail/{id}", get(get_draft))
        .route("/post-publish", post(publish_post))
}

async fn to_response(state: &AppState, post: Post) -> Result<PostResponse, ApiError> {
    let tag_ids = state.post_service.tag_ids(post.id).await?;
    Ok(PostResponse::from(post).with_tag_ids(tag_ids))
}

async fn to_page(
    state: &AppState,
    result: PagedResult<Post>,
) -> Result<PageResponse<PostResponse>, ApiError> {
    let total_pages = result.total_pages();
    let mut items = Vec::with_capacity(result.items.len());
    for post in result.items {
        items.push(to_response(state, post).await?);
    }
    Ok(PageResponse {
        items,
        total: result.total,
        page: result.page,
        page_size: result.per_page,
        total_pages,
    })
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<PostResponse>>, ApiError> {
    authorize(Resource::Posts, Action::List, viewer.user())?;

    let result = state
        .post_service
        .list_published(query.search.as_deref(), &query.params())
        .await?;
    Ok(Json(to_page(&state, result).await?))
}

/// GET /api/v1/posts/{id}
///
/// Only published posts are reachable here, and every hit counts as a view.
async fn get_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    authorize(Resource::Posts, Action::Retrieve, viewer.user())?;

    let post = state.post_service.view(id).await?;
    Ok(Json(to_response(&state, post).await?))
}

/// POST /api/v1/posts
///
/// The caller becomes the author.
async fn create_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<PostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    authorize(Resource::Posts, Action::Create, viewer.user())?;
    let author_id = viewer
        .user()
        .map(|u| u.id)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let input = CreatePostInput {
        title: body.title,
        content: body.content,
        featured_image: body.featured_image,
        author_id,
        category_id: body.category_id,
        status: body.status,
        published_at: body.published_at,
        tag_ids: body.tag_ids,
    };
    let post = state.post_service.create(input).await?;

    Ok((StatusCode::CREATED, Json(to_response(&state, post).await?)))
}

/// PUT /api/v1/posts/{id}
///
/// Acts on any post, published or not. Omitted optional fields are reset.
async fn update_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<PostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    authorize(Resource::Posts, Action::Update, viewer.user())?;

    let input = UpdatePostInput {
        title: Some(body.title),
        content: Some(body.content),
        featured_image: Some(body.featured_image),
        category_id: Some(body.category_id),
        status: Some(body.status.unwrap_or_default()),
        tag_ids: Some(body.tag_ids),
    };
    let post = state.post_service.update(id, input).await?;
    Ok(Json(to_response(&state, post).await?))
}

/// PATCH /api/v1/posts/{id}
async fn patch_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<PostPatch>,
) -> Result<Json<PostResponse>, ApiError> {
    authorize(Resource::Posts, Action::PartialUpdate, viewer.user())?;

    let input = UpdatePostInput {
        title: body.title,
        content: body.content,
        featured_image: body.featured_image.map(Some),
        category_id: body.category_id,
        status: body.status,
        tag_ids: body.tag_ids,
    };
    let post = if input.has_changes() {
        state.post_service.update(id, input).await?
    } else {
        state.post_service.get(id).await?
    };
    Ok(Json(to_response(&state, post).await?))
}

/// DELETE /api/v1/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Posts, Action::Destroy, viewer.user())?;

    state.post_service.delete(id).await?;
    tracing::info!(post_id = id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/post-list-by-category/{id}
async fn list_by_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(category_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<PostResponse>>, ApiError> {
    authorize(Resource::Posts, Action::List, viewer.user())?;

    let result = state
        .post_service
        .list_by_category(category_id, &query.params())
        .await?;
    Ok(Json(to_page(&state, result).await?))
}

/// GET /api/v1/post-list-by-tag/{id}
async fn list_by_tag(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(tag_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<PostResponse>>, ApiError> {
    authorize(Resource::Posts, Action::List, viewer.user())?;

    let result = state.post_service.list_by_tag(tag_id, &query.params()).await?;
    Ok(Json(to_page(&state, result).await?))
}

/// GET /api/v1/draft-list
async fn list_drafts(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<PostResponse>>, ApiError> {
    authorize(Resource::Drafts, Action::List, viewer.user())?;

    let result = state.post_service.list_drafts(&query.params()).await?;
    Ok(Json(to_page(&state, result).await?))
}

/// GET /api/v1/draft-detail/{id}
async fn get_draft(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    authorize(Resource::Drafts, Action::Retrieve, viewer.user())?;

    let post = state.post_service.get_draft(id).await?;
    Ok(Json(to_response(&state, post).await?))
}

/// POST /api/v1/post-publish
async fn publish_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<IdRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    authorize(Resource::Posts, Action::Publish, viewer.user())?;

    let post = state.post_service.publish(body.id).await?;
    Ok(Json(to_response(&state, post).await?))
}
