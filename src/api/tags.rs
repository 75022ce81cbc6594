//! Tag API endpoints
//!
//! - GET    /api/v1/tags        - List tags
//! - POST   /api/v1/tags        - Create tag
//! - GET    /api/v1/tags/{id}   - Get tag
//! - PUT    /api/v1/tags/{id}   - Rename tag
//! - PATCH  /api/v1/tags/{id}   - Rename tag if a name is given
//! - DELETE /api/v1/tags/{id}   - Delete tag

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::{ListQuery, NamePatch, NameRequest};
use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, Action, Resource};
use crate::api::responses::PageResponse;
use crate::models::Tag;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route(
            "/tags/{id}",
            get(get_tag).put(update_tag).patch(patch_tag).delete(delete_tag),
        )
}

async fn list_tags(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<Tag>>, ApiError> {
    authorize(Resource::Tags, Action::List, viewer.user())?;
    let result = state.tag_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_tag(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    authorize(Resource::Tags, Action::Retrieve, viewer.user())?;
    Ok(Json(state.tag_service.get(id).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<NameRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    authorize(Resource::Tags, Action::Create, viewer.user())?;
    let tag = state.tag_service.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<NameRequest>,
) -> Result<Json<Tag>, ApiError> {
    authorize(Resource::Tags, Action::Update, viewer.user())?;
    Ok(Json(state.tag_service.rename(id, &body.name).await?))
}

async fn patch_tag(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<NamePatch>,
) -> Result<Json<Tag>, ApiError> {
    authorize(Resource::Tags, Action::PartialUpdate, viewer.user())?;
    let tag = match body.name {
        Some(name) => state.tag_service.rename(id, &name).await?,
        None => state.tag_service.get(id).await?,
    };
    Ok(Json(tag))
}

async fn delete_tag(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Tags, Action::Destroy, viewer.user())?;
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
