//! Group API endpoints, all requiring authentication
//!
//! - GET    /api/v1/groups
//! - POST   /api/v1/groups
//! - GET    /api/v1/groups/{id}
//! - PUT    /api/v1/groups/{id}
//! - PATCH  /api/v1/groups/{id}
//! - DELETE /api/v1/groups/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::{NamePatch, NameRequest};
use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, Action, Resource};
use crate::models::Group;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route(
            "/groups/{id}",
            get(get_group)
                .put(update_group)
                .patch(patch_group)
                .delete(delete_group),
        )
}

async fn list_groups(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<Group>>, ApiError> {
    authorize(Resource::Groups, Action::List, viewer.user())?;
    Ok(Json(state.group_service.list().await?))
}

async fn get_group(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Group>, ApiError> {
    authorize(Resource::Groups, Action::Retrieve, viewer.user())?;
    Ok(Json(state.group_service.get(id).await?))
}

async fn create_group(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<NameRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    authorize(Resource::Groups, Action::Create, viewer.user())?;
    let group = state.group_service.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn update_group(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<NameRequest>,
) -> Result<Json<Group>, ApiError> {
    authorize(Resource::Groups, Action::Update, viewer.user())?;
    Ok(Json(state.group_service.rename(id, &body.name).await?))
}

async fn patch_group(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<NamePatch>,
) -> Result<Json<Group>, ApiError> {
    authorize(Resource::Groups, Action::PartialUpdate, viewer.user())?;
    let group = match body.name {
        Some(name) => state.group_service.rename(id, &name).await?,
        None => state.group_service.get(id).await?,
    };
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Groups, Action::Destroy, viewer.user())?;
    state.group_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
