//! Category API endpoints
//!
//! - GET    /api/v1/categories        - List categories
//! - POST   /api/v1/categories        - Create category
//! - GET    /api/v1/categories/{id}   - Get category
//! - PUT    /api/v1/categories/{id}   - Replace category
//! - PATCH  /api/v1/categories/{id}   - Partial update
//! - DELETE /api/v1/categories/{id}   - Delete category and its posts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::ListQuery;
use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, Action, Resource};
use crate::api::responses::PageResponse;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .patch(patch_category)
                .delete(delete_category),
        )
}

async fn list_categories(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<Category>>, ApiError> {
    authorize(Resource::Categories, Action::List, viewer.user())?;
    let result = state.category_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    authorize(Resource::Categories, Action::Retrieve, viewer.user())?;
    Ok(Json(state.category_service.get(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    authorize(Resource::Categories, Action::Create, viewer.user())?;
    let category = state
        .category_service
        .create(CreateCategoryInput {
            name: body.name,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT replaces both fields; a missing description clears it
async fn update_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    authorize(Resource::Categories, Action::Update, viewer.user())?;
    let input = UpdateCategoryInput {
        name: Some(body.name),
        description: Some(body.description),
    };
    Ok(Json(state.category_service.update(id, input).await?))
}

async fn patch_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<CategoryPatch>,
) -> Result<Json<Category>, ApiError> {
    authorize(Resource::Categories, Action::PartialUpdate, viewer.user())?;
    let input = UpdateCategoryInput {
        name: body.name,
        description: body.description.map(Some),
    };
    Ok(Json(state.category_service.update(id, input).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Categories, Action::Destroy, viewer.user())?;
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
