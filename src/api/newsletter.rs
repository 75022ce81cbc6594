//! Newsletter subscription endpoints
//!
//! Anyone may subscribe. Subscriptions are never edited, so PUT and PATCH
//! answer 405 for every caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::ListQuery;
use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, deny, Action, Resource};
use crate::api::responses::PageResponse;
use crate::models::Newsletter;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/newsletter", get(list_subscriptions).post(subscribe))
        .route(
            "/newsletter/{id}",
            get(get_subscription)
                .put(update_subscription)
                .patch(patch_subscription)
                .delete(delete_subscription),
        )
}

async fn list_subscriptions(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<Newsletter>>, ApiError> {
    authorize(Resource::Newsletter, Action::List, viewer.user())?;
    let result = state.newsletter_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn subscribe(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Newsletter>), ApiError> {
    authorize(Resource::Newsletter, Action::Create, viewer.user())?;
    let subscription = state.newsletter_service.subscribe(&body.email).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn get_subscription(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Newsletter>, ApiError> {
    authorize(Resource::Newsletter, Action::Retrieve, viewer.user())?;
    Ok(Json(state.newsletter_service.get(id).await?))
}

async fn update_subscription(viewer: Viewer) -> ApiError {
    deny(Resource::Newsletter, Action::Update, viewer.user())
}

async fn patch_subscription(viewer: Viewer) -> ApiError {
    deny(Resource::Newsletter, Action::PartialUpdate, viewer.user())
}

async fn delete_subscription(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Newsletter, Action::Destroy, viewer.user())?;
    state.newsletter_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
