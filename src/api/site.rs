//! Site content endpoints: advertisements and the team page
//!
//! Anyone may read; only staff may change.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, Action, Resource};
use crate::models::{Advertisement, AdvertisementInput, TeamMember, TeamMemberInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/advertisements", get(list_ads).post(create_ad))
        .route(
            "/advertisements/{id}",
            get(get_ad).put(update_ad).patch(update_ad).delete(delete_ad),
        )
        .route("/team", get(list_team).post(create_member))
        .route(
            "/team/{id}",
            get(get_member)
                .put(update_member)
                .patch(update_member)
                .delete(delete_member),
        )
}

// ============================================================================
// Advertisements
// ============================================================================

async fn list_ads(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<Advertisement>>, ApiError> {
    authorize(Resource::Advertisements, Action::List, viewer.user())?;
    Ok(Json(state.site_service.list_ads().await?))
}

async fn get_ad(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Advertisement>, ApiError> {
    authorize(Resource::Advertisements, Action::Retrieve, viewer.user())?;
    Ok(Json(state.site_service.get_ad(id).await?))
}

async fn create_ad(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<AdvertisementInput>,
) -> Result<(StatusCode, Json<Advertisement>), ApiError> {
    authorize(Resource::Advertisements, Action::Create, viewer.user())?;
    let ad = state.site_service.create_ad(body).await?;
    Ok((StatusCode::CREATED, Json(ad)))
}

/// PUT and PATCH both take the full set of fields
async fn update_ad(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<AdvertisementInput>,
) -> Result<Json<Advertisement>, ApiError> {
    authorize(Resource::Advertisements, Action::Update, viewer.user())?;
    Ok(Json(state.site_service.update_ad(id, body).await?))
}

async fn delete_ad(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Advertisements, Action::Destroy, viewer.user())?;
    state.site_service.delete_ad(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Team
// ============================================================================

async fn list_team(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<TeamMember>>, ApiError> {
    authorize(Resource::Team, Action::List, viewer.user())?;
    Ok(Json(state.site_service.list_team().await?))
}

async fn get_member(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<TeamMember>, ApiError> {
    authorize(Resource::Team, Action::Retrieve, viewer.user())?;
    Ok(Json(state.site_service.get_member(id).await?))
}

async fn create_member(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<TeamMemberInput>,
) -> Result<(StatusCode, Json<TeamMember>), ApiError> {
    authorize(Resource::Team, Action::Create, viewer.user())?;
    let member = state.site_service.create_member(body).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn update_member(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<TeamMemberInput>,
) -> Result<Json<TeamMember>, ApiError> {
    authorize(Resource::Team, Action::Update, viewer.user())?;
    Ok(Json(state.site_service.update_member(id, body).await?))
}

async fn delete_member(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Team, Action::Destroy, viewer.user())?;
    state.site_service.delete_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
