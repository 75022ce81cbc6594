//! Contact message endpoints
//!
//! - POST   /api/v1/contact         - Submit a message (anyone)
//! - GET    /api/v1/contact         - List messages
//! - GET    /api/v1/contact/{id}    - One message
//! - DELETE /api/v1/contact/{id}    - Delete a message
//!
//! Messages are write-once; PUT and PATCH answer 405.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::ListQuery;
use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::api::permissions::{authorize, deny, Action, Resource};
use crate::api::responses::PageResponse;
use crate::models::{Contact, CreateContactInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contact", get(list_messages).post(submit_message))
        .route(
            "/contact/{id}",
            get(get_message)
                .put(update_message)
                .patch(patch_message)
                .delete(delete_message),
        )
}

async fn list_messages(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<Contact>>, ApiError> {
    authorize(Resource::Contact, Action::List, viewer.user())?;
    let result = state.contact_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn submit_message(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<CreateContactInput>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    authorize(Resource::Contact, Action::Create, viewer.user())?;
    let contact = state.contact_service.submit(body).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn get_message(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Contact>, ApiError> {
    authorize(Resource::Contact, Action::Retrieve, viewer.user())?;
    Ok(Json(state.contact_service.get(id).await?))
}

async fn update_message(viewer: Viewer) -> ApiError {
    deny(Resource::Contact, Action::Update, viewer.user())
}

async fn patch_message(viewer: Viewer) -> ApiError {
    deny(Resource::Contact, Action::PartialUpdate, viewer.user())
}

async fn delete_message(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Contact, Action::Destroy, viewer.user())?;
    state.contact_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
