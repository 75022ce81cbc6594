//! User API endpoints, all requiring authentication
//!
//! - GET    /api/v1/users
//! - POST   /api/v1/users
//! - GET    /api/v1/users/{id}
//! - PUT    /api/v1/users/{id}
//! - PATCH  /api/v1/users/{id}
//! - DELETE /api/v1/users/{id}
//!
//! Only staff may hand out staff status.

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
use crate::api::responses::{PageResponse, UserResponse};
use crate::models::{CreateUserInput, UpdateUserInput, User};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub groups: Option<Vec<i64>>,
}

/// PUT body: identity fields are required, the rest keep their value when omitted
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub groups: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub groups: Option<Vec<i64>>,
}

impl From<UpdateUserRequest> for UpdateUserInput {
    fn from(body: UpdateUserRequest) -> Self {
        Self {
            username: Some(body.username),
            email: Some(body.email),
            first_name: Some(body.first_name),
            last_name: Some(body.last_name),
            password: body.password,
            is_staff: body.is_staff,
            is_active: body.is_active,
            group_ids: body.groups,
        }
    }
}

impl From<PatchUserRequest> for UpdateUserInput {
    fn from(body: PatchUserRequest) -> Self {
        Self {
            username: body.username,
            email: body.email,
            first_name: body.first_name,
            last_name: body.last_name,
            password: body.password,
            is_staff: body.is_staff,
            is_active: body.is_active,
            group_ids: body.groups,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).patch(patch_user).delete(delete_user),
        )
}

fn guard_staff_grant(caller: Option<&User>, requested: Option<bool>) -> Result<(), ApiError> {
    let caller_is_staff = caller.is_some_and(|u| u.is_staff);
    if requested == Some(true) && !caller_is_staff {
        return Err(ApiError::forbidden("Only staff can grant staff status"));
    }
    Ok(())
}

async fn with_groups(state: &AppState, user: User) -> Result<UserResponse, ApiError> {
    let groups = state.user_service.groups_of(user.id).await?;
    Ok(UserResponse::from(user).with_groups(groups))
}

async fn list_users(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageResponse<UserResponse>>, ApiError> {
    authorize(Resource::Users, Action::List, viewer.user())?;
    let result = state.user_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(Resource::Users, Action::Retrieve, viewer.user())?;
    let user = state.user_service.get(id).await?;
    Ok(Json(with_groups(&state, user).await?))
}

async fn create_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    authorize(Resource::Users, Action::Create, viewer.user())?;
    guard_staff_grant(viewer.user(), Some(body.is_staff))?;

    let mut user = state
        .user_service
        .create_user(CreateUserInput {
            username: body.username,
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            is_staff: body.is_staff,
        })
        .await?;

    if let Some(group_ids) = body.groups {
        user = state
            .user_service
            .update(
                user.id,
                UpdateUserInput {
                    group_ids: Some(group_ids),
                    ..Default::default()
                },
            )
            .await?;
    }

    Ok((StatusCode::CREATED, Json(with_groups(&state, user).await?)))
}

async fn update_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(Resource::Users, Action::Update, viewer.user())?;
    guard_staff_grant(viewer.user(), body.is_staff)?;

    let user = state.user_service.update(id, body.into()).await?;
    Ok(Json(with_groups(&state, user).await?))
}

async fn patch_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(body): Json<PatchUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(Resource::Users, Action::PartialUpdate, viewer.user())?;
    guard_staff_grant(viewer.user(), body.is_staff)?;

    let user = state.user_service.update(id, body.into()).await?;
    Ok(Json(with_groups(&state, user).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(Resource::Users, Action::Destroy, viewer.user())?;
    state.user_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn caller(is_staff: bool) -> User {
        User {
            id: 1,
            username: "caller".to_string(),
            email: "caller@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash".to_string(),
            is_staff,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_staff_grant_guard() {
        let regular = caller(false);
        let staff = caller(true);

        assert!(guard_staff_grant(Some(&regular), None).is_ok());
        assert!(guard_staff_grant(Some(&regular), Some(false)).is_ok());
        assert_eq!(
            guard_staff_grant(Some(&regular), Some(true)).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert!(guard_staff_grant(Some(&staff), Some(true)).is_ok());
    }

    #[test]
    fn test_patch_maps_groups() {
        let input: UpdateUserInput = PatchUserRequest {
            groups: Some(vec![2, 3]),
            ..Default::default()
        }
        .into();
        assert_eq!(input.group_ids, Some(vec![2, 3]));
        assert!(input.username.is_none());
    }
}
