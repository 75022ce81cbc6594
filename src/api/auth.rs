//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Create an account and sign in
//! - POST /api/v1/auth/login    - Sign in
//! - POST /api/v1/auth/logout   - End the current session
//! - GET  /api/v1/auth/me       - Current user
//! - GET  /api/v1/auth/profile  - Current user's profile
//! - PUT  /api/v1/auth/profile  - Update it
//!
//! The first account ever registered becomes staff.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    client_ip, extract_session_token, require_auth, ApiError, AppState, AuthenticatedUser,
};
use crate::api::responses::UserResponse;
use crate::config::MAX_SESSION_DAYS;
use crate::models::{UpdateProfileInput, UserProfile};
use crate::services::user::{LoginInput, RegisterInput, UserServiceError};

/// Seconds an IP has to wait once it hits the per-minute limit
const IP_RETRY_AFTER: u64 = 60;
/// Seconds a username has to wait after too many failures
const USERNAME_RETRY_AFTER: u64 = 15 * 60;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Build the auth router; session-bound routes sit behind `require_auth`
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_current_user))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .merge(protected)
}

fn session_cookie(token: &str, max_age: i64) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age
    );
    let value = HeaderValue::from_str(&cookie)
        .map_err(|_| ApiError::internal_error("Failed to build session cookie"))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn session_max_age(state: &AppState) -> i64 {
    state
        .config
        .auth
        .session_days
        .clamp(1, MAX_SESSION_DAYS)
        .saturating_mul(24 * 60 * 60)
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state
        .user_service
        .register(RegisterInput::new(body.username, body.email, body.password))
        .await?;

    let (user, session) = state
        .user_service
        .login(LoginInput::new(&user.username, password))
        .await?;

    let headers = session_cookie(&session.id, session_max_age(&state))?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = client_ip(&headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!(%ip, "Login rejected: IP rate limit exceeded");
            return Err(ApiError::rate_limited(
                "Too many requests, please try again later",
                IP_RETRY_AFTER,
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    let username = body.username_or_email.trim().to_string();
    if state.rate_limiter.is_username_limited(&username).await {
        tracing::warn!(username = %username, "Login rejected: too many failed attempts");
        return Err(ApiError::rate_limited(
            "Too many failed attempts, please try again in 15 minutes",
            USERNAME_RETRY_AFTER,
        ));
    }

    let (user, session) = match state
        .user_service
        .login(LoginInput::new(&username, body.password))
        .await
    {
        Ok(pair) => pair,
        Err(e) => {
            if matches!(e, UserServiceError::AuthenticationError(_)) {
                state.rate_limiter.record_failed_attempt(&username).await;
                tracing::info!(username = %username, "Failed login attempt");
            }
            return Err(e.into());
        }
    };

    state.rate_limiter.clear_username_attempts(&username).await;

    let headers = session_cookie(&session.id, session_max_age(&state))?;
    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;
    state.user_service.logout(&token).await?;

    Ok((StatusCode::NO_CONTENT, session_cookie("", 0)?))
}

/// GET /api/v1/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let groups = state.user_service.groups_of(user.0.id).await?;
    Ok(Json(UserResponse::from(user.0).with_groups(groups)))
}

/// GET /api/v1/auth/profile
async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .site_service
        .profile(user.0.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Profile not found"))
}

/// PUT /api/v1/auth/profile
///
/// Creates the profile on first use.
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.site_service.update_profile(user.0.id, body).await?;
    tracing::debug!(user_id = user.0.id, "Profile updated");
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let headers = session_cookie("abc", 3600).unwrap();
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let headers = session_cookie("", 0).unwrap();
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.ends_with("Max-Age=0"));
    }
}
