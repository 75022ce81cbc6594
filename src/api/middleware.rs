//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type and the mapping from service errors
//! - Session authentication: required and optional

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxAdvertisementRepository, SqlxCategoryRepository, SqlxCommentRepository,
    SqlxContactRepository, SqlxGroupRepository, SqlxNewsletterRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxTagRepository, SqlxTeamMemberRepository,
    SqlxUserProfileRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CategoryService, CategoryServiceError, CommentService, CommentServiceError, ContactService,
    ContactServiceError, GroupService, GroupServiceError, LoginRateLimiter, NewsletterService,
    NewsletterServiceError, PostService, PostServiceError, SiteService, SiteServiceError,
    TagService, TagServiceError, UserService, UserServiceError,
};
use crate::theme::ThemeEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub post_service: Arc<PostService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub comment_service: Arc<CommentService>,
    pub contact_service: Arc<ContactService>,
    pub newsletter_service: Arc<NewsletterService>,
    pub user_service: Arc<UserService>,
    pub group_service: Arc<GroupService>,
    pub site_service: Arc<SiteService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub theme_engine: Arc<ThemeEngine>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, config: Config, theme_engine: ThemeEngine) -> Self {
        let posts = SqlxPostRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());
        let groups = SqlxGroupRepository::boxed(pool.clone());

        let user_service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            groups.clone(),
        )
        .with_session_days(config.auth.session_days);

        Self {
            post_service: Arc::new(PostService::new(
                posts.clone(),
                categories.clone(),
                tags.clone(),
            )),
            category_service: Arc::new(CategoryService::new(categories.clone())),
            tag_service: Arc::new(TagService::new(tags.clone())),
            comment_service: Arc::new(CommentService::new(
                SqlxCommentRepository::boxed(pool.clone()),
                posts.clone(),
            )),
            contact_service: Arc::new(ContactService::new(SqlxContactRepository::boxed(pool.clone()))),
            newsletter_service: Arc::new(NewsletterService::new(SqlxNewsletterRepository::boxed(
                pool.clone(),
            ))),
            user_service: Arc::new(user_service),
            group_service: Arc::new(GroupService::new(groups)),
            site_service: Arc::new(SiteService::new(
                SqlxAdvertisementRepository::boxed(pool.clone()),
                SqlxTeamMemberRepository::boxed(pool.clone()),
                SqlxUserProfileRepository::boxed(pool),
                categories,
                tags,
                posts,
            )),
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            theme_engine: Arc::new(theme_engine),
            config: Arc::new(config),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Whoever is making the request, if they presented a valid session
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Validation error naming the offending field
    pub fn field_error(field: &str, message: impl Into<String>) -> Self {
        Self::with_details("VALIDATION_ERROR", message, serde_json::json!({ "field": field }))
    }

    pub fn conflict(field: &str, message: impl Into<String>) -> Self {
        Self::with_details("CONFLICT", message, serde_json::json!({ "field": field }))
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new("METHOD_NOT_ALLOWED", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: u64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after }),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the cause and hide it from the client
    fn internal(error: impl std::fmt::Display) -> Self {
        tracing::error!("Request failed: {}", error);
        Self::internal_error("Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "METHOD_NOT_ALLOWED" => StatusCode::METHOD_NOT_ALLOWED,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self)).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static("GET, POST, DELETE"));
        }
        response
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(id) => Self::not_found(format!("Post not found: {}", id)),
            PostServiceError::CategoryNotFound(id) => {
                Self::field_error("category_id", format!("Category not found: {}", id))
            }
            PostServiceError::TagNotFound(id) => {
                Self::field_error("tag_ids", format!("Tag not found: {}", id))
            }
            PostServiceError::ValidationError(field, msg) => Self::field_error(field, msg),
            PostServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::DuplicateName(name) => {
                Self::conflict("name", format!("Category name already exists: {}", name))
            }
            CategoryServiceError::NotFound(id) => Self::not_found(format!("Category not found: {}", id)),
            CategoryServiceError::ValidationError(msg) => Self::field_error("name", msg),
            CategoryServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::DuplicateName(name) => {
                Self::conflict("name", format!("Tag name already exists: {}", name))
            }
            TagServiceError::NotFound(id) => Self::not_found(format!("Tag not found: {}", id)),
            TagServiceError::ValidationError(msg) => Self::field_error("name", msg),
            TagServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(id) => Self::not_found(format!("Comment not found: {}", id)),
            CommentServiceError::PostNotFound(id) => Self::not_found(format!("Post not found: {}", id)),
            CommentServiceError::ValidationError(msg) => Self::field_error("content", msg),
            CommentServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<ContactServiceError> for ApiError {
    fn from(e: ContactServiceError) -> Self {
        match e {
            ContactServiceError::NotFound(id) => Self::not_found(format!("Contact not found: {}", id)),
            ContactServiceError::ValidationError(field, msg) => Self::field_error(field, msg),
            ContactServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<NewsletterServiceError> for ApiError {
    fn from(e: NewsletterServiceError) -> Self {
        match e {
            NewsletterServiceError::NotFound(id) => {
                Self::not_found(format!("Subscription not found: {}", id))
            }
            NewsletterServiceError::AlreadySubscribed(email) => {
                Self::conflict("email", format!("Already subscribed: {}", email))
            }
            NewsletterServiceError::ValidationError(msg) => Self::field_error("email", msg),
            NewsletterServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(_) => Self::unauthorized("Invalid credentials"),
            UserServiceError::ValidationError(msg) => Self::validation_error(msg),
            UserServiceError::UserExists(msg) => Self::with_details("CONFLICT", msg, serde_json::json!({})),
            UserServiceError::NotFound(id) => Self::not_found(format!("User not found: {}", id)),
            UserServiceError::GroupNotFound(id) => {
                Self::field_error("groups", format!("Group not found: {}", id))
            }
            UserServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<GroupServiceError> for ApiError {
    fn from(e: GroupServiceError) -> Self {
        match e {
            GroupServiceError::NotFound(id) => Self::not_found(format!("Group not found: {}", id)),
            GroupServiceError::DuplicateName(name) => {
                Self::conflict("name", format!("Group name already exists: {}", name))
            }
            GroupServiceError::ValidationError(msg) => Self::field_error("name", msg),
            GroupServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<SiteServiceError> for ApiError {
    fn from(e: SiteServiceError) -> Self {
        match e {
            SiteServiceError::NotFound(kind, id) => Self::not_found(format!("{} not found: {}", kind, id)),
            SiteServiceError::ValidationError(field, msg) => Self::field_error(field, msg),
            SiteServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Extract session token from headers.
///
/// A bearer token wins over the `session` cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Client address from proxy headers
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse() {
                return Some(ip);
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware.
///
/// Attaches the user when the token is valid and otherwise lets the request
/// through anonymously; handlers decide what an anonymous caller may do.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let map = headers(&[("authorization", "Bearer test-token-123")]);
        assert_eq!(extract_session_token(&map), Some("test-token-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let map = headers(&[("cookie", "theme=dark; session=test-token-456")]);
        assert_eq!(extract_session_token(&map), Some("test-token-456".to_string()));
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let map = headers(&[
            ("authorization", "Bearer bearer-token"),
            ("cookie", "session=cookie-token"),
        ]);
        assert_eq!(extract_session_token(&map), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        let basic = headers(&[("authorization", "Basic invalid")]);
        assert!(extract_session_token(&basic).is_none());
    }

    #[test]
    fn test_client_ip() {
        let forwarded = headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_ip(&forwarded), Some("203.0.113.7".parse().unwrap()));

        let real = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&real), Some("198.51.100.2".parse().unwrap()));

        let garbage = headers(&[("x-forwarded-for", "not-an-ip")]);
        assert_eq!(client_ip(&garbage), None);
    }

    #[test]
    fn test_api_error_statuses() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("name", "x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::method_not_allowed("x").status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::rate_limited("x", 60).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::internal_error("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_field_error_details() {
        let error = ApiError::field_error("title", "Title cannot be empty");
        assert_eq!(error.error.code, "VALIDATION_ERROR");
        assert_eq!(error.error.details, Some(serde_json::json!({"field": "title"})));
    }

    #[test]
    fn test_service_error_mapping() {
        let e: ApiError = PostServiceError::NotFound(4).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e: ApiError = PostServiceError::ValidationError("content", "empty".into()).into();
        assert_eq!(e.error.details, Some(serde_json::json!({"field": "content"})));

        let e: ApiError = TagServiceError::DuplicateName("x".into()).into();
        assert_eq!(e.status(), StatusCode::CONFLICT);

        let e: ApiError = UserServiceError::AuthenticationError("disabled".into()).into();
        assert_eq!(e.status(), StatusCode::UNAUTHORIZED);
        assert!(!e.error.message.contains("disabled"));

        let e: ApiError = ContactServiceError::InternalError(anyhow::anyhow!("db down")).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.error.message.contains("db down"));
    }

    #[test]
    fn test_viewer_default_is_anonymous() {
        assert!(Viewer::default().user().is_none());
    }
}
