//! API layer - HTTP handlers and routing
//!
//! JSON endpoints under `/api/v1`:
//! - Posts, drafts and the publish action
//! - Categories, tags, comments
//! - Users, groups and authentication
//! - Newsletter subscriptions and contact messages
//! - Advertisements and team members
//!
//! Every API route runs behind [`middleware::optional_auth`]; each handler
//! then checks the caller against [`permissions::policy_for`].

pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod contact;
pub mod groups;
pub mod middleware;
pub mod newsletter;
pub mod permissions;
pub mod posts;
pub mod responses;
pub mod site;
pub mod tags;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(posts::router())
        .merge(categories::router())
        .merge(tags::router())
        .merge(comments::router())
        .merge(users::router())
        .merge(groups::router())
        .merge(newsletter::router())
        .merge(contact::router())
        .merge(site::router())
        .merge(auth::router(state.clone()))
        .fallback(api_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("No such endpoint")
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true)
}

/// Build the complete application: website, API and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(crate::web::router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
