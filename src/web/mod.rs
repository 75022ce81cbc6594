//! Server-rendered website
//!
//! HTML pages for readers, rendered with the [`ThemeEngine`]. Handlers
//! return [`WebError`] on failure; the [`render_error_pages`] middleware
//! turns it into a themed error page carrying the matching status.
//!
//! [`ThemeEngine`]: crate::theme::ThemeEngine

mod forms;
mod pages;

use axum::{
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tera::Context as TeraContext;

use crate::api::middleware::{optional_auth, AppState, AuthenticatedUser, Viewer};
use crate::models::{PagedResult, Post};
use crate::services::{
    CategoryServiceError, CommentServiceError, ContactServiceError, NewsletterServiceError,
    PostServiceError, SiteServiceError, TagServiceError, UserServiceError,
};
use crate::theme::{CurrentUser, StandardTemplateVars, ERROR_TEMPLATE};

/// Posts per page on listing pages
pub const PAGE_SIZE: u32 = 10;

/// Build the website router.
///
/// Requests without a matching route get the themed 404 page.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/posts", get(pages::post_list))
        .route("/posts/{id}", get(pages::post_detail))
        .route("/category/{id}", get(pages::category_posts))
        .route("/tag/{id}", get(pages::tag_posts))
        .route("/search", get(pages::search))
        .route("/about", get(pages::about))
        .route("/contact", get(forms::contact_form).post(forms::submit_contact))
        .route("/comments", post(forms::submit_comment))
        .route("/newsletter", post(forms::subscribe))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), render_error_pages))
        .layer(middleware::from_fn_with_state(state, optional_auth))
}

/// Fallback for unknown paths
pub async fn not_found() -> WebError {
    WebError::not_found("The page you are looking for does not exist.")
}

// ============================================================================
// Errors
// ============================================================================

/// A failed page request, rendered by [`render_error_pages`]
#[derive(Debug, Clone)]
pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Log the cause and hide it from the reader
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Page request failed: {}", cause);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong on our side. Please try again later.",
        )
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.message.clone()).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<PostServiceError> for WebError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) => Self::not_found("This story could not be found."),
            PostServiceError::CategoryNotFound(_) => Self::not_found("This category could not be found."),
            PostServiceError::TagNotFound(_) => Self::not_found("This tag could not be found."),
            PostServiceError::ValidationError(_, msg) => Self::bad_request(msg),
            PostServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CategoryServiceError> for WebError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => Self::not_found("This category could not be found."),
            CategoryServiceError::InternalError(e) => Self::internal(e),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<TagServiceError> for WebError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(_) => Self::not_found("This tag could not be found."),
            TagServiceError::InternalError(e) => Self::internal(e),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(_) | CommentServiceError::PostNotFound(_) => {
                Self::not_found("This story could not be found.")
            }
            CommentServiceError::ValidationError(msg) => Self::bad_request(msg),
            CommentServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<ContactServiceError> for WebError {
    fn from(e: ContactServiceError) -> Self {
        match e {
            ContactServiceError::NotFound(_) => Self::not_found("Message not found."),
            ContactServiceError::ValidationError(_, msg) => Self::bad_request(msg),
            ContactServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<NewsletterServiceError> for WebError {
    fn from(e: NewsletterServiceError) -> Self {
        match e {
            NewsletterServiceError::NotFound(_) => Self::not_found("Subscription not found."),
            NewsletterServiceError::AlreadySubscribed(_) => {
                Self::bad_request("This email address is already subscribed.")
            }
            NewsletterServiceError::ValidationError(msg) => Self::bad_request(msg),
            NewsletterServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<SiteServiceError> for WebError {
    fn from(e: SiteServiceError) -> Self {
        match e {
            SiteServiceError::NotFound(kind, _) => Self::not_found(format!("{} not found.", kind)),
            SiteServiceError::ValidationError(_, msg) => Self::bad_request(msg),
            SiteServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound(_) => Self::not_found("Author not found."),
            UserServiceError::InternalError(e) => Self::internal(e),
            other => Self::bad_request(other.to_string()),
        }
    }
}

/// Replace the body of any [`WebError`] response with the themed error page
pub async fn render_error_pages(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    request: Request,
    next: Next,
) -> Response {
    let viewer = Viewer(
        request
            .extensions()
            .get::<AuthenticatedUser>()
            .map(|au| au.0.clone()),
    );
    let response = next.run(request).await;

    let Some(error) = response.extensions().get::<WebError>().cloned() else {
        return response;
    };

    let mut context = TeraContext::new();
    context.insert("status", &error.status.as_u16());
    context.insert("error_message", &error.message);
    let sidebar = match state.site_service.sidebar().await {
        Ok(sidebar) => Some(sidebar),
        Err(e) => {
            tracing::warn!("Failed to load sidebar for error page: {}", e);
            None
        }
    };
    context.insert("sidebar", &sidebar);
    standard_vars(&state, &viewer, uri.path()).apply(&mut context);

    let html = state
        .theme_engine
        .render_with_fallback(ERROR_TEMPLATE, &context);
    (error.status, Html(html)).into_response()
}

// ============================================================================
// Rendering helpers
// ============================================================================

fn standard_vars(state: &AppState, viewer: &Viewer, path: &str) -> StandardTemplateVars {
    let vars = StandardTemplateVars::new(
        state.config.site.name.clone(),
        state.config.site.description.clone(),
        path,
    );
    match viewer.user() {
        Some(user) => vars.with_user(CurrentUser::from(user)),
        None => vars,
    }
}

/// Render `template` with the sidebar and standard variables added
pub(crate) async fn render_page(
    state: &AppState,
    viewer: &Viewer,
    path: &str,
    template: &str,
    mut context: TeraContext,
) -> Result<Html<String>, WebError> {
    let sidebar = state.site_service.sidebar().await?;
    context.insert("sidebar", &sidebar);

    state
        .theme_engine
        .render_with_standard_vars(template, &context, &standard_vars(state, viewer, path))
        .map(Html)
        .map_err(WebError::internal)
}

/// Insert a page of posts plus pagination links into `context`
pub(crate) fn insert_page(context: &mut TeraContext, result: &PagedResult<Post>, page_url_prefix: &str) {
    context.insert("posts", &result.items);
    context.insert("page", &result.page);
    context.insert("total_pages", &result.total_pages());
    context.insert("page_url_prefix", page_url_prefix);
}
