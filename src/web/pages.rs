//! Read-only pages: home, listings, post detail, search and about

use axum::{
    extract::{OriginalUri, Path, Query, State},
    response::Html,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use super::{insert_page, render_page, WebError, PAGE_SIZE};
use crate::api::middleware::{AppState, Viewer};
use crate::models::ListParams;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

fn params(page: u32) -> ListParams {
    ListParams::new(page, PAGE_SIZE)
}

/// GET /
pub async fn home(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
) -> Result<Html<String>, WebError> {
    let home = state.post_service.home().await?;

    let mut context = TeraContext::new();
    context.insert("posts", &home.latest);
    context.insert("featured_post", &home.featured);
    context.insert("popular_posts", &home.popular);
    context.insert("weekly_top_posts", &home.weekly_top);

    render_page(&state, &viewer, uri.path(), "index.html", context).await
}

/// GET /posts
pub async fn post_list(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let result = state
        .post_service
        .list_published(None, &params(query.page))
        .await?;

    let mut context = TeraContext::new();
    context.insert("heading", "Latest news");
    context.insert("subheading", "");
    insert_page(&mut context, &result, "/posts?");

    render_page(&state, &viewer, uri.path(), "post_list.html", context).await
}

/// GET /posts/{id}
///
/// Drafts and inactive posts are 404. Each successful render counts a view.
pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<i64>,
) -> Result<Html<String>, WebError> {
    let post = state.post_service.view(id).await?;

    let author_name = match state.user_service.get(post.author_id).await {
        Ok(author) => author.display_name(),
        Err(e) => {
            tracing::warn!(post_id = id, "Failed to load post author: {}", e);
            "Unknown".to_string()
        }
    };
    let category = state.category_service.get(post.category_id).await.ok();
    let tags = state.post_service.tags(post.id).await?;
    let comments = state.comment_service.list_for_post(post.id).await?;

    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("author_name", &author_name);
    context.insert("category", &category);
    context.insert("tags", &tags);
    context.insert("comments", &comments);

    render_page(&state, &viewer, uri.path(), "post_detail.html", context).await
}

/// GET /category/{id}
pub async fn category_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let heading = match state.category_service.get(id).await {
        Ok(category) => category.name,
        Err(crate::services::CategoryServiceError::NotFound(_)) => "Category".to_string(),
        Err(e) => return Err(e.into()),
    };
    let result = state
        .post_service
        .list_by_category(id, &params(query.page))
        .await?;

    let mut context = TeraContext::new();
    context.insert("heading", &heading);
    context.insert("subheading", "");
    insert_page(&mut context, &result, &format!("/category/{}?", id));

    render_page(&state, &viewer, uri.path(), "post_list.html", context).await
}

/// GET /tag/{id}
pub async fn tag_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let heading = match state.tag_service.get(id).await {
        Ok(tag) => format!("#{}", tag.name),
        Err(crate::services::TagServiceError::NotFound(_)) => "Tag".to_string(),
        Err(e) => return Err(e.into()),
    };
    let result = state
        .post_service
        .list_by_tag(id, &params(query.page))
        .await?;

    let mut context = TeraContext::new();
    context.insert("heading", &heading);
    context.insert("subheading", "");
    insert_page(&mut context, &result, &format!("/tag/{}?", id));

    render_page(&state, &viewer, uri.path(), "post_list.html", context).await
}

/// GET /search?query=
///
/// A blank query renders an empty result page.
pub async fn search(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, WebError> {
    let term = query.query.trim();
    let result = state.post_service.search(term, &params(query.page)).await?;

    let subheading = if term.is_empty() {
        "Enter a word to search for.".to_string()
    } else {
        format!("{} result(s) for \"{}\"", result.total, term)
    };
    let prefix = format!("/search?query={}&", urlencoding::encode(term));

    let mut context = TeraContext::new();
    context.insert("heading", "Search");
    context.insert("subheading", &subheading);
    context.insert("query", term);
    insert_page(&mut context, &result, &prefix);

    render_page(&state, &viewer, uri.path(), "post_list.html", context).await
}

/// GET /about
pub async fn about(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
) -> Result<Html<String>, WebError> {
    let team_members = state.site_service.list_team().await?;

    let mut context = TeraContext::new();
    context.insert("team_members", &team_members);

    render_page(&state, &viewer, uri.path(), "about.html", context).await
}
