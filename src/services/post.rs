//! Post service
//!
//! Implements the publishing rules on top of `PostRepository`:
//! - public reads only ever see active posts with a publication time
//! - reading a single published post counts as a view
//! - drafts are listed separately and published through one explicit action
//! - home page lists (latest, featured, popular, weekly top)

use crate::db::repositories::{CategoryRepository, PostRepository, TagRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostOrder, PostQuery, Tag, UpdatePostInput,
};
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Maximum title length in characters
pub const MAX_TITLE_LENGTH: usize = 255;

const HOME_LATEST: i64 = 4;
const HOME_POPULAR: i64 = 5;
const HOME_WEEKLY_TOP: i64 = 5;
const WEEKLY_TOP_DAYS: i64 = 7;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Tag not found: {0}")]
    TagNotFound(i64),

    /// Invalid input; the first field is the offending field name
    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Everything the home page lists
#[derive(Debug, Clone, Serialize, Default)]
pub struct HomePosts {
    pub latest: Vec<Post>,
    pub featured: Option<Post>,
    pub popular: Vec<Post>,
    pub weekly_top: Vec<Post>,
}

/// Post service
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
        }
    }

    /// Page through posts matching `query`
    pub async fn list(
        &self,
        query: &PostQuery,
        order: PostOrder,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let items = self
            .posts
            .find(query, order, params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        let total = self
            .posts
            .count(query)
            .await
            .context("Failed to count posts")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Published posts, optionally narrowed by a search term
    pub async fn list_published(
        &self,
        search: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let mut query = PostQuery::published();
        if let Some(term) = search {
            query = query.matching(term);
        }
        self.list(&query, PostOrder::Latest, params).await
    }

    /// Published posts in a category; an unknown category is simply empty
    pub async fn list_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let query = PostQuery::published().in_category(category_id);
        self.list(&query, PostOrder::Latest, params).await
    }

    /// Published posts carrying a tag
    pub async fn list_by_tag(
        &self,
        tag_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let query = PostQuery::published().with_tag(tag_id);
        self.list(&query, PostOrder::Latest, params).await
    }

    /// Case-insensitive title/content search over published posts.
    ///
    /// A blank term yields an empty page rather than every post.
    pub async fn search(
        &self,
        term: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let query = PostQuery::published().matching(term);
        if query.search.is_none() {
            return Ok(PagedResult::new(Vec::new(), 0, params));
        }
        self.list(&query, PostOrder::Latest, params).await
    }

    /// Most recent published posts
    pub async fn popular(&self, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        Ok(self
            .posts
            .find(&PostQuery::published(), PostOrder::Latest, 0, limit)
            .await
            .context("Failed to list popular posts")?)
    }

    pub async fn home(&self) -> Result<HomePosts, PostServiceError> {
        let published = PostQuery::published();
        let latest = self
            .posts
            .find(&published, PostOrder::Latest, 0, HOME_LATEST)
            .await
            .context("Failed to list latest posts")?;
        let featured = self
            .posts
            .find(&published, PostOrder::LatestByViews, 0, 1)
            .await
            .context("Failed to load featured post")?
            .into_iter()
            .next();
        let popular = self.popular(HOME_POPULAR).await?;
        let weekly = PostQuery::published().since(Utc::now() - Duration::days(WEEKLY_TOP_DAYS));
        let weekly_top = self
            .posts
            .find(&weekly, PostOrder::LatestByViews, 0, HOME_WEEKLY_TOP)
            .await
            .context("Failed to list weekly top posts")?;

        Ok(HomePosts {
            latest,
            featured,
            popular,
            weekly_top,
        })
    }

    /// Read a published post, counting the view.
    ///
    /// The returned post already carries the incremented counter.
    pub async fn view(&self, id: i64) -> Result<Post, PostServiceError> {
        let counted = self
            .posts
            .increment_views(id)
            .await
            .context("Failed to count post view")?;
        if !counted {
            return Err(PostServiceError::NotFound(id));
        }
        self.get(id).await
    }

    /// Get a post regardless of visibility
    pub async fn get(&self, id: i64) -> Result<Post, PostServiceError> {
        self.posts
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))
    }

    /// Drafts, newest first
    pub async fn list_drafts(&self, params: &ListParams) -> Result<PagedResult<Post>, PostServiceError> {
        self.list(&PostQuery::drafts(), PostOrder::Created, params).await
    }

    /// A single draft; published posts are not found here
    pub async fn get_draft(&self, id: i64) -> Result<Post, PostServiceError> {
        let post = self.get(id).await?;
        if !post.is_draft() {
            return Err(PostServiceError::NotFound(id));
        }
        Ok(post)
    }

    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        validate_title(&input.title)?;
        validate_content(&input.content)?;
        self.ensure_category(input.category_id).await?;
        self.ensure_tags(&input.tag_ids).await?;

        let post = self
            .posts
            .create(&input)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = post.id, published = post.is_published(), "Post created");
        Ok(post)
    }

    pub async fn update(&self, id: i64, input: UpdatePostInput) -> Result<Post, PostServiceError> {
        self.get(id).await?;

        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        if let Some(content) = &input.content {
            validate_content(content)?;
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
        }
        if let Some(tag_ids) = &input.tag_ids {
            self.ensure_tags(tag_ids).await?;
        }

        Ok(self
            .posts
            .update(id, &input)
            .await
            .context("Failed to update post")?)
    }

    /// Stamp the current time as the publication time.
    ///
    /// Publishing an already published post moves its timestamp forward.
    pub async fn publish(&self, id: i64) -> Result<Post, PostServiceError> {
        let found = self
            .posts
            .publish(id, Utc::now())
            .await
            .context("Failed to publish post")?;
        if !found {
            return Err(PostServiceError::NotFound(id));
        }

        let post = self.get(id).await?;
        tracing::info!(post_id = id, visible = post.is_published(), "Post published");
        Ok(post)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let deleted = self
            .posts
            .delete(id)
            .await
            .context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound(id));
        }
        Ok(())
    }

    pub async fn tag_ids(&self, post_id: i64) -> Result<Vec<i64>, PostServiceError> {
        Ok(self
            .posts
            .get_tag_ids(post_id)
            .await
            .context("Failed to load post tags")?)
    }

    pub async fn tags(&self, post_id: i64) -> Result<Vec<Tag>, PostServiceError> {
        Ok(self
            .tags
            .get_by_post(post_id)
            .await
            .context("Failed to load post tags")?)
    }

    async fn ensure_category(&self, category_id: i64) -> Result<(), PostServiceError> {
        self.categories
            .get_by_id(category_id)
            .await
            .context("Failed to check category")?
            .map(|_| ())
            .ok_or(PostServiceError::CategoryNotFound(category_id))
    }

    async fn ensure_tags(&self, tag_ids: &[i64]) -> Result<(), PostServiceError> {
        for &tag_id in tag_ids {
            if self
                .tags
                .get_by_id(tag_id)
                .await
                .context("Failed to check tag")?
                .is_none()
            {
                return Err(PostServiceError::TagNotFound(tag_id));
            }
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), PostServiceError> {
    if title.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "title",
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(PostServiceError::ValidationError(
            "title",
            format!("Title cannot exceed {} characters", MAX_TITLE_LENGTH),
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), PostServiceError> {
    if content.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "content",
            "Content cannot be empty".to_string(),
        ));
    }
    Ok(())
}
