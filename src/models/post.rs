//! Post model
//!
//! This module provides:
//! - `Post` entity representing a news story
//! - `PostStatus` enum for the active/inactive switch
//! - Input types for creating and updating posts
//! - Pagination types for list queries
//!
//! A post is publicly visible only when it is active *and* carries a
//! publication timestamp. A post without `published_at` is a draft no matter
//! what its status says.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Headline
    pub title: String,
    /// Body text
    pub content: String,
    /// Path or URL of the lead image
    pub featured_image: Option<String>,
    /// Author user ID
    pub author_id: i64,
    /// Category ID
    pub category_id: i64,
    /// Active/inactive switch
    pub status: PostStatus,
    /// Number of qualifying reads
    #[serde(default)]
    pub views_count: i64,
    /// Publication timestamp, `None` for drafts
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Whether the public site may show this post
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Active && self.published_at.is_some()
    }

    /// Drafts have never been stamped with a publication time
    pub fn is_draft(&self) -> bool {
        self.published_at.is_none()
    }
}

/// Post status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Active,
    Inactive,
}

impl PostStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Inactive => "inactive",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(PostStatus::Active),
            "inactive" => Some(PostStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub author_id: i64,
    pub category_id: i64,
    /// Defaults to `Active`
    pub status: Option<PostStatus>,
    /// Leave empty to create a draft
    pub published_at: Option<DateTime<Utc>>,
    pub tag_ids: Vec<i64>,
}

impl CreatePostInput {
    /// Create a new draft input
    pub fn new(title: String, content: String, author_id: i64, category_id: i64) -> Self {
        Self {
            title,
            content,
            featured_image: None,
            author_id,
            category_id,
            status: None,
            published_at: None,
            tag_ids: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_featured_image(mut self, featured_image: String) -> Self {
        self.featured_image = Some(featured_image);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }
}

/// Input for updating an existing post.
///
/// `published_at` is intentionally absent: the publish action is the only
/// way to stamp a publication time after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `Some(None)` clears the image
    pub featured_image: Option<Option<String>>,
    pub category_id: Option<i64>,
    pub status: Option<PostStatus>,
    /// Replaces the full tag set when present
    pub tag_ids: Option<Vec<i64>>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_category_id(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = Some(tag_ids);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.featured_image.is_some()
            || self.category_id.is_some()
            || self.status.is_some()
            || self.tag_ids.is_some()
    }
}

/// Which posts a query may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// `status = active` and a publication timestamp
    #[default]
    Published,
    /// No publication timestamp, any status
    Drafts,
    /// No restriction
    All,
}

/// Sort order for post lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    /// Newest publication first
    #[default]
    Latest,
    /// Newest publication first, ties broken by view count
    LatestByViews,
    /// Newest creation first, used for drafts
    Created,
}

/// Filter for post list queries.
///
/// Every public surface goes through a `PostQuery` with
/// `Visibility::Published`, which keeps drafts and inactive posts out of
/// listings, search results and category/tag pages alike.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub visibility: Visibility,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    /// Case-insensitive substring matched against title or content
    pub search: Option<String>,
    /// Only posts published at or after this instant
    pub published_since: Option<DateTime<Utc>>,
}

impl PostQuery {
    pub fn published() -> Self {
        Self::default()
    }

    pub fn drafts() -> Self {
        Self {
            visibility: Visibility::Drafts,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            visibility: Visibility::All,
            ..Self::default()
        }
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tag(mut self, tag_id: i64) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    /// Blank terms are ignored
    pub fn matching(mut self, term: &str) -> Self {
        let term = term.trim();
        self.search = if term.is_empty() {
            None
        } else {
            Some(term.to_string())
        };
        self
    }

    pub fn since(mut self, instant: DateTime<Utc>) -> Self {
        self.published_since = Some(instant);
        self
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        (self.total as u64).div_ceil(self.per_page as u64) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Transform every item while keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_post() -> Post {
        let now = Utc::now();
        Post {
            id: 1,
            title: "Title".to_string(),
            content: "Body".to_string(),
            featured_image: None,
            author_id: 1,
            category_id: 1,
            status: PostStatus::Active,
            views_count: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_visibility_requires_active_and_timestamp() {
        let mut post = sample_post();
        assert!(post.is_draft());
        assert!(!post.is_published());

        post.published_at = Some(Utc::now());
        assert!(post.is_published());
        assert!(!post.is_draft());

        post.status = PostStatus::Inactive;
        assert!(!post.is_published());
        assert!(!post.is_draft());
    }

    #[test]
    fn test_post_status_parse() {
        assert_eq!(PostStatus::from_str("active"), Some(PostStatus::Active));
        assert_eq!(PostStatus::from_str("INACTIVE"), Some(PostStatus::Inactive));
        assert_eq!(PostStatus::from_str("draft"), None);
        assert_eq!(PostStatus::default(), PostStatus::Active);
        assert_eq!(PostStatus::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_update_input_has_changes() {
        assert!(!UpdatePostInput::new().has_changes());
        assert!(UpdatePostInput::new().with_tags(vec![]).has_changes());
        assert!(UpdatePostInput::new()
            .with_title("x".to_string())
            .has_changes());
    }

    #[test]
    fn test_paged_result_pages() {
        let params = ListParams::new(2, 10);
        let page = PagedResult::new(vec![1, 2, 3], 23, &params);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::default());
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
    }

    proptest! {
        #[test]
        fn list_params_are_clamped(page in 0u32..10_000, per_page in 0u32..10_000) {
            let params = ListParams::new(page, per_page);
            prop_assert!(params.page >= 1);
            prop_assert!((1..=100).contains(&params.per_page));
            prop_assert_eq!(params.offset(), (params.page as i64 - 1) * params.per_page as i64);
        }
    }
}
