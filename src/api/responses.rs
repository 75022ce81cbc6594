//! Shared API response types
//!
//! Response structures used across several endpoints. Timestamps are
//! rendered as RFC 3339 strings.

use serde::Serialize;

use crate::models::{CommentWithAuthor, Group, PagedResult, Post, User};

// ============================================================================
// Post Response Types
// ============================================================================

/// Full post representation
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub author_id: i64,
    pub category_id: i64,
    pub status: String,
    pub views_count: i64,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub tag_ids: Vec<i64>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            featured_image: post.featured_image,
            author_id: post.author_id,
            category_id: post.category_id,
            status: post.status.to_string(),
            views_count: post.views_count,
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            tag_ids: Vec::new(),
        }
    }
}

impl PostResponse {
    pub fn with_tag_ids(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// One page of a list endpoint
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T, U: Into<T>> From<PagedResult<U>> for PageResponse<T> {
    fn from(result: PagedResult<U>) -> Self {
        let total_pages = result.total_pages();
        Self {
            total: result.total,
            page: result.page,
            page_size: result.per_page,
            total_pages,
            items: result.items.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Account Response Types
// ============================================================================

/// User representation, never including the password hash
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            is_active: user.is_active,
            date_joined: user.date_joined.to_rfc3339(),
            groups: None,
        }
    }
}

impl UserResponse {
    pub fn with_groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = Some(groups);
        self
    }
}

// ============================================================================
// Comment Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub avatar: Option<String>,
    pub content: String,
    pub created_at: String,
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(item: CommentWithAuthor) -> Self {
        Self {
            id: item.comment.id,
            post_id: item.comment.post_id,
            user_id: item.comment.user_id,
            username: item.username,
            avatar: item.avatar,
            content: item.comment.content,
            created_at: item.comment.created_at.to_rfc3339(),
        }
    }
}
