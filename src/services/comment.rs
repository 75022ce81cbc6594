//! Comment service
//!
//! Signed-in readers comment on published posts; staff remove comments.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};
use crate::services::validation::required_text;
use anyhow::Context;
use std::sync::Arc;

/// Maximum comment length in characters
pub const MAX_COMMENT_LENGTH: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Add a comment to a published post
    pub async fn create(
        &self,
        user_id: i64,
        post_id: i64,
        content: &str,
    ) -> Result<Comment, CommentServiceError> {
        let content = required_text(content, MAX_COMMENT_LENGTH).ok_or_else(|| {
            CommentServiceError::ValidationError(format!(
                "Comment must be between 1 and {} characters",
                MAX_COMMENT_LENGTH
            ))
        })?;

        let post = self
            .posts
            .get_by_id(post_id)
            .await
            .context("Failed to load post")?;
        if !post.map(|p| p.is_published()).unwrap_or(false) {
            return Err(CommentServiceError::PostNotFound(post_id));
        }

        let comment = self
            .comments
            .create(&CreateCommentInput {
                post_id,
                user_id,
                content,
            })
            .await
            .context("Failed to create comment")?;

        tracing::debug!(comment_id = comment.id, post_id, user_id, "Comment created");
        Ok(comment)
    }

    /// Comments with author name and avatar, oldest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        Ok(self
            .comments
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")?)
    }

    pub async fn count_for_post(&self, post_id: i64) -> Result<i64, CommentServiceError> {
        Ok(self
            .comments
            .count_by_post(post_id)
            .await
            .context("Failed to count comments")?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        if !self.comments.delete(id).await.context("Failed to delete comment")? {
            return Err(CommentServiceError::NotFound(id));
        }
        tracing::info!(comment_id = id, "Comment removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CommentService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite_pool = pool.sqlite_pool().unwrap();
        for sql in [
            "INSERT INTO users (username, email, password_hash) VALUES ('reader', 'r@example.com', 'h')",
            "INSERT INTO categories (name) VALUES ('Local')",
            "INSERT INTO posts (title, content, author_id, category_id, published_at) VALUES ('live', 'c', 1, 1, CURRENT_TIMESTAMP)",
            "INSERT INTO posts (title, content, author_id, category_id) VALUES ('draft', 'c', 1, 1)",
        ] {
            sqlx::query(sql).execute(sqlite_pool).await.unwrap();
        }
        CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool),
        )
    }

    #[tokio::test]
    async fn test_comment_on_published_post() {
        let service = setup_test_service().await;
        let comment = service.create(1, 1, "  Great read  ").await.unwrap();
        assert_eq!(comment.content, "Great read");

        let listed = service.list_for_post(1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "reader");
        assert_eq!(service.count_for_post(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_comment_rejected_on_draft_or_missing_post() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.create(1, 2, "hi").await,
            Err(CommentServiceError::PostNotFound(2))
        ));
        assert!(matches!(
            service.create(1, 9, "hi").await,
            Err(CommentServiceError::PostNotFound(9))
        ));
        assert!(matches!(
            service.create(1, 1, "   ").await,
            Err(CommentServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = setup_test_service().await;
        let comment = service.create(1, 1, "bye").await.unwrap();
        service.delete(comment.id).await.unwrap();
        assert!(matches!(
            service.delete(comment.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
