//! Comment repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on a post with author data, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    async fn count_by_post(&self, post_id: i64) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO comments (post_id, user_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(input.post_id)
                .bind(input.user_id)
                .bind(&input.content)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(input.post_id)
                .bind(input.user_id)
                .bind(&input.content)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            post_id: input.post_id,
            user_id: input.user_id,
            content: input.content.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = "SELECT id, post_id, user_id, content, created_at, updated_at FROM comments WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get comment")?
                .as_ref()
                .map(row_to_comment_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .fetch_optional(self.pool.mysql_pool()?)
                .await
                .context("Failed to get comment")?
                .as_ref()
                .map(row_to_comment_mysql)
                .transpose(),
        }
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let sql = r#"
            SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, c.updated_at,
                   u.username, p.image AS avatar
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            LEFT JOIN user_profiles p ON p.user_id = c.user_id
            WHERE c.post_id = ?
            ORDER BY c.created_at ASC, c.id ASC
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_all(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to list comments")?;
                rows.iter()
                    .map(|row| -> Result<CommentWithAuthor> {
                        Ok(CommentWithAuthor {
                            comment: row_to_comment_sqlite(row)?,
                            username: row.try_get("username")?,
                            avatar: row.try_get("avatar")?,
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_all(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to list comments")?;
                rows.iter()
                    .map(|row| -> Result<CommentWithAuthor> {
                        Ok(CommentWithAuthor {
                            comment: row_to_comment_mysql(row)?,
                            username: row.try_get("username")?,
                            avatar: row.try_get("avatar")?,
                        })
                    })
                    .collect()
            }
        }
    }

    async fn count_by_post(&self, post_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM comments WHERE post_id = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(post_id)
                .fetch_one(self.pool.sqlite_pool()?)
                .await
                .context("Failed to count comments")?
                .try_get(0)?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(post_id)
                .fetch_one(self.pool.mysql_pool()?)
                .await
                .context("Failed to count comments")?
                .try_get(0)?,
        };
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCommentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sqlite_pool = pool.sqlite_pool().unwrap();
        for sql in [
            "INSERT INTO users (username, email, password_hash) VALUES ('alice', 'alice@example.com', 'h')",
            "INSERT INTO users (username, email, password_hash) VALUES ('bob', 'bob@example.com', 'h')",
            "INSERT INTO categories (name) VALUES ('News')",
            "INSERT INTO posts (title, content, author_id, category_id) VALUES ('t', 'c', 1, 1)",
            "INSERT INTO user_profiles (user_id, image) VALUES (2, 'bob.png')",
        ] {
            sqlx::query(sql).execute(sqlite_pool).await.unwrap();
        }
        (pool.clone(), SqlxCommentRepository::new(pool))
    }

    fn input(user_id: i64, content: &str) -> CreateCommentInput {
        CreateCommentInput {
            post_id: 1,
            user_id,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_with_authors() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&input(1, "first")).await.expect("Failed to create comment");
        repo.create(&input(2, "second")).await.expect("Failed to create comment");

        let comments = repo.list_by_post(1).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.content, "first");
        assert_eq!(comments[0].username, "alice");
        assert!(comments[0].avatar.is_none());
        assert_eq!(comments[1].avatar.as_deref(), Some("bob.png"));
        assert_eq!(repo.count_by_post(1).await.unwrap(), 2);
        assert_eq!(repo.count_by_post(2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comment_requires_existing_post() {
        let (_pool, repo) = setup_test_repo().await;
        let mut bad = input(1, "orphan");
        bad.post_id = 42;
        assert!(repo.create(&bad).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_pool, repo) = setup_test_repo().await;
        let comment = repo.create(&input(1, "bye")).await.unwrap();

        assert!(repo.get_by_id(comment.id).await.unwrap().is_some());
        assert!(repo.delete(comment.id).await.unwrap());
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());
        assert!(!repo.delete(comment.id).await.unwrap());
    }
}
