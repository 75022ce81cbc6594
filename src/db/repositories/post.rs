//! Post repository
//!
//! Database operations for posts and their tag links.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! List queries are assembled from a `PostQuery`. Both dialects share the
//! same `?` placeholder syntax, so the WHERE clause is built once and bound
//! per driver.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    CreatePostInput, Post, PostOrder, PostQuery, PostStatus, UpdatePostInput, Visibility,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

const POST_COLUMNS: &str = "id, title, content, featured_image, author_id, category_id, status, views_count, published_at, created_at, updated_at";

/// Predicate shared by every public read
const VISIBLE: &str = "status = 'active' AND published_at IS NOT NULL";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post together with its tag links
    async fn create(&self, input: &CreatePostInput) -> Result<Post>;

    /// Get post by ID regardless of visibility
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// List posts matching the query
    async fn find(
        &self,
        query: &PostQuery,
        order: PostOrder,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>>;

    /// Count posts matching the query
    async fn count(&self, query: &PostQuery) -> Result<i64>;

    /// Update a post; tag links are replaced when `tag_ids` is set
    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Post>;

    /// Delete a post, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Atomically bump the view counter of a published post.
    ///
    /// Returns `false` when the post does not exist or is not published.
    async fn increment_views(&self, id: i64) -> Result<bool>;

    /// Stamp `published_at`, returning whether the post exists
    async fn publish(&self, id: i64, at: DateTime<Utc>) -> Result<bool>;

    /// Tag IDs linked to a post
    async fn get_tag_ids(&self, post_id: i64) -> Result<Vec<i64>>;

    /// Replace the tag links of a post
    async fn set_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.sqlite_pool()?, input).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.mysql_pool()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.sqlite_pool()?, id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.mysql_pool()?, id).await,
        }
    }

    async fn find(
        &self,
        query: &PostQuery,
        order: PostOrder,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let filter = SqlFilter::from_query(query);
        let sql = format!(
            "SELECT {} FROM posts{} ORDER BY {} LIMIT ? OFFSET ?",
            POST_COLUMNS,
            filter.where_clause(),
            order_by(order)
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_posts_sqlite(self.pool.sqlite_pool()?, &sql, &filter, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                find_posts_mysql(self.pool.mysql_pool()?, &sql, &filter, offset, limit).await
            }
        }
    }

    async fn count(&self, query: &PostQuery) -> Result<i64> {
        let filter = SqlFilter::from_query(query);
        let sql = format!("SELECT COUNT(*) FROM posts{}", filter.where_clause());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_posts_sqlite(self.pool.sqlite_pool()?, &sql, &filter).await,
            DatabaseDriver::Mysql => count_posts_mysql(self.pool.mysql_pool()?, &sql, &filter).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.sqlite_pool()?, id, input).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.mysql_pool()?, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // post_tags and comments go with it through ON DELETE CASCADE
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn increment_views(&self, id: i64) -> Result<bool> {
        let sql = format!(
            "UPDATE posts SET views_count = COALESCE(views_count, 0) + 1 WHERE id = ? AND {}",
            VISIBLE
        );
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to increment view count")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to increment view count")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn publish(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let sql = "UPDATE posts SET published_at = ?, updated_at = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(at)
                .bind(at)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to publish post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(at)
                .bind(at)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to publish post")?
                .rows_affected(),
        };
        // MySQL reports 0 affected rows when the values are unchanged
        if affected > 0 {
            return Ok(true);
        }
        Ok(self.get_by_id(id).await?.is_some())
    }

    async fn get_tag_ids(&self, post_id: i64) -> Result<Vec<i64>> {
        let sql = "SELECT tag_id FROM post_tags WHERE post_id = ? ORDER BY tag_id";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_all(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to get post tags")?;
                Ok(rows
                    .iter()
                    .map(|row| row.try_get("tag_id"))
                    .collect::<Result<Vec<i64>, _>>()?)
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_all(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to get post tags")?;
                Ok(rows
                    .iter()
                    .map(|row| row.try_get("tag_id"))
                    .collect::<Result<Vec<i64>, _>>()?)
            }
        }
    }

    async fn set_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_tags_sqlite(self.pool.sqlite_pool()?, post_id, tag_ids).await,
            DatabaseDriver::Mysql => set_tags_mysql(self.pool.mysql_pool()?, post_id, tag_ids).await,
        }
    }
}

// ============================================================================
// Query assembly
// ============================================================================

enum BindValue {
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

/// WHERE clause fragments plus the values bound to their placeholders
struct SqlFilter {
    clauses: Vec<String>,
    binds: Vec<BindValue>,
}

impl SqlFilter {
    fn from_query(query: &PostQuery) -> Self {
        let mut clauses = Vec::new();
        let mut binds = Vec::new();

        match query.visibility {
            Visibility::Published => clauses.push(VISIBLE.to_string()),
            Visibility::Drafts => clauses.push("published_at IS NULL".to_string()),
            Visibility::All => {}
        }

        if let Some(category_id) = query.category_id {
            clauses.push("category_id = ?".to_string());
            binds.push(BindValue::Int(category_id));
        }

        if let Some(tag_id) = query.tag_id {
            clauses.push("id IN (SELECT post_id FROM post_tags WHERE tag_id = ?)".to_string());
            binds.push(BindValue::Int(tag_id));
        }

        if let Some(term) = &query.search {
            clauses.push(
                "(search_title LIKE ? ESCAPE '!' OR search_content LIKE ? ESCAPE '!')".to_string(),
            );
            let pattern = like_pattern(term);
            binds.push(BindValue::Text(pattern.clone()));
            binds.push(BindValue::Text(pattern));
        }

        if let Some(since) = query.published_since {
            clauses.push("published_at >= ?".to_string());
            binds.push(BindValue::Time(since));
        }

        Self { clauses, binds }
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn bind_sqlite<'q>(
        &'q self,
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        for value in &self.binds {
            query = match value {
                BindValue::Int(v) => query.bind(*v),
                BindValue::Text(v) => query.bind(v.as_str()),
                BindValue::Time(v) => query.bind(*v),
            };
        }
        query
    }

    fn bind_mysql<'q>(
        &'q self,
        mut query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        for value in &self.binds {
            query = match value {
                BindValue::Int(v) => query.bind(*v),
                BindValue::Text(v) => query.bind(v.as_str()),
                BindValue::Time(v) => query.bind(*v),
            };
        }
        query
    }
}

fn order_by(order: PostOrder) -> &'static str {
    match order {
        PostOrder::Latest => "published_at DESC, id DESC",
        PostOrder::LatestByViews => "published_at DESC, views_count DESC, id DESC",
        PostOrder::Created => "created_at DESC, id DESC",
    }
}

/// Case-folded copy stored in `search_title` and `search_content`.
///
/// SQLite's `LOWER` folds ASCII only.
pub(crate) fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Case-folded `%term%` with LIKE wildcards escaped by `!`
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in fold_case(term).chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let status = input.status.unwrap_or_default();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, content, search_title, search_content, featured_image, author_id, category_id, status, views_count, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(fold_case(&input.title))
    .bind(fold_case(&input.content))
    .bind(&input.featured_image)
    .bind(input.author_id)
    .bind(input.category_id)
    .bind(status.as_str())
    .bind(input.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_rowid();
    set_tags_sqlite(pool, id, &input.tag_ids).await?;

    Ok(Post {
        id,
        title: input.title.clone(),
        content: input.content.clone(),
        featured_image: input.featured_image.clone(),
        author_id: input.author_id,
        category_id: input.category_id,
        status,
        views_count: 0,
        published_at: input.published_at,
        created_at: now,
        updated_at: now,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn find_posts_sqlite(
    pool: &SqlitePool,
    sql: &str,
    filter: &SqlFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let rows = filter
        .bind_sqlite(sqlx::query(sql))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn count_posts_sqlite(pool: &SqlitePool, sql: &str, filter: &SqlFilter) -> Result<i64> {
    let row = filter
        .bind_sqlite(sqlx::query(sql))
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.try_get(0)?)
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, input: &UpdatePostInput) -> Result<Post> {
    let existing = get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

    let now = Utc::now();
    let featured_image = match &input.featured_image {
        Some(image) => image.clone(),
        None => existing.featured_image.clone(),
    };

    let title = input.title.as_ref().unwrap_or(&existing.title);
    let content = input.content.as_ref().unwrap_or(&existing.content);

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, content = ?, search_title = ?, search_content = ?, featured_image = ?, category_id = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(fold_case(title))
    .bind(fold_case(content))
    .bind(&featured_image)
    .bind(input.category_id.unwrap_or(existing.category_id))
    .bind(input.status.unwrap_or(existing.status).as_str())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    if let Some(tag_ids) = &input.tag_ids {
        set_tags_sqlite(pool, id, tag_ids).await?;
    }

    get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn set_tags_sqlite(pool: &SqlitePool, post_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag to post")?;
    }

    tx.commit().await?;
    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status_str: String = row.try_get("status")?;
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", status_str))?;

    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        featured_image: row.try_get("featured_image")?,
        author_id: row.try_get("author_id")?,
        category_id: row.try_get("category_id")?,
        status,
        views_count: row.try_get::<Option<i64>, _>("views_count")?.unwrap_or(0),
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let status = input.status.unwrap_or_default();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, content, search_title, search_content, featured_image, author_id, category_id, status, views_count, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(fold_case(&input.title))
    .bind(fold_case(&input.content))
    .bind(&input.featured_image)
    .bind(input.author_id)
    .bind(input.category_id)
    .bind(status.as_str())
    .bind(input.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_id() as i64;
    set_tags_mysql(pool, id, &input.tag_ids).await?;

    Ok(Post {
        id,
        title: input.title.clone(),
        content: input.content.clone(),
        featured_image: input.featured_image.clone(),
        author_id: input.author_id,
        category_id: input.category_id,
        status,
        views_count: 0,
        published_at: input.published_at,
        created_at: now,
        updated_at: now,
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn find_posts_mysql(
    pool: &MySqlPool,
    sql: &str,
    filter: &SqlFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let rows = filter
        .bind_mysql(sqlx::query(sql))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn count_posts_mysql(pool: &MySqlPool, sql: &str, filter: &SqlFilter) -> Result<i64> {
    let row = filter
        .bind_mysql(sqlx::query(sql))
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.try_get(0)?)
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, input: &UpdatePostInput) -> Result<Post> {
    let existing = get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

    let now = Utc::now();
    let featured_image = match &input.featured_image {
        Some(image) => image.clone(),
        None => existing.featured_image.clone(),
    };

    let title = input.title.as_ref().unwrap_or(&existing.title);
    let content = input.content.as_ref().unwrap_or(&existing.content);

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, content = ?, search_title = ?, search_content = ?, featured_image = ?, category_id = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(fold_case(title))
    .bind(fold_case(content))
    .bind(&featured_image)
    .bind(input.category_id.unwrap_or(existing.category_id))
    .bind(input.status.unwrap_or(existing.status).as_str())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    if let Some(tag_ids) = &input.tag_ids {
        set_tags_mysql(pool, id, tag_ids).await?;
    }

    get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn set_tags_mysql(pool: &MySqlPool, post_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag to post")?;
    }

    tx.commit().await?;
    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let status_str: String = row.try_get("status")?;
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", status_str))?;

    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        featured_image: row.try_get("featured_image")?,
        author_id: row.try_get("author_id")?,
        category_id: row.try_get("category_id")?,
        status,
        views_count: row.try_get::<Option<i64>, _>("views_count")?.unwrap_or(0),
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    struct Fixture {
        pool: DynDatabasePool,
        repo: SqlxPostRepository,
        author_id: i64,
        category_id: i64,
    }

    async fn setup_test_repo() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sqlite_pool = pool.sqlite_pool().unwrap();
        let author_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES ('writer', 'writer@example.com', 'hash')",
        )
        .execute(sqlite_pool)
        .await
        .expect("Failed to create user")
        .last_insert_rowid();
        let category_id = insert_category(sqlite_pool, "World").await;

        let repo = SqlxPostRepository::new(pool.clone());
        Fixture {
            pool,
            repo,
            author_id,
            category_id,
        }
    }

    async fn insert_category(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .expect("Failed to create category")
            .last_insert_rowid()
    }

    async fn insert_tag(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .expect("Failed to create tag")
            .last_insert_rowid()
    }

    impl Fixture {
        async fn published(&self, title: &str, content: &str, at: DateTime<Utc>) -> Post {
            let input = CreatePostInput::new(
                title.to_string(),
                content.to_string(),
                self.author_id,
                self.category_id,
            )
            .with_published_at(at);
            self.repo.create(&input).await.expect("Failed to create post")
        }

        async fn draft(&self, title: &str) -> Post {
            let input = CreatePostInput::new(
                title.to_string(),
                "draft body".to_string(),
                self.author_id,
                self.category_id,
            );
            self.repo.create(&input).await.expect("Failed to create post")
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let fx = setup_test_repo().await;
        let created = fx.draft("Breaking").await;

        assert!(created.id > 0);
        assert_eq!(created.status, PostStatus::Active);
        assert!(created.is_draft());

        let found = fx
            .repo
            .get_by_id(created.id)
            .await
            .unwrap()
            .expect("Post not found");
        assert_eq!(found.title, "Breaking");
        assert_eq!(found.views_count, 0);
        assert!(fx.repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_published_query_excludes_drafts_and_inactive() {
        let fx = setup_test_repo().await;
        let visible = fx.published("Visible", "body", Utc::now()).await;
        fx.draft("Draft").await;
        let hidden = fx.published("Hidden", "body", Utc::now()).await;
        fx.repo
            .update(hidden.id, &UpdatePostInput::new().with_status(PostStatus::Inactive))
            .await
            .unwrap();

        let posts = fx
            .repo
            .find(&PostQuery::published(), PostOrder::Latest, 0, 10)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, visible.id);
        assert_eq!(fx.repo.count(&PostQuery::published()).await.unwrap(), 1);

        let drafts = fx
            .repo
            .find(&PostQuery::drafts(), PostOrder::Created, 0, 10)
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Draft");
        assert_eq!(fx.repo.count(&PostQuery::all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_latest_order_and_pagination() {
        let fx = setup_test_repo().await;
        let now = Utc::now();
        for i in 0..5 {
            fx.published(&format!("Post {}", i), "body", now - Duration::hours(i))
                .await;
        }

        let first = fx
            .repo
            .find(&PostQuery::published(), PostOrder::Latest, 0, 2)
            .await
            .unwrap();
        let titles: Vec<_> = first.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 0", "Post 1"]);

        let last = fx
            .repo
            .find(&PostQuery::published(), PostOrder::Latest, 4, 2)
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].title, "Post 4");
    }

    #[tokio::test]
    async fn test_views_break_ties_in_latest_by_views() {
        let fx = setup_test_repo().await;
        let at = Utc::now();
        let quiet = fx.published("Quiet", "body", at).await;
        let busy = fx.published("Busy", "body", at).await;
        for _ in 0..3 {
            fx.repo.increment_views(busy.id).await.unwrap();
        }
        fx.repo.increment_views(quiet.id).await.unwrap();

        let posts = fx
            .repo
            .find(&PostQuery::published(), PostOrder::LatestByViews, 0, 10)
            .await
            .unwrap();
        assert_eq!(posts[0].id, busy.id);
    }

    #[tokio::test]
    async fn test_search_matches_title_or_content_case_insensitively() {
        let fx = setup_test_repo().await;
        fx.published("Rust Weekly", "news", Utc::now()).await;
        fx.published("Gardening", "growing RUST-resistant roses", Utc::now())
            .await;
        fx.published("Cooking", "pasta", Utc::now()).await;

        let query = PostQuery::published().matching("rust");
        let posts = fx
            .repo
            .find(&query, PostOrder::Latest, 0, 10)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(fx.repo.count(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_capitals() {
        let fx = setup_test_repo().await;
        let post = fx.published("ÉTÉ CAFÉ report", "body", Utc::now()).await;
        fx.published("Winter market", "body", Utc::now()).await;

        for term in ["ÉTÉ CAFÉ", "été café", "Été Café"] {
            let query = PostQuery::published().matching(term);
            let posts = fx
                .repo
                .find(&query, PostOrder::Latest, 0, 10)
                .await
                .unwrap();
            assert_eq!(posts.len(), 1, "search for {term:?}");
            assert_eq!(posts[0].id, post.id);
            assert_eq!(fx.repo.count(&query).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_search_sees_updated_text() {
        let fx = setup_test_repo().await;
        let post = fx.published("Draft headline", "body", Utc::now()).await;

        let input = UpdatePostInput {
            title: Some("ÖRESUND BRIDGE closed".to_string()),
            ..Default::default()
        };
        fx.repo.update(post.id, &input).await.unwrap();

        let query = PostQuery::published().matching("öresund");
        assert_eq!(fx.repo.count(&query).await.unwrap(), 1);
        let stale = PostQuery::published().matching("draft headline");
        assert_eq!(fx.repo.count(&stale).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let fx = setup_test_repo().await;
        fx.published("100% organic", "body", Utc::now()).await;
        fx.published("100 percent", "body", Utc::now()).await;

        let posts = fx
            .repo
            .find(
                &PostQuery::published().matching("100%"),
                PostOrder::Latest,
                0,
                10,
            )
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "100% organic");

        let none = fx
            .repo
            .count(&PostQuery::published().matching("_"))
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_filter_by_category_and_tag() {
        let fx = setup_test_repo().await;
        let sqlite_pool = fx.pool.sqlite_pool().unwrap();
        let sports = insert_category(sqlite_pool, "Sports").await;
        let tag = insert_tag(sqlite_pool, "football").await;

        let input = CreatePostInput::new("Match".into(), "body".into(), fx.author_id, sports)
            .with_published_at(Utc::now())
            .with_tags(vec![tag]);
        let tagged = fx.repo.create(&input).await.unwrap();
        fx.published("Other", "body", Utc::now()).await;

        let by_category = fx
            .repo
            .find(&PostQuery::published().in_category(sports), PostOrder::Latest, 0, 10)
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].id, tagged.id);

        let by_tag = fx
            .repo
            .find(&PostQuery::published().with_tag(tag), PostOrder::Latest, 0, 10)
            .await
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, tagged.id);
        assert_eq!(fx.repo.get_tag_ids(tagged.id).await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn test_published_since() {
        let fx = setup_test_repo().await;
        let now = Utc::now();
        fx.published("Fresh", "body", now - Duration::days(1)).await;
        fx.published("Stale", "body", now - Duration::days(10)).await;

        let posts = fx
            .repo
            .find(
                &PostQuery::published().since(now - Duration::days(7)),
                PostOrder::LatestByViews,
                0,
                5,
            )
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Fresh");
    }

    #[tokio::test]
    async fn test_increment_views_only_for_published() {
        let fx = setup_test_repo().await;
        let post = fx.published("Live", "body", Utc::now()).await;
        let draft = fx.draft("Not yet").await;

        assert!(fx.repo.increment_views(post.id).await.unwrap());
        assert!(fx.repo.increment_views(post.id).await.unwrap());
        assert!(!fx.repo.increment_views(draft.id).await.unwrap());
        assert!(!fx.repo.increment_views(9999).await.unwrap());

        let post = fx.repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(post.views_count, 2);
        let draft = fx.repo.get_by_id(draft.id).await.unwrap().unwrap();
        assert_eq!(draft.views_count, 0);
    }

    #[tokio::test]
    async fn test_increment_views_treats_null_as_zero() {
        let fx = setup_test_repo().await;
        let post = fx.published("Legacy", "body", Utc::now()).await;
        sqlx::query("UPDATE posts SET views_count = NULL WHERE id = ?")
            .bind(post.id)
            .execute(fx.pool.sqlite_pool().unwrap())
            .await
            .unwrap();

        assert_eq!(fx.repo.get_by_id(post.id).await.unwrap().unwrap().views_count, 0);
        fx.repo.increment_views(post.id).await.unwrap();
        assert_eq!(fx.repo.get_by_id(post.id).await.unwrap().unwrap().views_count, 1);
    }

    #[tokio::test]
    async fn test_publish_moves_draft_into_public_listing() {
        let fx = setup_test_repo().await;
        let draft = fx.draft("Soon").await;
        assert_eq!(fx.repo.count(&PostQuery::published()).await.unwrap(), 0);

        assert!(fx.repo.publish(draft.id, Utc::now()).await.unwrap());
        assert!(!fx.repo.publish(9999, Utc::now()).await.unwrap());

        let post = fx.repo.get_by_id(draft.id).await.unwrap().unwrap();
        assert!(post.published_at.is_some());
        assert_eq!(fx.repo.count(&PostQuery::published()).await.unwrap(), 1);
        assert_eq!(fx.repo.count(&PostQuery::drafts()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_tags_and_keeps_published_at() {
        let fx = setup_test_repo().await;
        let sqlite_pool = fx.pool.sqlite_pool().unwrap();
        let a = insert_tag(sqlite_pool, "a").await;
        let b = insert_tag(sqlite_pool, "b").await;
        let post = fx.published("Title", "body", Utc::now()).await;
        fx.repo.set_tags(post.id, &[a]).await.unwrap();

        let updated = fx
            .repo
            .update(
                post.id,
                &UpdatePostInput::new()
                    .with_title("New title".to_string())
                    .with_tags(vec![b]),
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.content, "body");
        assert!(updated.published_at.is_some());
        assert_eq!(fx.repo.get_tag_ids(post.id).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_delete() {
        let fx = setup_test_repo().await;
        let post = fx.draft("Gone").await;

        assert!(fx.repo.delete(post.id).await.unwrap());
        assert!(!fx.repo.delete(post.id).await.unwrap());
        assert!(fx.repo.get_by_id(post.id).await.unwrap().is_none());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Rust"), "%rust%");
        assert_eq!(like_pattern("50%_off!"), "%50!%!_off!!%");
    }
}
