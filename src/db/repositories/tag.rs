//! Tag repository
//!
//! Database operations for tags and the tag side of `post_tags`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Tag>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List tags ordered by name
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Tag>>;

    async fn count(&self) -> Result<i64>;

    async fn rename(&self, id: i64, name: &str) -> Result<Tag>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Tags linked to a post, ordered by name
    async fn get_by_post(&self, post_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, clause: &str, bind: TagKey<'_>) -> Result<Option<Tag>> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM tags WHERE {}",
            clause
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql);
                let query = match bind {
                    TagKey::Id(id) => query.bind(id),
                    TagKey::Name(name) => query.bind(name),
                };
                query
                    .fetch_optional(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to get tag")?
                    .as_ref()
                    .map(row_to_tag_sqlite)
                    .transpose()
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql);
                let query = match bind {
                    TagKey::Id(id) => query.bind(id),
                    TagKey::Name(name) => query.bind(name),
                };
                query
                    .fetch_optional(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to get tag")?
                    .as_ref()
                    .map(row_to_tag_mysql)
                    .transpose()
            }
        }
    }
}

enum TagKey<'a> {
    Id(i64),
    Name(&'a str),
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, name: &str) -> Result<Tag> {
        let now = Utc::now();
        let sql = "INSERT INTO tags (name, created_at, updated_at) VALUES (?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(name)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create tag")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(name)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create tag")?
                .last_insert_id() as i64,
        };

        Ok(Tag {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        self.fetch_one_where("id = ?", TagKey::Id(id)).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.fetch_one_where("name = ?", TagKey::Name(name)).await
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Tag>> {
        let sql = "SELECT id, name, created_at, updated_at FROM tags ORDER BY name ASC LIMIT ? OFFSET ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to list tags")?
                .iter()
                .map(row_to_tag_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to list tags")?
                .iter()
                .map(row_to_tag_mysql)
                .collect(),
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM tags";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.sqlite_pool()?)
                .await
                .context("Failed to count tags")?
                .try_get(0)?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.mysql_pool()?)
                .await
                .context("Failed to count tags")?
                .try_get(0)?,
        };
        Ok(count)
    }

    async fn rename(&self, id: i64, name: &str) -> Result<Tag> {
        let now = Utc::now();
        let sql = "UPDATE tags SET name = ?, updated_at = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(name)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to update tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(name)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to update tag")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Tag not found"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM tags WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete tag")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete tag")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn get_by_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        let sql = r#"
            SELECT t.id, t.name, t.created_at, t.updated_at
            FROM tags t
            INNER JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = ?
            ORDER BY t.name ASC
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(post_id)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get tags for post")?
                .iter()
                .map(row_to_tag_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(post_id)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to get tags for post")?
                .iter()
                .map(row_to_tag_mysql)
                .collect(),
        }
    }
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (pool.clone(), SqlxTagRepository::new(pool))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, repo) = setup_test_repo().await;
        let tag = repo.create("economy").await.expect("Failed to create tag");

        assert_eq!(repo.get_by_id(tag.id).await.unwrap().unwrap().name, "economy");
        assert_eq!(repo.get_by_name("economy").await.unwrap().unwrap().id, tag.id);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let (_pool, repo) = setup_test_repo().await;
        for name in ["zeta", "alpha", "mid"] {
            repo.create(name).await.unwrap();
        }
        let names: Vec<String> = repo.list(0, 10).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let (_pool, repo) = setup_test_repo().await;
        let tag = repo.create("old").await.unwrap();

        let renamed = repo.rename(tag.id, "new").await.unwrap();
        assert_eq!(renamed.name, "new");
        assert!(repo.rename(999, "x").await.is_err());

        assert!(repo.delete(tag.id).await.unwrap());
        assert!(repo.get_by_id(tag.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_post() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.sqlite_pool().unwrap();
        let b = repo.create("beta").await.unwrap();
        let a = repo.create("alpha").await.unwrap();
        repo.create("unused").await.unwrap();

        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('u', 'u@example.com', 'h')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO categories (name) VALUES ('c')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO posts (title, content, author_id, category_id) VALUES ('t', 'c', 1, 1)")
            .execute(sqlite_pool)
            .await
            .unwrap();
        for tag_id in [b.id, a.id] {
            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (1, ?)")
                .bind(tag_id)
                .execute(sqlite_pool)
                .await
                .unwrap();
        }

        let tags = repo.get_by_post(1).await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }
}
