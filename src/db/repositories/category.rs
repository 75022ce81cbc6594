//! Category repository
//!
//! Database operations for categories.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Exact, case-sensitive name lookup
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// List categories ordered by name
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Category>>;

    async fn count(&self) -> Result<i64>;

    async fn update(&self, id: i64, input: &UpdateCategoryInput) -> Result<Category>;

    /// Delete a category and, through the foreign key, its posts
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category> {
        let now = Utc::now();
        let sql = "INSERT INTO categories (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.description)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create category")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.description)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create category")?
                .last_insert_id() as i64,
        };

        Ok(Category {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_id_sqlite(self.pool.sqlite_pool()?, id).await,
            DatabaseDriver::Mysql => get_category_by_id_mysql(self.pool.mysql_pool()?, id).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let sql = "SELECT id, name, description, created_at, updated_at FROM categories WHERE name = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(name)
                .fetch_optional(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get category by name")?
                .as_ref()
                .map(row_to_category_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(name)
                .fetch_optional(self.pool.mysql_pool()?)
                .await
                .context("Failed to get category by name")?
                .as_ref()
                .map(row_to_category_mysql)
                .transpose(),
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Category>> {
        let sql = r#"
            SELECT id, name, description, created_at, updated_at
            FROM categories
            ORDER BY name ASC
            LIMIT ? OFFSET ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to list categories")?
                .iter()
                .map(row_to_category_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to list categories")?
                .iter()
                .map(row_to_category_mysql)
                .collect(),
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM categories";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.sqlite_pool()?)
                .await
                .context("Failed to count categories")?
                .try_get(0)?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.mysql_pool()?)
                .await
                .context("Failed to count categories")?
                .try_get(0)?,
        };
        Ok(count)
    }

    async fn update(&self, id: i64, input: &UpdateCategoryInput) -> Result<Category> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category not found"))?;

        let now = Utc::now();
        let name = input.name.as_ref().unwrap_or(&existing.name);
        let description = match &input.description {
            Some(description) => description.clone(),
            None => existing.description.clone(),
        };

        let sql = "UPDATE categories SET name = ?, description = ?, updated_at = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(name)
                    .bind(&description)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to update category")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(name)
                    .bind(&description)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to update category")?;
            }
        }

        Ok(Category {
            id,
            name: name.clone(),
            description,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM categories WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&CreateCategoryInput::new("Politics").with_description("Elections"))
            .await
            .expect("Failed to create category");

        assert!(created.id > 0);
        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.description.as_deref(), Some("Elections"));
        let by_name = repo.get_by_name("Politics").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert!(repo.get_by_name("Sports").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_fails() {
        let repo = setup_test_repo().await;
        repo.create(&CreateCategoryInput::new("Tech")).await.unwrap();
        assert!(repo.create(&CreateCategoryInput::new("Tech")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let repo = setup_test_repo().await;
        for name in ["Weather", "Arts", "Money"] {
            repo.create(&CreateCategoryInput::new(name)).await.unwrap();
        }

        let names: Vec<String> = repo
            .list(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Arts", "Money", "Weather"]);
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.list(1, 1).await.unwrap()[0].name, "Money");
    }

    #[tokio::test]
    async fn test_update_and_clear_description() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&CreateCategoryInput::new("Old").with_description("text"))
            .await
            .unwrap();

        let renamed = repo
            .update(
                created.id,
                &UpdateCategoryInput {
                    name: Some("New".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "New");
        assert_eq!(renamed.description.as_deref(), Some("text"));

        let cleared = repo
            .update(
                created.id,
                &UpdateCategoryInput {
                    name: None,
                    description: Some(None),
                },
            )
            .await
            .unwrap();
        assert!(cleared.description.is_none());
        assert!(repo.update(999, &UpdateCategoryInput::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test_repo().await;
        let created = repo.create(&CreateCategoryInput::new("Temp")).await.unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}
