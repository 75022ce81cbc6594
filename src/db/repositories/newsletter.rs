//! Newsletter subscription repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Newsletter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    async fn create(&self, email: &str) -> Result<Newsletter>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Newsletter>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<Newsletter>>;

    /// Newest first
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Newsletter>>;

    async fn count(&self) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxNewsletterRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsletterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsletterRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_optional(&self, sql: &str, key: Key<'_>) -> Result<Option<Newsletter>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(sql);
                let query = match key {
                    Key::Id(id) => query.bind(id),
                    Key::Email(email) => query.bind(email),
                };
                query
                    .fetch_optional(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to get subscription")?
                    .as_ref()
                    .map(row_to_newsletter_sqlite)
                    .transpose()
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(sql);
                let query = match key {
                    Key::Id(id) => query.bind(id),
                    Key::Email(email) => query.bind(email),
                };
                query
                    .fetch_optional(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to get subscription")?
                    .as_ref()
                    .map(row_to_newsletter_mysql)
                    .transpose()
            }
        }
    }
}

enum Key<'a> {
    Id(i64),
    Email(&'a str),
}

#[async_trait]
impl NewsletterRepository for SqlxNewsletterRepository {
    async fn create(&self, email: &str) -> Result<Newsletter> {
        let now = Utc::now();
        let sql = "INSERT INTO newsletters (email, created_at, updated_at) VALUES (?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(email)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create subscription")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(email)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create subscription")?
                .last_insert_id() as i64,
        };

        Ok(Newsletter {
            id,
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Newsletter>> {
        self.fetch_optional(
            "SELECT id, email, created_at, updated_at FROM newsletters WHERE id = ?",
            Key::Id(id),
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Newsletter>> {
        self.fetch_optional(
            "SELECT id, email, created_at, updated_at FROM newsletters WHERE email = ?",
            Key::Email(email),
        )
        .await
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Newsletter>> {
        let sql = r#"
            SELECT id, email, created_at, updated_at
            FROM newsletters
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to list subscriptions")?
                .iter()
                .map(row_to_newsletter_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to list subscriptions")?
                .iter()
                .map(row_to_newsletter_mysql)
                .collect(),
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM newsletters";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.sqlite_pool()?)
                .await
                .context("Failed to count subscriptions")?
                .try_get(0)?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.mysql_pool()?)
                .await
                .context("Failed to count subscriptions")?
                .try_get(0)?,
        };
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM newsletters WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete subscription")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete subscription")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_newsletter_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Newsletter> {
    Ok(Newsletter {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_newsletter_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Newsletter> {
    Ok(Newsletter {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxNewsletterRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxNewsletterRepository::new(pool)
    }

    #[tokio::test]
    async fn test_subscribe_and_lookup() {
        let repo = setup_test_repo().await;
        let sub = repo.create("a@example.com").await.expect("Failed to subscribe");

        assert_eq!(repo.get_by_email("a@example.com").await.unwrap().unwrap().id, sub.id);
        assert!(repo.get_by_email("b@example.com").await.unwrap().is_none());
        assert!(repo.create("a@example.com").await.is_err());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let repo = setup_test_repo().await;
        repo.create("a@example.com").await.unwrap();
        let b = repo.create("b@example.com").await.unwrap();

        assert_eq!(repo.list(0, 10).await.unwrap()[0].id, b.id);
        assert!(repo.delete(b.id).await.unwrap());
        assert!(repo.get_by_id(b.id).await.unwrap().is_none());
        assert!(!repo.delete(b.id).await.unwrap());
    }
}
