//! Contact message repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Contact, CreateContactInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const CONTACT_COLUMNS: &str = "id, name, email, subject, message, created_at, updated_at";

/// Contact repository trait. There is no update: messages are immutable.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, input: &CreateContactInput) -> Result<Contact>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>>;

    /// Newest first
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Contact>>;

    async fn count(&self) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, input: &CreateContactInput) -> Result<Contact> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO contacts (name, email, subject, message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.subject)
                .bind(&input.message)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create contact message")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.subject)
                .bind(&input.message)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create contact message")?
                .last_insert_id() as i64,
        };

        Ok(Contact {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            subject: input.subject.clone(),
            message: input.message.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get contact message")?
                .as_ref()
                .map(row_to_contact_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql_pool()?)
                .await
                .context("Failed to get contact message")?
                .as_ref()
                .map(row_to_contact_mysql)
                .transpose(),
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {} FROM contacts ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            CONTACT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to list contact messages")?
                .iter()
                .map(row_to_contact_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to list contact messages")?
                .iter()
                .map(row_to_contact_mysql)
                .collect(),
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM contacts";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.sqlite_pool()?)
                .await
                .context("Failed to count contact messages")?
                .try_get(0)?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.mysql_pool()?)
                .await
                .context("Failed to count contact messages")?
                .try_get(0)?,
        };
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM contacts WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete contact message")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete contact message")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_contact_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Contact> {
    Ok(Contact {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_contact_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Contact> {
    Ok(Contact {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
