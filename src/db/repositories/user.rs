//! User repository
//!
//! Database operations for user accounts.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Passwords arrive here already hashed; see `services::password`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, is_staff, is_active, date_joined";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; `id` on the input is ignored
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist every mutable column of `user`
    async fn update(&self, user: &User) -> Result<User>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// Newest accounts first
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Lookup column for single-user queries
#[derive(Clone, Copy)]
enum UserKey<'a> {
    Id(i64),
    Username(&'a str),
    Email(&'a str),
}

impl UserKey<'_> {
    fn column(&self) -> &'static str {
        match self {
            UserKey::Id(_) => "id",
            UserKey::Username(_) => "username",
            UserKey::Email(_) => "email",
        }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite_pool()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql_pool()?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        self.find_one(UserKey::Id(id)).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one(UserKey::Username(username)).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one(UserKey::Email(email)).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        let sql = r#"
            UPDATE users
            SET username = ?, email = ?, first_name = ?, last_name = ?,
                password_hash = ?, is_staff = ?, is_active = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&user.username)
                    .bind(&user.email)
                    .bind(&user.first_name)
                    .bind(&user.last_name)
                    .bind(&user.password_hash)
                    .bind(user.is_staff)
                    .bind(user.is_active)
                    .bind(user.id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to update user")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&user.username)
                    .bind(&user.email)
                    .bind(&user.first_name)
                    .bind(&user.last_name)
                    .bind(&user.password_hash)
                    .bind(user.is_staff)
                    .bind(user.is_active)
                    .bind(user.id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to update user")?;
            }
        }

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM users WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete user")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete user")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM users";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.sqlite_pool()?)
                .await
                .context("Failed to count users")?
                .try_get(0)?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.mysql_pool()?)
                .await
                .context("Failed to count users")?
                .try_get(0)?,
        };
        Ok(count)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY date_joined DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to list users")?
                .iter()
                .map(row_to_user_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to list users")?
                .iter()
                .map(row_to_user_mysql)
                .collect(),
        }
    }
}

impl SqlxUserRepository {
    async fn find_one(&self, key: UserKey<'_>) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, key.column());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql);
                let query = match key {
                    UserKey::Id(id) => query.bind(id),
                    UserKey::Username(value) | UserKey::Email(value) => query.bind(value),
                };
                query
                    .fetch_optional(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to get user")?
                    .as_ref()
                    .map(row_to_user_sqlite)
                    .transpose()
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql);
                let query = match key {
                    UserKey::Id(id) => query.bind(id),
                    UserKey::Username(value) | UserKey::Email(value) => query.bind(value),
                };
                query
                    .fetch_optional(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to get user")?
                    .as_ref()
                    .map(row_to_user_mysql)
                    .transpose()
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff, is_active, date_joined)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.is_active)
    .bind(user.date_joined)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        is_staff: row.try_get("is_staff")?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff, is_active, date_joined)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.is_active)
    .bind(user.date_joined)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        ..user.clone()
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        is_staff: row.try_get("is_staff")?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
    })
}
