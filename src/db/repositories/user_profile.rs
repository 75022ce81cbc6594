//! User profile repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{UpdateProfileInput, UserProfile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait UserProfileRepository: Send + Sync {
    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserProfile>>;

    /// Create the profile on first write, otherwise merge the given fields
    async fn upsert(&self, user_id: i64, input: &UpdateProfileInput) -> Result<UserProfile>;
}

pub struct SqlxUserProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxUserProfileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserProfileRepository for SqlxUserProfileRepository {
    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let sql = r#"
            SELECT id, user_id, image, address, biography, created_at, updated_at
            FROM user_profiles
            WHERE user_id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_optional(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get user profile")?
                .as_ref()
                .map(row_to_profile_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_optional(self.pool.mysql_pool()?)
                .await
                .context("Failed to get user profile")?
                .as_ref()
                .map(row_to_profile_mysql)
                .transpose(),
        }
    }

    async fn upsert(&self, user_id: i64, input: &UpdateProfileInput) -> Result<UserProfile> {
        let now = Utc::now();
        let existing = self.get_by_user(user_id).await?;

        let image = input
            .image
            .clone()
            .or_else(|| existing.as_ref().and_then(|p| p.image.clone()));
        let address = input
            .address
            .clone()
            .or_else(|| existing.as_ref().and_then(|p| p.address.clone()));
        let biography = input
            .biography
            .clone()
            .or_else(|| existing.as_ref().and_then(|p| p.biography.clone()));

        let sql = if existing.is_some() {
            "UPDATE user_profiles SET image = ?, address = ?, biography = ?, updated_at = ? WHERE user_id = ?"
        } else {
            "INSERT INTO user_profiles (image, address, biography, updated_at, user_id, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        };

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(sql)
                    .bind(&image)
                    .bind(&address)
                    .bind(&biography)
                    .bind(now)
                    .bind(user_id);
                if existing.is_none() {
                    query = query.bind(now);
                }
                query
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to save user profile")?;
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(sql)
                    .bind(&image)
                    .bind(&address)
                    .bind(&biography)
                    .bind(now)
                    .bind(user_id);
                if existing.is_none() {
                    query = query.bind(now);
                }
                query
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to save user profile")?;
            }
        }

        self.get_by_user(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User profile not found after save"))
    }
}

fn row_to_profile_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<UserProfile> {
    Ok(UserProfile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        image: row.try_get("image")?,
        address: row.try_get("address")?,
        biography: row.try_get("biography")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_profile_mysql(row: &sqlx::mysql::MySqlRow) -> Result<UserProfile> {
    Ok(UserProfile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        image: row.try_get("image")?,
        address: row.try_get("address")?,
        biography: row.try_get("biography")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
