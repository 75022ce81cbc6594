//! Advertisement repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Advertisement, AdvertisementInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const AD_COLUMNS: &str = "id, title, image, link, created_at, updated_at";

#[async_trait]
pub trait AdvertisementRepository: Send + Sync {
    async fn create(&self, input: &AdvertisementInput) -> Result<Advertisement>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Advertisement>>;

    /// The most recently created advertisement, shown in the sidebar
    async fn latest(&self) -> Result<Option<Advertisement>>;

    /// Newest first
    async fn list(&self) -> Result<Vec<Advertisement>>;

    async fn update(&self, id: i64, input: &AdvertisementInput) -> Result<Option<Advertisement>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxAdvertisementRepository {
    pool: DynDatabasePool,
}

impl SqlxAdvertisementRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdvertisementRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_all(&self, sql: &str, id: Option<i64>) -> Result<Vec<Advertisement>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(sql);
                if let Some(id) = id {
                    query = query.bind(id);
                }
                query
                    .fetch_all(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to load advertisements")?
                    .iter()
                    .map(row_to_ad_sqlite)
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(sql);
                if let Some(id) = id {
                    query = query.bind(id);
                }
                query
                    .fetch_all(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to load advertisements")?
                    .iter()
                    .map(row_to_ad_mysql)
                    .collect()
            }
        }
    }
}

#[async_trait]
impl AdvertisementRepository for SqlxAdvertisementRepository {
    async fn create(&self, input: &AdvertisementInput) -> Result<Advertisement> {
        let now = Utc::now();
        let sql = "INSERT INTO advertisements (title, image, link, created_at, updated_at) VALUES (?, ?, ?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.image)
                .bind(&input.link)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create advertisement")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.image)
                .bind(&input.link)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create advertisement")?
                .last_insert_id() as i64,
        };

        Ok(Advertisement {
            id,
            title: input.title.clone(),
            image: input.image.clone(),
            link: input.link.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Advertisement>> {
        let sql = format!("SELECT {} FROM advertisements WHERE id = ?", AD_COLUMNS);
        Ok(self.fetch_all(&sql, Some(id)).await?.into_iter().next())
    }

    async fn latest(&self) -> Result<Option<Advertisement>> {
        let sql = format!(
            "SELECT {} FROM advertisements ORDER BY created_at DESC, id DESC LIMIT 1",
            AD_COLUMNS
        );
        Ok(self.fetch_all(&sql, None).await?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Advertisement>> {
        let sql = format!(
            "SELECT {} FROM advertisements ORDER BY created_at DESC, id DESC",
            AD_COLUMNS
        );
        self.fetch_all(&sql, None).await
    }

    async fn update(&self, id: i64, input: &AdvertisementInput) -> Result<Option<Advertisement>> {
        let sql = "UPDATE advertisements SET title = ?, image = ?, link = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.image)
                    .bind(&input.link)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to update advertisement")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.image)
                    .bind(&input.link)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to update advertisement")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM advertisements WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete advertisement")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete advertisement")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_ad_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Advertisement> {
    Ok(Advertisement {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        image: row.try_get("image")?,
        link: row.try_get("link")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_ad_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Advertisement> {
    Ok(Advertisement {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        image: row.try_get("image")?,
        link: row.try_get("link")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
