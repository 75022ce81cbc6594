//! Group repository
//!
//! Named groups and the `user_groups` membership table.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Group;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Group>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Group>>;

    /// All groups ordered by name
    async fn list(&self) -> Result<Vec<Group>>;

    async fn rename(&self, id: i64, name: &str) -> Result<Option<Group>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Groups a user belongs to, ordered by name
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Group>>;

    /// Replace the user's full membership
    async fn set_user_groups(&self, user_id: i64, group_ids: &[i64]) -> Result<()>;
}

pub struct SqlxGroupRepository {
    pool: DynDatabasePool,
}

impl SqlxGroupRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GroupRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GroupRepository for SqlxGroupRepository {
    async fn create(&self, name: &str) -> Result<Group> {
        let sql = "INSERT INTO auth_groups (name) VALUES (?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(name)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create group")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(name)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create group")?
                .last_insert_id() as i64,
        };
        Ok(Group {
            id,
            name: name.to_string(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Group>> {
        let sql = "SELECT id, name FROM auth_groups WHERE id = ?";
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get group")?
                .map(|row| -> Result<Group> {
                    Ok(Group {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                    })
                }),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .fetch_optional(self.pool.mysql_pool()?)
                .await
                .context("Failed to get group")?
                .map(|row| -> Result<Group> {
                    Ok(Group {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                    })
                }),
        };
        row.transpose()
    }

    async fn list(&self) -> Result<Vec<Group>> {
        self.fetch_groups("SELECT id, name FROM auth_groups ORDER BY name ASC", None)
            .await
    }

    async fn rename(&self, id: i64, name: &str) -> Result<Option<Group>> {
        let sql = "UPDATE auth_groups SET name = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(name)
                    .bind(id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to rename group")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(name)
                    .bind(id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to rename group")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM auth_groups WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete group")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete group")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Group>> {
        let sql = r#"
            SELECT g.id, g.name
            FROM auth_groups g
            INNER JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = ?
            ORDER BY g.name ASC
        "#;
        self.fetch_groups(sql, Some(user_id)).await
    }

    async fn set_user_groups(&self, user_id: i64, group_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut tx = self
                    .pool
                    .sqlite_pool()?
                    .begin()
                    .await
                    .context("Failed to begin transaction")?;
                sqlx::query("DELETE FROM user_groups WHERE user_id = ?")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear user groups")?;
                for group_id in group_ids {
                    sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
                        .bind(user_id)
                        .bind(group_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to add user to group")?;
                }
                tx.commit().await.context("Failed to commit user groups")?;
            }
            DatabaseDriver::Mysql => {
                let mut tx = self
                    .pool
                    .mysql_pool()?
                    .begin()
                    .await
                    .context("Failed to begin transaction")?;
                sqlx::query("DELETE FROM user_groups WHERE user_id = ?")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear user groups")?;
                for group_id in group_ids {
                    sqlx::query("INSERT IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
                        .bind(user_id)
                        .bind(group_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to add user to group")?;
                }
                tx.commit().await.context("Failed to commit user groups")?;
            }
        }
        Ok(())
    }
}

impl SqlxGroupRepository {
    async fn fetch_groups(&self, sql: &str, bind: Option<i64>) -> Result<Vec<Group>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(sql);
                if let Some(value) = bind {
                    query = query.bind(value);
                }
                query
                    .fetch_all(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to list groups")?
                    .iter()
                    .map(|row| -> Result<Group> {
                        Ok(Group {
                            id: row.try_get("id")?,
                            name: row.try_get("name")?,
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(sql);
                if let Some(value) = bind {
                    query = query.bind(value);
                }
                query
                    .fetch_all(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to list groups")?
                    .iter()
                    .map(|row| -> Result<Group> {
                        Ok(Group {
                            id: row.try_get("id")?,
                            name: row.try_get("name")?,
                        })
                    })
                    .collect()
            }
        }
    }
}
