//! Team member repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{TeamMember, TeamMemberInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const TEAM_COLUMNS: &str = "id, name, position, image, description, created_at, updated_at";

#[async_trait]
pub trait TeamMemberRepository: Send + Sync {
    async fn create(&self, input: &TeamMemberInput) -> Result<TeamMember>;

    async fn get_by_id(&self, id: i64) -> Result<Option<TeamMember>>;

    /// In creation order, as shown on the about page
    async fn list(&self) -> Result<Vec<TeamMember>>;

    async fn update(&self, id: i64, input: &TeamMemberInput) -> Result<Option<TeamMember>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTeamMemberRepository {
    pool: DynDatabasePool,
}

impl SqlxTeamMemberRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TeamMemberRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TeamMemberRepository for SqlxTeamMemberRepository {
    async fn create(&self, input: &TeamMemberInput) -> Result<TeamMember> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO team_members (name, position, image, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.position)
                .bind(&input.image)
                .bind(&input.description)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create team member")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.position)
                .bind(&input.image)
                .bind(&input.description)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create team member")?
                .last_insert_id() as i64,
        };

        Ok(TeamMember {
            id,
            name: input.name.clone(),
            position: input.position.clone(),
            image: input.image.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<TeamMember>> {
        let sql = format!("SELECT {} FROM team_members WHERE id = ?", TEAM_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get team member")?
                .as_ref()
                .map(row_to_member_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql_pool()?)
                .await
                .context("Failed to get team member")?
                .as_ref()
                .map(row_to_member_mysql)
                .transpose(),
        }
    }

    async fn list(&self) -> Result<Vec<TeamMember>> {
        let sql = format!("SELECT {} FROM team_members ORDER BY id ASC", TEAM_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to list team members")?
                .iter()
                .map(row_to_member_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to list team members")?
                .iter()
                .map(row_to_member_mysql)
                .collect(),
        }
    }

    async fn update(&self, id: i64, input: &TeamMemberInput) -> Result<Option<TeamMember>> {
        let now = Utc::now();
        let sql = r#"
            UPDATE team_members
            SET name = ?, position = ?, image = ?, description = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(&input.position)
                    .bind(&input.image)
                    .bind(&input.description)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to update team member")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(&input.position)
                    .bind(&input.image)
                    .bind(&input.description)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to update team member")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM team_members WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to delete team member")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to delete team member")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_member_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<TeamMember> {
    Ok(TeamMember {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        position: row.try_get("position")?,
        image: row.try_get("image")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_member_mysql(row: &sqlx::mysql::MySqlRow) -> Result<TeamMember> {
    Ok(TeamMember {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        position: row.try_get("position")?,
        image: row.try_get("image")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_team_member_crud() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxTeamMemberRepository::new(pool);

        let editor = repo
            .create(&TeamMemberInput {
                name: "Ada".to_string(),
                position: "Editor".to_string(),
                image: None,
                description: Some("Runs the desk".to_string()),
            })
            .await
            .expect("Failed to create team member");
        repo.create(&TeamMemberInput {
            name: "Grace".to_string(),
            position: "Reporter".to_string(),
            image: None,
            description: None,
        })
        .await
        .unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Ada", "Grace"]);

        let updated = repo
            .update(
                editor.id,
                &TeamMemberInput {
                    name: "Ada".to_string(),
                    position: "Editor in chief".to_string(),
                    image: Some("ada.jpg".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.position, "Editor in chief");
        assert!(updated.description.is_none());

        assert!(repo.delete(editor.id).await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
