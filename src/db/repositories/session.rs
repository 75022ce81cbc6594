//! Session repository
//!
//! Login sessions keyed by their opaque token. Expired rows are ignored by
//! the auth layer and swept periodically with `delete_expired`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by token
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Log a user out everywhere; returns the number of sessions removed
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;

    /// Remove sessions whose expiry has passed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }

    async fn execute_delete(&self, sql: &str, bind: DeleteBind<'_>) -> Result<u64> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(sql);
                let query = match bind {
                    DeleteBind::Token(id) => query.bind(id),
                    DeleteBind::User(user_id) => query.bind(user_id),
                    DeleteBind::Before(now) => query.bind(now),
                };
                query
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to delete sessions")?
                    .rows_affected()
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(sql);
                let query = match bind {
                    DeleteBind::Token(id) => query.bind(id),
                    DeleteBind::User(user_id) => query.bind(user_id),
                    DeleteBind::Before(now) => query.bind(now),
                };
                query
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to delete sessions")?
                    .rows_affected()
            }
        };
        Ok(affected)
    }
}

enum DeleteBind<'a> {
    Token(&'a str),
    User(i64),
    Before(chrono::DateTime<Utc>),
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_session_sqlite(self.pool.sqlite_pool()?, session).await,
            DatabaseDriver::Mysql => create_session_mysql(self.pool.mysql_pool()?, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_sqlite(self.pool.sqlite_pool()?, id).await,
            DatabaseDriver::Mysql => get_session_mysql(self.pool.mysql_pool()?, id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .execute_delete("DELETE FROM sessions WHERE id = ?", DeleteBind::Token(id))
            .await?;
        Ok(removed > 0)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        self.execute_delete(
            "DELETE FROM sessions WHERE user_id = ?",
            DeleteBind::User(user_id),
        )
        .await
    }

    async fn delete_expired(&self) -> Result<u64> {
        self.execute_delete(
            "DELETE FROM sessions WHERE expires_at < ?",
            DeleteBind::Before(Utc::now()),
        )
        .await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    match row {
        Some(row) => Ok(Some(Session {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })),
        None => Ok(None),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    match row {
        Some(row) => Ok(Some(Session {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        for name in ["first", "second"] {
            sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, 'h')")
                .bind(name)
                .bind(format!("{}@example.com", name))
                .execute(pool.sqlite_pool().unwrap())
                .await
                .expect("Failed to create test user");
        }
        SqlxSessionRepository::new(pool)
    }

    fn session_for(user_id: i64, expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;
        let session = session_for(1, Duration::days(7));
        repo.create(&session).await.expect("Failed to create session");

        let found = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(found.user_id, 1);
        assert!(!found.is_expired());
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_requires_user() {
        let repo = setup_test_repo().await;
        assert!(repo.create(&session_for(99, Duration::days(1))).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_delete_by_user() {
        let repo = setup_test_repo().await;
        let a = session_for(1, Duration::days(7));
        let b = session_for(1, Duration::days(7));
        let other = session_for(2, Duration::days(7));
        for session in [&a, &b, &other] {
            repo.create(session).await.unwrap();
        }

        assert!(repo.delete(&a.id).await.unwrap());
        assert!(!repo.delete(&a.id).await.unwrap());

        assert_eq!(repo.delete_by_user(1).await.unwrap(), 1);
        assert!(repo.get_by_id(&b.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&other.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let repo = setup_test_repo().await;
        let expired = session_for(1, Duration::hours(-1));
        let valid = session_for(1, Duration::days(7));
        repo.create(&expired).await.unwrap();
        repo.create(&valid).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&expired.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&valid.id).await.unwrap().is_some());
    }
}
