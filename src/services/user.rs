//! User service
//!
//! Implements account management and authentication:
//! - Registration (the first account becomes staff)
//! - Login/logout with opaque session tokens
//! - Session validation and periodic cleanup
//! - Account administration including group membership

use crate::config::MAX_SESSION_DAYS;
use crate::db::repositories::{GroupRepository, SessionRepository, UserRepository};
use crate::models::{
    CreateUserInput, Group, ListParams, PagedResult, Session, UpdateUserInput, User,
};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation::{is_valid_email, normalize_email};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use uuid::Uuid;

/// Default session lifetime in days
const DEFAULT_SESSION_DAYS: i64 = 7;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_USERNAME_LENGTH: usize = 150;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.@+\-]+$").expect("USERNAME_RE: invalid regex pattern")
});

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials or disabled account
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Group not found: {0}")]
    GroupNotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for self-service registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    groups: Arc<dyn GroupRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        groups: Arc<dyn GroupRepository>,
    ) -> Self {
        Self {
            users,
            sessions,
            groups,
            session_days: DEFAULT_SESSION_DAYS,
        }
    }

    /// Override the session lifetime, clamped to `1..=MAX_SESSION_DAYS`
    pub fn with_session_days(mut self, days: i64) -> Self {
        self.session_days = days.clamp(1, MAX_SESSION_DAYS);
        self
    }

    /// Register a new account.
    ///
    /// The very first account is made staff so a fresh install has someone
    /// who can publish.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let is_first = self.users.count().await.context("Failed to count users")? == 0;
        let user = self
            .create_user(CreateUserInput {
                username: input.username,
                email: input.email,
                password: input.password,
                is_staff: is_first,
                ..Default::default()
            })
            .await?;

        tracing::info!(user_id = user.id, is_staff = user.is_staff, "User registered");
        Ok(user)
    }

    /// Create an account with explicit flags
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = validate_username(&input.username)?;
        let email = validate_email(&input.email)?;
        validate_password(&input.password)?;

        self.ensure_unique(&username, &email, None).await?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User {
            id: 0,
            username,
            email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password_hash,
            is_staff: input.is_staff,
            is_active: true,
            date_joined: Utc::now(),
        };

        Ok(self.users.create(&user).await.context("Failed to create user")?)
    }

    /// Verify credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .find_by_username_or_email(input.username_or_email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?
        {
            return Err(invalid());
        }

        if !user.is_active {
            return Err(UserServiceError::AuthenticationError(
                "This account is disabled".to_string(),
            ));
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_days),
            created_at: now,
        };
        let session = self
            .sessions
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// Invalidate a session; unknown tokens are ignored
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.sessions
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to an active user.
    ///
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .sessions
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.sessions
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .users
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user.filter(|u| u.is_active))
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .sessions
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }

    pub async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.users
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound(id))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let items = self
            .users
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list users")?;
        let total = self.users.count().await.context("Failed to count users")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn update(&self, id: i64, input: UpdateUserInput) -> Result<User, UserServiceError> {
        let mut user = self.get(id).await?;

        let username = match &input.username {
            Some(username) => validate_username(username)?,
            None => user.username.clone(),
        };
        let email = match &input.email {
            Some(email) => validate_email(email)?,
            None => user.email.clone(),
        };
        self.ensure_unique(&username, &email, Some(id)).await?;
        user.username = username;
        user.email = email;

        if let Some(first_name) = input.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = input.last_name {
            user.last_name = last_name.trim().to_string();
        }
        if let Some(password) = input.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password).context("Failed to hash password")?;
        }
        if let Some(is_staff) = input.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }

        if let Some(group_ids) = input.group_ids {
            for &group_id in &group_ids {
                if self
                    .groups
                    .get_by_id(group_id)
                    .await
                    .context("Failed to check group")?
                    .is_none()
                {
                    return Err(UserServiceError::GroupNotFound(group_id));
                }
            }
            self.groups
                .set_user_groups(id, &group_ids)
                .await
                .context("Failed to update group membership")?;
        }

        let updated = self.users.update(&user).await.context("Failed to update user")?;
        if !updated.is_active {
            self.sessions
                .delete_by_user(id)
                .await
                .context("Failed to end sessions of disabled user")?;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), UserServiceError> {
        if !self.users.delete(id).await.context("Failed to delete user")? {
            return Err(UserServiceError::NotFound(id));
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn groups_of(&self, user_id: i64) -> Result<Vec<Group>, UserServiceError> {
        Ok(self
            .groups
            .list_for_user(user_id)
            .await
            .context("Failed to load user groups")?)
    }

    async fn find_by_username_or_email(&self, login: &str) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .users
            .get_by_username(login)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }
        Ok(self
            .users
            .get_by_email(&normalize_email(login))
            .await
            .context("Failed to get user by email")?)
    }

    async fn ensure_unique(
        &self,
        username: &str,
        email: &str,
        except: Option<i64>,
    ) -> Result<(), UserServiceError> {
        let taken = |found: Option<User>| found.is_some_and(|u| Some(u.id) != except);

        if taken(
            self.users
                .get_by_username(username)
                .await
                .context("Failed to check username")?,
        ) {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        if taken(
            self.users
                .get_by_email(email)
                .await
                .context("Failed to check email")?,
        ) {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }
        Ok(())
    }
}

fn validate_username(username: &str) -> Result<String, UserServiceError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Username must be between 1 and {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(UserServiceError::ValidationError(
            "Username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(username.to_string())
}

fn validate_email(email: &str) -> Result<String, UserServiceError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxGroupRepository, SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    #[test]
    fn test_validate_username_charset() {
        for good in ["reader", "ada.lovelace", "a+b@news", "über_editor", "x-1"] {
            assert_eq!(validate_username(&format!(" {good} ")).unwrap(), good);
        }
        for bad in ["has space", "semi;colon", "slash/name", "<b>"] {
            assert!(matches!(
                validate_username(bad),
                Err(UserServiceError::ValidationError(_))
            ));
        }
    }

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxGroupRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    #[tokio::test]
    async fn test_first_user_becomes_staff() {
        let (_pool, service) = setup_test_service().await;
        let first = service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();
        let second = service
            .register(RegisterInput::new("reader", "reader@example.com", "password123"))
            .await
            .unwrap();

        assert!(first.is_staff);
        assert!(!second.is_staff);
        assert_ne!(first.password_hash, "password123");
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();

        let dup_name = service
            .register(RegisterInput::new("editor", "other@example.com", "password123"))
            .await;
        assert!(matches!(dup_name, Err(UserServiceError::UserExists(_))));

        let dup_email = service
            .register(RegisterInput::new("other", "EDITOR@example.com", "password123"))
            .await;
        assert!(matches!(dup_email, Err(UserServiceError::UserExists(_))));

        for bad in [
            RegisterInput::new("", "a@example.com", "password123"),
            RegisterInput::new("has space", "a@example.com", "password123"),
            RegisterInput::new("ok", "not-an-email", "password123"),
            RegisterInput::new("ok", "a@example.com", "short"),
        ] {
            assert!(matches!(
                service.register(bad).await,
                Err(UserServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_login_and_session_lifecycle() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();

        let (user, session) = service
            .login(LoginInput::new("editor@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(user.username, "editor");

        let current = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(current.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials_and_inactive_users() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();

        assert!(matches!(
            service.login(LoginInput::new("editor", "wrong-password")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.login(LoginInput::new("ghost", "password123")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));

        let (_, session) = service
            .login(LoginInput::new("editor", "password123"))
            .await
            .unwrap();
        service
            .update(
                user.id,
                UpdateUserInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(matches!(
            service.login(LoginInput::new("editor", "password123")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_session_length_is_clamped() {
        let (_pool, service) = setup_test_service().await;
        let service = service.with_session_days(i64::MAX);
        service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();

        let (_, session) = service
            .login(LoginInput::new("editor", "password123"))
            .await
            .unwrap();
        let lifetime = session.expires_at - session.created_at;
        assert_eq!(lifetime.num_days(), MAX_SESSION_DAYS);
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let (pool, service) = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();

        let now = Utc::now();
        let sessions = SqlxSessionRepository::new(pool);
        sessions
            .create(&Session {
                id: "stale".to_string(),
                user_id: user.id,
                expires_at: now - Duration::minutes(5),
                created_at: now - Duration::days(8),
            })
            .await
            .unwrap();

        assert!(service.validate_session("stale").await.unwrap().is_none());
        assert!(sessions.get_by_id("stale").await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_groups_and_password() {
        let (pool, service) = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();
        let group = SqlxGroupRepository::new(pool).create("desk").await.unwrap();

        let updated = service
            .update(
                user.id,
                UpdateUserInput {
                    first_name: Some("Ed".to_string()),
                    password: Some("new-password".to_string()),
                    group_ids: Some(vec![group.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Ed");
        assert_eq!(service.groups_of(user.id).await.unwrap(), vec![group]);
        assert!(service
            .login(LoginInput::new("editor", "new-password"))
            .await
            .is_ok());

        let missing_group = service
            .update(
                user.id,
                UpdateUserInput {
                    group_ids: Some(vec![99]),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(missing_group, Err(UserServiceError::GroupNotFound(99))));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("editor", "editor@example.com", "password123"))
            .await
            .unwrap();

        assert_eq!(service.list(&ListParams::default()).await.unwrap().total, 1);
        service.delete(user.id).await.unwrap();
        assert!(matches!(service.get(user.id).await, Err(UserServiceError::NotFound(_))));
    }
}
