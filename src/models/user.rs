//! User and group models
//!
//! Accounts follow the familiar staff/active flag pair: any active user may
//! use the authenticated API, staff users additionally moderate comments,
//! publish posts, and manage site content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// May moderate and publish
    pub is_staff: bool,
    /// Inactive accounts cannot log in
    pub is_active: bool,
    /// Registration timestamp
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the username when both are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Default)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

/// Input for updating a user
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// New password (will be hashed)
    pub password: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    /// Replaces the full group membership when present
    pub group_ids: Option<Vec<i64>>,
}

/// Named group of users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: 1,
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: "hash".to_string(),
            is_staff: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(user("Jane", "Doe").display_name(), "Jane Doe");
        assert_eq!(user("Jane", "").display_name(), "Jane");
        assert_eq!(user(" ", "").display_name(), "jdoe");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user("Jane", "Doe")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["is_active"], true);
    }
}
